// plotting/mod.rs
// Diagnostic histograms of the detected neutrons

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::classify::Thresholds;
use crate::error::AnalysisError;
use crate::loader::{Column, RecordSet};

pub mod analysis;
pub mod export;

#[cfg(test)]
mod tests;

/// How the energy axis is binned
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EnergyBinning {
    /// Log bins from max(floor, smallest positive energy) to the largest energy
    Adaptive { floor_ev: f64, bins: usize },
    /// Log bins over a fixed window
    Fixed { min_ev: f64, max_ev: f64, bins: usize },
}

impl Default for EnergyBinning {
    fn default() -> Self {
        EnergyBinning::Fixed {
            min_ev: 1e-3,
            max_ev: 1e7,
            bins: 199,
        }
    }
}

/// Upper edge of the time-of-flight axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TofRange {
    Max,
    Percentile { q: f64 },
}

impl Default for TofRange {
    fn default() -> Self {
        TofRange::Percentile { q: 0.99 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub enabled: bool,
    pub output_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub tof_bins: usize,
    pub tof_log_y: bool,
    pub profile_bins: usize,
    pub angular_bins: usize,
    // tables last so the TOML writer emits them after plain keys
    pub energy: EnergyBinning,
    pub tof_range: TofRange,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: PathBuf::from("."),
            width: 1000,
            height: 600,
            tof_bins: 149,
            tof_log_y: false,
            profile_bins: 100,
            angular_bins: 99,
            energy: EnergyBinning::default(),
            tof_range: TofRange::default(),
        }
    }
}

fn invalid(msg: impl Into<String>) -> AnalysisError {
    AnalysisError::InvalidConfig(msg.into())
}

impl PlotConfig {
    /// Reject settings that would only fail once a plot is drawn
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(invalid("plots.width and plots.height must be positive"));
        }
        for (name, bins) in [
            ("tof_bins", self.tof_bins),
            ("profile_bins", self.profile_bins),
            ("angular_bins", self.angular_bins),
        ] {
            if bins == 0 {
                return Err(invalid(format!("plots.{} must be positive", name)));
            }
        }

        match self.energy {
            EnergyBinning::Fixed { min_ev, max_ev, bins } => {
                if !(min_ev.is_finite() && max_ev.is_finite() && min_ev > 0.0) {
                    return Err(invalid("plots.energy.min_ev must be positive and finite"));
                }
                if max_ev <= min_ev {
                    return Err(invalid("plots.energy.max_ev must exceed min_ev"));
                }
                if bins == 0 {
                    return Err(invalid("plots.energy.bins must be positive"));
                }
            }
            EnergyBinning::Adaptive { floor_ev, bins } => {
                if !(floor_ev.is_finite() && floor_ev > 0.0) {
                    return Err(invalid("plots.energy.floor_ev must be positive and finite"));
                }
                if bins == 0 {
                    return Err(invalid("plots.energy.bins must be positive"));
                }
            }
        }

        if let TofRange::Percentile { q } = self.tof_range {
            if !(q > 0.0 && q <= 1.0) {
                return Err(invalid("plots.tof_range.q must be in (0, 1]"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotKind {
    EnergySpectrum,
    TimeOfFlight,
    BeamProfile,
    AngularDistribution,
}

impl PlotKind {
    pub const ALL: [PlotKind; 4] = [
        PlotKind::EnergySpectrum,
        PlotKind::TimeOfFlight,
        PlotKind::BeamProfile,
        PlotKind::AngularDistribution,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            PlotKind::EnergySpectrum => "espectro_energia.png",
            PlotKind::TimeOfFlight => "tiempo_de_vuelo.png",
            PlotKind::BeamProfile => "perfil_del_haz.png",
            PlotKind::AngularDistribution => "distribucion_angular.png",
        }
    }

    fn required_columns(&self) -> &'static [Column] {
        match self {
            PlotKind::EnergySpectrum => &[Column::KineticEnergy],
            PlotKind::TimeOfFlight => &[Column::FinalTime],
            PlotKind::BeamProfile => &[Column::FinalPosX, Column::FinalPosY],
            PlotKind::AngularDistribution => &[Column::DirX, Column::DirY, Column::DirZ],
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlotKind::EnergySpectrum => "energy spectrum",
            PlotKind::TimeOfFlight => "time of flight",
            PlotKind::BeamProfile => "beam profile",
            PlotKind::AngularDistribution => "angular distribution",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlotOutcome {
    Saved(PathBuf),
    Skipped(String),
    Failed(String),
}

/// Whether `kind` can be drawn from `full`; `Err` carries the skip reason.
pub fn check(kind: PlotKind, full: &RecordSet, angular_present: bool) -> Result<(), String> {
    if kind == PlotKind::AngularDistribution && !angular_present {
        return Err("angular columns were not loaded".to_string());
    }
    let missing: Vec<&str> = kind
        .required_columns()
        .iter()
        .filter(|c| !full.has(**c))
        .map(|c| c.name())
        .collect();
    if !missing.is_empty() {
        return Err(format!("missing column(s): {}", missing.join(", ")));
    }
    if full.is_empty() {
        return Err("no records".to_string());
    }
    Ok(())
}

/// Render every plot into `config.output_dir`; one outcome per plot, each logged.
pub fn render_all(
    full: &RecordSet,
    thermal: &RecordSet,
    angular_present: bool,
    thresholds: &Thresholds,
    config: &PlotConfig,
) -> Vec<(PlotKind, PlotOutcome)> {
    if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
        let reason = format!(
            "cannot create output directory {}: {}",
            config.output_dir.display(),
            e
        );
        log::error!("{}", reason);
        return PlotKind::ALL
            .iter()
            .map(|k| (*k, PlotOutcome::Failed(reason.clone())))
            .collect();
    }

    PlotKind::ALL
        .iter()
        .map(|kind| {
            let outcome = render_one(*kind, full, thermal, angular_present, thresholds, config);
            match &outcome {
                PlotOutcome::Saved(path) => log::info!("Saved {} to {}", kind, path.display()),
                PlotOutcome::Skipped(reason) => log::warn!("Skipping {}: {}", kind, reason),
                PlotOutcome::Failed(reason) => log::error!("Failed to draw {}: {}", kind, reason),
            }
            (*kind, outcome)
        })
        .collect()
}

fn render_one(
    kind: PlotKind,
    full: &RecordSet,
    thermal: &RecordSet,
    angular_present: bool,
    thresholds: &Thresholds,
    config: &PlotConfig,
) -> PlotOutcome {
    if let Err(reason) = check(kind, full, angular_present) {
        return PlotOutcome::Skipped(reason);
    }
    let path = output_path(&config.output_dir, kind);

    let drawn = match kind {
        PlotKind::EnergySpectrum => {
            let Some(data) = export::EnergyPlot::prepare(full, thermal, thresholds, &config.energy) else {
                return PlotOutcome::Skipped("no positive energies to place on a log axis".into());
            };
            export::draw_energy(&path, &data, config)
        }
        PlotKind::TimeOfFlight => {
            let Some(data) = export::TofPlot::prepare(full, thermal, config) else {
                return PlotOutcome::Skipped("no positive times of flight".into());
            };
            export::draw_tof(&path, &data, config)
        }
        PlotKind::BeamProfile => {
            let points: Vec<(f64, f64)> = full
                .iter()
                .filter_map(|r| r.final_pos_mm)
                .map(|p| (p.x, p.y))
                .collect();
            let Some(hist) = analysis::histogram_2d(&points, config.profile_bins) else {
                return PlotOutcome::Skipped("no finite positions".into());
            };
            export::draw_profile(&path, &hist, config)
        }
        PlotKind::AngularDistribution => {
            let data = export::AngularPlot::prepare(full, thermal, config.angular_bins);
            export::draw_angular(&path, &data, config)
        }
    };

    match drawn {
        Ok(()) => PlotOutcome::Saved(path),
        Err(e) => PlotOutcome::Failed(AnalysisError::Plot(e.to_string()).to_string()),
    }
}

pub fn output_path(dir: &Path, kind: PlotKind) -> PathBuf {
    dir.join(kind.file_name())
}
