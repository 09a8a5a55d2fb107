// report.rs
// Detection / thermalization metrics, statistical projection and the text report

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::classify::{BandCounts, BandPartition, Thresholds};
use crate::error::{AnalysisError, Result};
use crate::loader::{Column, RecordSet};
use crate::stats::{self, ColumnSummary};

/// Projection targets for the statistical-error section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Relative errors to project for, as fractions (0.01 = 1 %)
    pub target_errors: Vec<f64>,
    /// Absolute thermal count to project for (10 000 is ~1 %)
    pub target_thermal_count: Option<u64>,
    /// Print std/min/max next to the means
    pub extended_stats: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            target_errors: vec![0.01, 0.001],
            target_thermal_count: Some(10_000),
            extended_stats: true,
        }
    }
}

const STAT_COLUMNS: [Column; 4] = [
    Column::KineticEnergy,
    Column::FinalTime,
    Column::TrackLength,
    Column::NumSteps,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BandFractions {
    pub thermal: f64,
    pub epithermal: f64,
    pub fast: f64,
}

impl BandFractions {
    fn of(counts: &BandCounts, denominator: f64) -> Self {
        Self {
            thermal: counts.thermal as f64 / denominator,
            epithermal: counts.epithermal as f64 / denominator,
            fast: counts.fast as f64 / denominator,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedSummary {
    pub column: &'static str,
    #[serde(flatten)]
    pub summary: ColumnSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngularStats {
    pub mean_cos_theta_all: f64,
    /// 0 when no thermal neutrons were detected
    pub mean_cos_theta_thermal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorTarget {
    pub target_relative_error: f64,
    pub required_thermal: f64,
    pub required_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountTarget {
    pub target_thermal: u64,
    pub required_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub thermal_count: usize,
    pub current_relative_error: f64,
    pub thermal_efficiency: f64,
    pub error_targets: Vec<ErrorTarget>,
    pub count_target: Option<CountTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum ProjectionOutcome {
    Projected(Projection),
    NoThermalNeutrons,
    ZeroSimulatedTotal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub source: String,
    pub simulated_total: u64,
    pub detected: usize,
    pub thresholds: Thresholds,
    pub counts: BandCounts,
    /// detected / simulated (fraction, 0 when simulated is 0)
    pub detection_efficiency: f64,
    pub fraction_of_detected: BandFractions,
    pub fraction_of_simulated: BandFractions,
    pub full_stats: Vec<NamedSummary>,
    pub thermal_stats: Vec<NamedSummary>,
    pub angular: Option<AngularStats>,
    pub projection: ProjectionOutcome,
    #[serde(skip)]
    extended: bool,
}

fn summaries(set: &RecordSet) -> Vec<NamedSummary> {
    STAT_COLUMNS
        .iter()
        .filter(|c| set.has(**c))
        .filter_map(|c| {
            ColumnSummary::from_values(&set.values(*c)).map(|summary| NamedSummary {
                column: c.name(),
                summary,
            })
        })
        .collect()
}

impl Report {
    /// Compute all metrics. Fails with `EmptyDataset` before any fraction is
    /// computed when nothing was detected.
    pub fn compute(
        full: &RecordSet,
        partition: &BandPartition,
        simulated_total: u64,
        angular_present: bool,
        thresholds: &Thresholds,
        config: &ReportConfig,
    ) -> Result<Self> {
        let detected = full.len();
        if detected == 0 {
            log::warn!("No neutrons were detected. Statistics cannot be computed.");
            return Err(AnalysisError::EmptyDataset);
        }

        let counts = partition.counts();

        let (detection_efficiency, fraction_of_simulated) = if simulated_total > 0 {
            let total = simulated_total as f64;
            (detected as f64 / total, BandFractions::of(&counts, total))
        } else {
            log::warn!(
                "{}; fractions of the simulated total are reported as 0.",
                AnalysisError::ZeroSimulatedTotal
            );
            (0.0, BandFractions::default())
        };
        let fraction_of_detected = BandFractions::of(&counts, detected as f64);

        let angular = if angular_present {
            let all = stats::mean(&full.values(Column::DirZ)).unwrap_or(0.0);
            let thermal = if counts.thermal > 0 {
                stats::mean(&partition.thermal.values(Column::DirZ)).unwrap_or(0.0)
            } else {
                0.0
            };
            Some(AngularStats {
                mean_cos_theta_all: all,
                mean_cos_theta_thermal: thermal,
            })
        } else {
            None
        };

        let projection = project(counts.thermal, simulated_total, config);

        Ok(Self {
            source: String::new(),
            simulated_total,
            detected,
            thresholds: *thresholds,
            counts,
            detection_efficiency,
            fraction_of_detected,
            fraction_of_simulated,
            full_stats: summaries(full),
            thermal_stats: summaries(&partition.thermal),
            angular,
            projection,
            extended: config.extended_stats,
        })
    }

    /// Label the analysed file in the printed header
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn print(&self) {
        println!("{}", self);
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("Metrics saved: {}", path.as_ref().display());
        Ok(())
    }
}

/// Events needed to reach each target precision. Never divides by a zero
/// thermal efficiency: both zero cases return before any division.
pub fn project(thermal_count: usize, simulated_total: u64, config: &ReportConfig) -> ProjectionOutcome {
    if thermal_count == 0 {
        return ProjectionOutcome::NoThermalNeutrons;
    }
    if simulated_total == 0 {
        return ProjectionOutcome::ZeroSimulatedTotal;
    }

    let thermal_efficiency = thermal_count as f64 / simulated_total as f64;
    let current_relative_error = 1.0 / (thermal_count as f64).sqrt();

    let error_targets = config
        .target_errors
        .iter()
        .map(|&e| {
            let required_thermal = stats::required_count(e);
            ErrorTarget {
                target_relative_error: e,
                required_thermal,
                required_total: required_thermal / thermal_efficiency,
            }
        })
        .collect();

    let count_target = config.target_thermal_count.map(|target| CountTarget {
        target_thermal: target,
        required_total: target as f64 / thermal_efficiency,
    });

    ProjectionOutcome::Projected(Projection {
        thermal_count,
        current_relative_error,
        thermal_efficiency,
        error_targets,
        count_target,
    })
}

/// 1234567 -> "1,234,567"
pub fn thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        format!("-{}", out)
    } else {
        out
    }
}

const RULE: &str = "==================================================";
const THIN: &str = "--------------------------------------------------";

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.thresholds;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "  NEUTRON THERMALIZATION ANALYSIS REPORT")?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Simulated neutrons (total):   {}", thousands(self.simulated_total as f64))?;
        if !self.source.is_empty() {
            writeln!(f, "Analysed file:                {}", self.source)?;
        }
        writeln!(f, "{}", THIN)?;
        writeln!(f, "1. DETECTION COUNT (FLUX)")?;
        writeln!(f, "  Detected neutrons (total):    {}", thousands(self.detected as f64))?;
        if self.simulated_total > 0 {
            writeln!(f, "  Detection efficiency:         {:.4}%", self.detection_efficiency * 100.0)?;
        }
        writeln!(f)?;
        writeln!(f, "2. ENERGY BREAKDOWN (OF DETECTED)")?;
        writeln!(
            f,
            "  Thermal    (< {} eV):          {}  ({:.2}%)",
            t.thermal_max_ev,
            thousands(self.counts.thermal as f64),
            self.fraction_of_detected.thermal * 100.0
        )?;
        writeln!(
            f,
            "  Epithermal ({} to {} eV):   {}  ({:.2}%)",
            t.thermal_max_ev,
            t.epithermal_max_ev,
            thousands(self.counts.epithermal as f64),
            self.fraction_of_detected.epithermal * 100.0
        )?;
        writeln!(
            f,
            "  Fast       (>= {} eV):          {}  ({:.2}%)",
            t.epithermal_max_ev,
            thousands(self.counts.fast as f64),
            self.fraction_of_detected.fast * 100.0
        )?;
        if self.simulated_total > 0 {
            writeln!(f)?;
            writeln!(f, "3. THERMALIZATION EFFICIENCY (OF SIMULATED)")?;
            writeln!(
                f,
                "  Thermal / total:              {:.4}%",
                self.fraction_of_simulated.thermal * 100.0
            )?;
            writeln!(
                f,
                "  Epithermal / total:           {:.4}%",
                self.fraction_of_simulated.epithermal * 100.0
            )?;
            writeln!(
                f,
                "  Fast / total:                 {:.4}%",
                self.fraction_of_simulated.fast * 100.0
            )?;
        }
        writeln!(f, "{}", THIN)?;
        writeln!(f, "4. ADDITIONAL STATISTICS")?;
        write_stats(f, "all", &self.full_stats, self.extended)?;
        if self.counts.thermal > 0 {
            write_stats(f, "thermal", &self.thermal_stats, self.extended)?;
        }
        if let Some(a) = &self.angular {
            writeln!(f)?;
            writeln!(f, "Angular statistics:")?;
            writeln!(f, "  Mean cos(theta) (all):        {:.4}", a.mean_cos_theta_all)?;
            writeln!(f, "  Mean cos(theta) (thermal):    {:.4}", a.mean_cos_theta_thermal)?;
        }
        writeln!(f, "{}", RULE)?;
        writeln!(f, "5. STATISTICAL PROJECTION")?;
        writeln!(f, "{}", RULE)?;
        match &self.projection {
            ProjectionOutcome::Projected(p) => {
                writeln!(f, "Current statistics (with {} thermal):", thousands(p.thermal_count as f64))?;
                writeln!(f, "  Current relative error:       {:.2}%", p.current_relative_error * 100.0)?;
                writeln!(f, "  Thermalization efficiency:    {:.6}", p.thermal_efficiency)?;
                for target in &p.error_targets {
                    writeln!(f, "{}", THIN)?;
                    writeln!(
                        f,
                        "Projection for {}% relative error:",
                        target.target_relative_error * 100.0
                    )?;
                    writeln!(f, "  Thermal neutrons needed:      {}", thousands(target.required_thermal))?;
                    writeln!(f, "  Total events to simulate:     ~{}", thousands(target.required_total))?;
                }
                if let Some(c) = &p.count_target {
                    writeln!(f, "{}", THIN)?;
                    writeln!(
                        f,
                        "To collect {} thermal neutrons (error ~{:.1}%):",
                        thousands(c.target_thermal as f64),
                        100.0 / (c.target_thermal as f64).sqrt()
                    )?;
                    writeln!(f, "  -> simulate a total of {} events.", thousands(c.required_total))?;
                }
            }
            ProjectionOutcome::NoThermalNeutrons => {
                writeln!(f, "No thermalized neutrons were detected in this run.")?;
                writeln!(f, "Increase the number of simulated neutrons and try again.")?;
            }
            ProjectionOutcome::ZeroSimulatedTotal => {
                writeln!(f, "Simulated total is 0; the projection needs the beamOn count.")?;
            }
        }
        write!(f, "{}", RULE)
    }
}

fn write_stats(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    rows: &[NamedSummary],
    extended: bool,
) -> fmt::Result {
    if rows.is_empty() {
        return Ok(());
    }
    if extended {
        writeln!(f, "  [{}]  {:<22} {:>12} {:>12} {:>12} {:>12}", label, "", "mean", "std", "min", "max")?;
        for row in rows {
            let s = &row.summary;
            writeln!(
                f,
                "        {:<22} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                row.column, s.mean, s.std, s.min, s.max
            )?;
        }
    } else {
        for row in rows {
            writeln!(f, "  Mean {} ({}):  {:.5}", row.column, label, row.summary.mean)?;
        }
    }
    Ok(())
}
