/// Sweep configuration structures
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{AnalysisError, Result};

/// One half-width axis of the paraffin block, in cm. `stop` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl Default for GridAxis {
    fn default() -> Self {
        Self {
            start: 0.5,
            stop: 10.1,
            step: 0.5,
        }
    }
}

/// Round to 1e-6 cm so repeated steps print cleanly
pub(crate) fn round_cm(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

impl GridAxis {
    /// `start + i * step` for every i that stays below `stop`.
    /// Computed by index so the values do not drift.
    pub fn values(&self) -> Vec<f64> {
        if !(self.step > 0.0) || !(self.stop > self.start) {
            return Vec::new();
        }
        let n = ((self.stop - self.start) / self.step).ceil() as usize;
        (0..n)
            .map(|i| round_cm(self.start + i as f64 * self.step))
            .filter(|v| *v < self.stop)
            .collect()
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !(self.start.is_finite() && self.stop.is_finite() && self.step.is_finite()) {
            return Err(AnalysisError::InvalidConfig(format!(
                "sweep.{}: start/stop/step must be finite",
                name
            )));
        }
        if self.step <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "sweep.{}.step must be positive",
                name
            )));
        }
        if self.start <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "sweep.{}.start must be a positive half-width",
                name
            )));
        }
        Ok(())
    }
}

/// Particle gun settings written into every macro
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamConfig {
    pub particle: String,
    /// Value and unit as the simulator expects them, e.g. "4.2 MeV"
    pub energy: String,
    /// Gap between the source and the upstream face of the block (cm)
    pub source_offset_cm: f64,
    pub direction: [f64; 3],
    pub number: u32,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            particle: "neutron".to_string(),
            energy: "4.2 MeV".to_string(),
            source_offset_cm: 0.1,
            direction: [0.0, 0.0, 1.0],
            number: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Simulator binary, invoked as `<executable> <macro_file>`
    pub executable: PathBuf,
    pub macro_file: PathBuf,
    /// Output container the simulator writes on every run
    pub output_file: PathBuf,
    pub table: String,
    /// `/run/beamOn` count per geometry
    pub events: u64,
    pub results_csv: PathBuf,
    /// Kill a simulator run after this many seconds
    pub timeout_secs: Option<u64>,
    pub beam: BeamConfig,
    pub x: GridAxis,
    pub y: GridAxis,
    pub z: GridAxis,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("./Neutron_Thermalization"),
            macro_file: PathBuf::from("auto.mac"),
            output_file: PathBuf::from(crate::config::INPUT_FILE),
            table: crate::config::NTUPLE_NAME.to_string(),
            events: 1_000_000,
            results_csv: PathBuf::from("resultados_parafina.csv"),
            timeout_secs: None,
            beam: BeamConfig::default(),
            x: GridAxis::default(),
            y: GridAxis::default(),
            z: GridAxis::default(),
        }
    }
}

/// Half-widths of the paraffin block (cm)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl GeometryPoint {
    /// Full width, height and thickness
    pub fn full_dimensions(&self) -> (f64, f64, f64) {
        (
            round_cm(2.0 * self.x),
            round_cm(2.0 * self.y),
            round_cm(2.0 * self.z),
        )
    }

    /// `WxHxT` tag used in renamed output files
    pub fn label(&self) -> String {
        let (w, h, t) = self.full_dimensions();
        format!("{}x{}x{}", fmt_cm(w), fmt_cm(h), fmt_cm(t))
    }
}

impl fmt::Display for GeometryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h, t) = self.full_dimensions();
        write!(f, "{}×{}×{} cm", fmt_cm(w), fmt_cm(h), fmt_cm(t))
    }
}

/// Lengths always carry a decimal point: 1 -> "1.0", 0.75 -> "0.75"
pub fn fmt_cm(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

impl SweepConfig {
    /// Every grid point, x outermost and z innermost
    pub fn grid(&self) -> Vec<GeometryPoint> {
        let (xs, ys, zs) = (self.x.values(), self.y.values(), self.z.values());
        let mut points = Vec::with_capacity(xs.len() * ys.len() * zs.len());
        for &x in &xs {
            for &y in &ys {
                for &z in &zs {
                    points.push(GeometryPoint { x, y, z });
                }
            }
        }
        points
    }

    pub fn validate(&self) -> Result<()> {
        self.x.validate("x")?;
        self.y.validate("y")?;
        self.z.validate("z")?;
        if self.events == 0 {
            return Err(AnalysisError::InvalidConfig("sweep.events must be positive".into()));
        }
        if self.beam.number == 0 {
            return Err(AnalysisError::InvalidConfig(
                "sweep.beam.number must be positive".into(),
            ));
        }
        if self.table.is_empty() {
            return Err(AnalysisError::InvalidConfig("sweep.table is empty".into()));
        }
        if self.timeout_secs == Some(0) {
            return Err(AnalysisError::InvalidConfig(
                "sweep.timeout_secs must be positive when set".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_axis_has_twenty_values() {
        let values = GridAxis::default().values();
        assert_eq!(values.len(), 20);
        assert_eq!(values[0], 0.5);
        assert_eq!(values[19], 10.0);
        // no accumulated drift
        assert_eq!(values[6], 3.5);
    }

    #[test]
    fn stop_is_exclusive() {
        let axis = GridAxis {
            start: 1.0,
            stop: 2.0,
            step: 0.5,
        };
        assert_eq!(axis.values(), vec![1.0, 1.5]);
        let empty = GridAxis {
            start: 2.0,
            stop: 1.0,
            step: 0.5,
        };
        assert!(empty.values().is_empty());
    }

    #[test]
    fn default_grid_is_full_factorial() {
        let cfg = SweepConfig::default();
        assert_eq!(cfg.grid().len(), 8000);
        let first = cfg.grid()[0];
        assert_eq!(first.label(), "1.0x1.0x1.0");
    }

    #[test]
    fn labels_keep_fractional_sizes() {
        let p = GeometryPoint {
            x: 0.75,
            y: 1.0,
            z: 0.35,
        };
        assert_eq!(p.label(), "1.5x2.0x0.7");
        assert_eq!(p.to_string(), "1.5×2.0×0.7 cm");
    }

    #[test]
    fn zero_step_is_rejected() {
        let mut cfg = SweepConfig::default();
        cfg.z.step = 0.0;
        assert!(matches!(cfg.validate(), Err(AnalysisError::InvalidConfig(_))));

        let mut cfg = SweepConfig::default();
        cfg.timeout_secs = Some(0);
        assert!(cfg.validate().is_err());
    }
}
