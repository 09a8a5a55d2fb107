// config.rs
// Centralized configuration for the analysis pipeline and the geometry sweep.
// Every component receives its section of `AnalysisConfig`; nothing below
// reads these constants directly except the serde defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::Thresholds;
use crate::error::{AnalysisError, Result};
use crate::loader::LoadMode;
use crate::plotting::PlotConfig;
use crate::report::ReportConfig;
use crate::sweep::SweepConfig;

// ====================
// Run normalisation
// ====================
/// Must match `/run/beamOn` of the macro that produced the input file.
pub const SIMULATED_TOTAL: u64 = 10_000_000;

// ====================
// Energy bands (eV)
// ====================
pub const THERMAL_MAX_EV: f64 = 0.025;
pub const EPITHERMAL_MAX_EV: f64 = 1.0;

// ====================
// Files
// ====================
/// Simulator output. A `.csv` name here resolves to the Geant4 per-table
/// files such as `NeutronData_nt_NeutronTracks.csv`.
pub const INPUT_FILE: &str = "NeutronData.root";
pub const NTUPLE_NAME: &str = "NeutronTracks";
pub const CONFIG_FILE: &str = "analysis.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Simulator output container
    pub path: PathBuf,
    /// Ntuple (table) holding one row per detected neutron
    pub table: String,
    /// Total number of primaries simulated for this file
    pub simulated_total: u64,
    pub mode: LoadMode,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(INPUT_FILE),
            table: NTUPLE_NAME.to_string(),
            simulated_total: SIMULATED_TOTAL,
            mode: LoadMode::Strict,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub input: InputConfig,
    pub thresholds: Thresholds,
    pub report: ReportConfig,
    pub plots: PlotConfig,
    pub sweep: SweepConfig,
}

impl AnalysisConfig {
    /// Load configuration from a TOML file. Missing sections and fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AnalysisConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Use `path` when given, otherwise `analysis.toml` if present, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None if Path::new(CONFIG_FILE).exists() => {
                log::info!("Loading configuration from {}", CONFIG_FILE);
                Self::from_file(CONFIG_FILE)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if self.input.table.is_empty() {
            return Err(AnalysisError::InvalidConfig("input.table is empty".into()));
        }
        if self
            .report
            .target_errors
            .iter()
            .any(|e| !(e.is_finite() && *e > 0.0))
        {
            return Err(AnalysisError::InvalidConfig(
                "report.target_errors must be positive".into(),
            ));
        }
        self.plots.validate()?;
        self.sweep.validate()
    }
}
