// error.rs
// Error kinds shared by the loader, reporter, plotter and sweep driver

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

#[derive(Debug)]
pub enum AnalysisError {
    /// Input container does not exist
    FileNotFound(PathBuf),
    /// Named table is absent; `available` has version suffixes stripped
    TableNotFound { table: String, available: Vec<String> },
    /// One or more required columns are absent
    MissingColumn(Vec<String>),
    /// Zero detected particles
    EmptyDataset,
    /// Simulated-particle total configured as zero
    ZeroSimulatedTotal,
    /// Simulator exited cleanly but its output file is not there
    ExternalProcessOutputMissing(PathBuf),
    /// Simulator exited with a non-success status
    SimulatorFailed(ExitStatus),
    /// Simulator was killed after exceeding the configured timeout
    SimulatorTimeout(Duration),
    /// Reading or renaming a simulator output file failed
    OutputFileIOError { path: PathBuf, message: String },
    InvalidConfig(String),
    Io(std::io::Error),
    Parse(String),
    Plot(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::FileNotFound(path) => {
                write!(f, "file not found: '{}'", path.display())
            }
            AnalysisError::TableNotFound { table, available } => write!(
                f,
                "table '{}' not found (available: {})",
                table,
                available.join(", ")
            ),
            AnalysisError::MissingColumn(columns) => {
                write!(f, "missing column(s): {}", columns.join(", "))
            }
            AnalysisError::EmptyDataset => write!(f, "no detected particles"),
            AnalysisError::ZeroSimulatedTotal => {
                write!(f, "simulated particle total is zero")
            }
            AnalysisError::ExternalProcessOutputMissing(path) => write!(
                f,
                "simulator finished but produced no output at '{}'",
                path.display()
            ),
            AnalysisError::SimulatorFailed(status) => {
                write!(f, "simulator exited with {}", status)
            }
            AnalysisError::SimulatorTimeout(limit) => {
                write!(f, "simulator killed after {:?} timeout", limit)
            }
            AnalysisError::OutputFileIOError { path, message } => {
                write!(f, "output file '{}': {}", path.display(), message)
            }
            AnalysisError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            AnalysisError::Io(e) => write!(f, "I/O error: {}", e),
            AnalysisError::Parse(msg) => write!(f, "parse error: {}", msg),
            AnalysisError::Plot(msg) => write!(f, "plot error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(e: std::io::Error) -> Self {
        AnalysisError::Io(e)
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(e: csv::Error) -> Self {
        AnalysisError::Parse(e.to_string())
    }
}

impl From<toml::de::Error> for AnalysisError {
    fn from(e: toml::de::Error) -> Self {
        AnalysisError::InvalidConfig(e.to_string())
    }
}

impl From<toml::ser::Error> for AnalysisError {
    fn from(e: toml::ser::Error) -> Self {
        AnalysisError::InvalidConfig(e.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
