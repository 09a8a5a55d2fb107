pub mod classify;
pub mod config;
pub mod error;
pub mod loader;
pub mod ntuple;
pub mod plotting;
pub mod report;
pub mod stats;
pub mod sweep;

pub mod app;

pub use error::{AnalysisError, Result};
