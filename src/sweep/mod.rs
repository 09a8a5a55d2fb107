/// Paraffin geometry sweep
///
/// This module provides functionality to:
/// - Enumerate block half-widths on a 3D grid
/// - Write a Geant4 macro per geometry and run the simulator headlessly
/// - Tally the detected neutrons per energy band
/// - Export one summary row per geometry to CSV

pub mod config;
pub mod export;
pub mod macro_file;
pub mod runner;

pub use config::{BeamConfig, GeometryPoint, GridAxis, SweepConfig};
pub use export::{read_results_csv, write_results_csv, SummaryRow};
pub use runner::{ExternalSimulator, Simulator, SweepRunner, SweepSummary};
