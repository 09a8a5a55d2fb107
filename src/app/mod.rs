use std::path::{Path, PathBuf};

use crate::classify::partition;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::loader::load_records;
use crate::plotting::{self, PlotKind, PlotOutcome};
use crate::report::Report;

/// Command-line overrides applied on top of the configuration file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub no_plots: bool,
    pub json: Option<PathBuf>,
}

#[derive(Debug)]
pub struct AnalysisOutput {
    /// `None` when nothing was detected
    pub report: Option<Report>,
    pub plots: Vec<(PlotKind, PlotOutcome)>,
}

/// Resolve the configuration for one run: file (or defaults), then CLI overrides.
pub fn resolve_config(options: &RunOptions) -> Result<AnalysisConfig> {
    let mut config = AnalysisConfig::load_or_default(options.config.as_deref())?;
    if let Some(input) = &options.input {
        config.input.path = input.clone();
    }
    if options.no_plots {
        config.plots.enabled = false;
    }
    config.validate()?;
    Ok(config)
}

/// Load, classify, plot and report. Plots that fail are logged and recorded
/// in the output, they never abort the run. An empty dataset is reported and
/// is not an error; loading failures are.
pub fn analyze(config: &AnalysisConfig, json: Option<&Path>) -> Result<AnalysisOutput> {
    let input = &config.input;
    let loaded = load_records(&input.path, &input.table, input.mode)?;
    let full = loaded.records;

    log::info!("--- Classifying energies...");
    let bands = partition(&full, &config.thresholds);

    let plots = if config.plots.enabled {
        log::info!("--- Generating plots...");
        plotting::render_all(
            &full,
            &bands.thermal,
            loaded.angular_present,
            &config.thresholds,
            &config.plots,
        )
    } else {
        log::info!("Plots disabled");
        Vec::new()
    };

    log::info!("--- Computing statistics...");
    let report = match Report::compute(
        &full,
        &bands,
        input.simulated_total,
        loaded.angular_present,
        &config.thresholds,
        &config.report,
    ) {
        Ok(report) => Some(report.with_source(format!("{} (ntuple: {})", input.path.display(), input.table))),
        Err(AnalysisError::EmptyDataset) => {
            log::error!("{}", AnalysisError::EmptyDataset);
            None
        }
        Err(e) => return Err(e),
    };

    if let Some(report) = &report {
        report.print();
        if let Some(path) = json {
            report.write_json(path)?;
        }
    }

    Ok(AnalysisOutput { report, plots })
}

pub fn run(options: &RunOptions) -> anyhow::Result<AnalysisOutput> {
    let config = resolve_config(options)?;
    let output = analyze(&config, options.json.as_deref())?;
    log::info!("--- Analysis complete ---");
    Ok(output)
}
