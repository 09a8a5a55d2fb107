use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use neutron_thermalization::app::{self, RunOptions};

/// Analyse one neutron-thermalization run: energy bands, statistics, projections and plots.
#[derive(Parser, Debug)]
#[command(name = "neutron_thermalization", version)]
struct Args {
    /// TOML configuration (default: analysis.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulator output to analyse, overrides [input].path
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Skip PNG rendering
    #[arg(long)]
    no_plots: bool,

    /// Also write the metrics as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let options = RunOptions {
        config: args.config,
        input: args.input,
        no_plots: args.no_plots,
        json: args.json,
    };

    match app::run(&options) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
