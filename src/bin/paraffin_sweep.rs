/// CLI tool for sweeping the paraffin block geometry through the simulator
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use neutron_thermalization::config::AnalysisConfig;
use neutron_thermalization::sweep::{ExternalSimulator, SweepRunner};

#[derive(Parser, Debug)]
#[command(name = "paraffin_sweep", version, about = "Paraffin moderator geometry sweep")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a configuration file with the default grid, beam and thresholds
    Generate {
        /// Output TOML file
        file: PathBuf,
    },
    /// List every geometry of a configuration without running anything
    List {
        /// Configuration TOML file
        file: PathBuf,
    },
    /// Run the whole sweep and write the results table
    Run {
        /// Configuration TOML file
        file: PathBuf,
        /// Override the simulator executable
        #[arg(long)]
        executable: Option<PathBuf>,
        /// Kill a simulator run after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Generate { file } => generate_config(file),
        Command::List { file } => list_points(file),
        Command::Run {
            file,
            executable,
            timeout,
        } => run_sweep(file, executable, timeout),
    }
}

fn load(file: &Path) -> anyhow::Result<AnalysisConfig> {
    AnalysisConfig::from_file(file)
        .with_context(|| format!("loading configuration '{}'", file.display()))
}

fn generate_config(file: PathBuf) -> anyhow::Result<()> {
    println!("\n🔧 Generating sweep configuration...\n");

    let config = AnalysisConfig::default();
    config
        .to_file(&file)
        .with_context(|| format!("writing '{}'", file.display()))?;

    let grid = config.sweep.grid();
    println!("✅ Sweep configuration generated: {}", file.display());
    println!("📊 Total geometries: {}", grid.len());
    println!(
        "   - {} x {} x {} half-width values",
        config.sweep.x.values().len(),
        config.sweep.y.values().len(),
        config.sweep.z.values().len()
    );
    println!("   - {} events per geometry\n", config.sweep.events);
    Ok(())
}

fn list_points(file: PathBuf) -> anyhow::Result<()> {
    let config = load(&file)?;
    let runner = SweepRunner::new(config.sweep, config.thresholds);
    runner.list_points();
    Ok(())
}

fn run_sweep(file: PathBuf, executable: Option<PathBuf>, timeout: Option<u64>) -> anyhow::Result<()> {
    let mut config = load(&file)?;
    if let Some(exe) = executable {
        config.sweep.executable = exe;
    }
    if timeout.is_some() {
        config.sweep.timeout_secs = timeout;
    }
    config.validate()?;

    println!("\n╔══════════════════════════════════════════╗");
    println!("║  Paraffin sweep: {}  ", file.display());
    println!("╚══════════════════════════════════════════╝\n");

    let mut simulator = ExternalSimulator::from_config(&config.sweep);
    let runner = SweepRunner::new(config.sweep, config.thresholds);
    let summary = runner.run_all(&mut simulator)?;

    log::info!(
        "Sweep finished: {} rows, {} skipped",
        summary.rows.len(),
        summary.skipped.len()
    );
    Ok(())
}
