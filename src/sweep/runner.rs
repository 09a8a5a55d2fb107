use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::config::{GeometryPoint, SweepConfig};
use super::export::{write_results_csv, SummaryRow};
use super::macro_file::{build_macro, write_macro};
use crate::classify::{BandCounts, Thresholds};
use crate::error::{AnalysisError, Result};
use crate::loader::Column;
use crate::ntuple;

/// Runs one simulation for a macro file
pub trait Simulator {
    fn run(&mut self, macro_path: &Path) -> Result<()>;
}

/// The real simulator binary, stdout/stderr discarded
pub struct ExternalSimulator {
    executable: PathBuf,
    timeout: Option<Duration>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);

impl ExternalSimulator {
    pub fn new(executable: PathBuf, timeout: Option<Duration>) -> Self {
        Self {
            executable,
            timeout,
        }
    }

    pub fn from_config(config: &SweepConfig) -> Self {
        Self::new(
            config.executable.clone(),
            config.timeout_secs.map(Duration::from_secs),
        )
    }
}

impl Simulator for ExternalSimulator {
    fn run(&mut self, macro_path: &Path) -> Result<()> {
        let mut child = Command::new(&self.executable)
            .arg(macro_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    AnalysisError::FileNotFound(self.executable.clone())
                }
                _ => AnalysisError::Io(e),
            })?;

        let status = match self.timeout {
            None => child.wait()?,
            Some(limit) => {
                let started = Instant::now();
                loop {
                    match child.try_wait() {
                        Ok(Some(status)) => break status,
                        Ok(None) => {}
                        Err(e) => {
                            kill_and_reap(&mut child);
                            return Err(AnalysisError::Io(e));
                        }
                    }
                    if started.elapsed() >= limit {
                        kill_and_reap(&mut child);
                        return Err(AnalysisError::SimulatorTimeout(limit));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        };

        if status.success() {
            Ok(())
        } else {
            Err(AnalysisError::SimulatorFailed(status))
        }
    }
}

/// Kill the child and wait for it so no zombie is left behind.
/// A child that already exited makes `kill` fail, which is fine.
fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    if let Err(e) = child.wait() {
        log::warn!("Could not reap simulator process {}: {}", child.id(), e);
    }
}

/// Result of a whole sweep
#[derive(Debug, Clone)]
pub struct SweepSummary {
    pub rows: Vec<SummaryRow>,
    pub skipped: Vec<(GeometryPoint, String)>,
    pub elapsed: Duration,
}

/// `N min S.s s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let mins = (secs / 60.0).floor();
    format!("{} min {:.1} s", mins as u64, secs - mins * 60.0)
}

/// Insert `_<label>` right after the container stem:
/// `NeutronData.root` -> `NeutronData_2.0x2.0x1.0.root`,
/// `NeutronData_nt_NeutronTracks.csv` -> `NeutronData_2.0x2.0x1.0_nt_NeutronTracks.csv`
pub fn tagged_path(file: &Path, container: &Path, label: &str) -> PathBuf {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let container_name = container
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = container_name
        .split_once('.')
        .map(|(s, _)| s.to_string())
        .unwrap_or(container_name);

    let tagged = match name.strip_prefix(&stem) {
        Some(rest) if !stem.is_empty() => format!("{}_{}{}", stem, label, rest),
        _ => match name.split_once('.') {
            Some((s, ext)) => format!("{}_{}.{}", s, label, ext),
            None => format!("{}_{}", name, label),
        },
    };
    file.with_file_name(tagged)
}

pub struct SweepRunner {
    config: SweepConfig,
    thresholds: Thresholds,
}

impl SweepRunner {
    pub fn new(config: SweepConfig, thresholds: Thresholds) -> Self {
        Self { config, thresholds }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run every grid point, then write the results table
    pub fn run_all<S: Simulator>(&self, simulator: &mut S) -> Result<SweepSummary> {
        let start_time = Instant::now();
        let grid = self.config.grid();
        let mut rows = Vec::new();
        let mut skipped = Vec::new();

        log::info!(
            "Sweeping {} geometries with {} events each",
            grid.len(),
            self.config.events
        );

        for (idx, point) in grid.iter().enumerate() {
            println!("\n🔹 [{}/{}] Simulating block {}...", idx + 1, grid.len(), point);
            match self.run_point(simulator, point) {
                Ok(row) => {
                    println!(
                        "  ✓ detected {}, thermal {}, epithermal {}, fast {}",
                        row.detected, row.thermal, row.epithermal, row.fast
                    );
                    rows.push(row);
                }
                Err(e) => {
                    match &e {
                        AnalysisError::ExternalProcessOutputMissing(_) => {
                            log::warn!("{}: {}", point, e)
                        }
                        _ => log::error!("{}: {}", point, e),
                    }
                    skipped.push((*point, e.to_string()));
                }
            }
        }

        write_results_csv(&self.config.results_csv, &rows)?;
        let elapsed = start_time.elapsed();

        println!("\n⏱️  Total time: {}", format_elapsed(elapsed));
        println!(
            "✅ {} of {} geometries saved to '{}'",
            rows.len(),
            grid.len(),
            self.config.results_csv.display()
        );
        if !skipped.is_empty() {
            println!("⚠️  {} geometries skipped", skipped.len());
        }

        Ok(SweepSummary {
            rows,
            skipped,
            elapsed,
        })
    }

    /// One geometry: macro, simulate, tally, rename output
    pub fn run_point<S: Simulator>(
        &self,
        simulator: &mut S,
        point: &GeometryPoint,
    ) -> Result<SummaryRow> {
        let output = &self.config.output_file;
        self.move_stale_output(output)?;

        let text = build_macro(point, &self.config.beam, self.config.events);
        write_macro(&self.config.macro_file, &text)?;

        simulator.run(&self.config.macro_file)?;

        let files = ntuple::container_files(output);
        if files.is_empty() {
            return Err(AnalysisError::ExternalProcessOutputMissing(output.clone()));
        }

        let counts = self.tally_output(output)?;

        let label = point.label();
        for file in &files {
            let target = tagged_path(file, output, &label);
            fs::rename(file, &target).map_err(|e| AnalysisError::OutputFileIOError {
                path: file.clone(),
                message: format!("rename to '{}' failed: {}", target.display(), e),
            })?;
            log::debug!("{} -> {}", file.display(), target.display());
        }

        Ok(SummaryRow::new(point, counts))
    }

    /// Band counts of the energy column; the container is closed before returning
    fn tally_output(&self, output: &Path) -> Result<BandCounts> {
        let io_err = |e: AnalysisError| AnalysisError::OutputFileIOError {
            path: output.to_path_buf(),
            message: e.to_string(),
        };
        let mut file = ntuple::open(output).map_err(io_err)?;
        let table = ntuple::resolve_table(&*file, &self.config.table).map_err(io_err)?;
        let energies = file
            .read_column(&table, Column::KineticEnergy.name())
            .map_err(io_err)?;
        Ok(BandCounts::tally(energies, &self.thresholds))
    }

    /// Whatever sits at the output path now is from an earlier run; move it aside
    fn move_stale_output(&self, output: &Path) -> Result<()> {
        for file in ntuple::container_files(output) {
            let mut stale = file.clone().into_os_string();
            stale.push(".stale");
            let stale = PathBuf::from(stale);
            log::warn!(
                "Moving stale output {} to {}",
                file.display(),
                stale.display()
            );
            fs::rename(&file, &stale).map_err(|e| AnalysisError::OutputFileIOError {
                path: file.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Print the grid without running anything
    pub fn list_points(&self) {
        let grid = self.config.grid();
        println!("\n╔══════════════════════════════════════════╗");
        println!("║  Paraffin sweep: {} geometries  ", grid.len());
        println!("╚══════════════════════════════════════════╝\n");
        println!(
            "Simulator: {} {}",
            self.config.executable.display(),
            self.config.macro_file.display()
        );
        println!("Events per geometry: {}\n", self.config.events);

        for (idx, point) in grid.iter().enumerate() {
            println!("  [{}] {}", idx + 1, point);
        }
        println!("\nTotal simulator invocations: {}", grid.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_minutes_and_seconds() {
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2 min 5.0 s");
        assert_eq!(format_elapsed(Duration::from_millis(59_500)), "0 min 59.5 s");
    }

    #[test]
    fn tagged_path_inserts_label_after_stem() {
        let container = Path::new("run/NeutronData.csv");
        assert_eq!(
            tagged_path(Path::new("run/NeutronData_nt_NeutronTracks.csv"), container, "1.0x1.0x1.0"),
            PathBuf::from("run/NeutronData_1.0x1.0x1.0_nt_NeutronTracks.csv")
        );
        assert_eq!(
            tagged_path(Path::new("NeutronData.root"), Path::new("NeutronData.root"), "2.0x3.0x1.0"),
            PathBuf::from("NeutronData_2.0x3.0x1.0.root")
        );
    }

    #[cfg(unix)]
    #[test]
    fn failing_executable_is_simulator_failed() {
        let mut sim = ExternalSimulator::new(PathBuf::from("false"), None);
        let err = sim.run(Path::new("auto.mac")).unwrap_err();
        assert!(matches!(err, AnalysisError::SimulatorFailed(_)));
    }

    #[cfg(unix)]
    #[test]
    fn hung_executable_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow.sh");
        fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        let mut sim = ExternalSimulator::new(PathBuf::from("sh"), Some(Duration::from_millis(200)));
        let err = sim.run(&script).unwrap_err();
        assert!(matches!(err, AnalysisError::SimulatorTimeout(d) if d == Duration::from_millis(200)));
        assert_eq!(err.to_string(), "simulator killed after 200ms timeout");
    }

    #[cfg(unix)]
    #[test]
    fn kill_and_reap_leaves_no_running_child() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        kill_and_reap(&mut child);
        assert!(child.try_wait().unwrap().is_some());

        // a second call on an exited child is harmless
        kill_and_reap(&mut child);
    }

    #[test]
    fn missing_executable_is_not_found() {
        let mut sim = ExternalSimulator::new(PathBuf::from("./definitely-not-a-simulator"), None);
        let err = sim.run(Path::new("auto.mac")).unwrap_err();
        assert!(matches!(err, AnalysisError::FileNotFound(_)));
    }
}
