// Sweep driver runs against a fake simulator that writes Geant4 CSV ntuples

use neutron_thermalization::classify::Thresholds;
use neutron_thermalization::sweep::{
    read_results_csv, GridAxis, Simulator, SweepConfig, SweepRunner,
};
use neutron_thermalization::{AnalysisError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes a fixed ntuple on every call except the listed ones
struct FakeSimulator {
    out_dir: PathBuf,
    energies: Vec<f64>,
    produce_nothing_on: Vec<usize>,
    fail_on: Vec<usize>,
    calls: usize,
    macros: Vec<String>,
}

impl FakeSimulator {
    fn new(out_dir: &Path, energies: Vec<f64>) -> Self {
        Self {
            out_dir: out_dir.to_path_buf(),
            energies,
            produce_nothing_on: Vec::new(),
            fail_on: Vec::new(),
            calls: 0,
            macros: Vec::new(),
        }
    }
}

impl Simulator for FakeSimulator {
    fn run(&mut self, macro_path: &Path) -> Result<()> {
        let call = self.calls;
        self.calls += 1;
        self.macros.push(fs::read_to_string(macro_path)?);

        if self.fail_on.contains(&call) {
            // any non-success status will do
            let status = std::process::Command::new("false").status()?;
            return Err(AnalysisError::SimulatorFailed(status));
        }
        if self.produce_nothing_on.contains(&call) {
            return Ok(());
        }

        let mut text = String::from("#class tools::wcsv::ntuple\n#separator 44\n#column double KineticEnergy_eV\n");
        for e in &self.energies {
            text.push_str(&format!("{}\n", e));
        }
        fs::write(self.out_dir.join("NeutronData_nt_NeutronTracks.csv"), text)?;
        Ok(())
    }
}

fn sweep_config(dir: &Path) -> SweepConfig {
    let single = GridAxis {
        start: 0.5,
        stop: 0.6,
        step: 0.5,
    };
    SweepConfig {
        macro_file: dir.join("auto.mac"),
        output_file: dir.join("NeutronData.csv"),
        results_csv: dir.join("resultados_parafina.csv"),
        events: 1000,
        x: single,
        y: single,
        z: GridAxis {
            start: 0.5,
            stop: 2.0,
            step: 0.5,
        },
        ..SweepConfig::default()
    }
}

#[test]
fn missing_output_point_is_absent_from_results() {
    let dir = tempfile::tempdir().unwrap();
    let config = sweep_config(dir.path());
    let runner = SweepRunner::new(config.clone(), Thresholds::default());

    // thermal, epithermal (0.5 eV is below the 1 eV cut), fast
    let mut sim = FakeSimulator::new(dir.path(), vec![0.01, 0.5, 2.0e6, 0.02]);
    sim.produce_nothing_on = vec![1];

    let summary = runner.run_all(&mut sim).unwrap();
    assert_eq!(sim.calls, 3);
    assert_eq!(summary.rows.len(), 2);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].0.z, 1.0);

    let rows = read_results_csv(&config.results_csv).unwrap();
    assert_eq!(rows, summary.rows);
    let thicknesses: Vec<f64> = rows.iter().map(|r| r.thickness_cm).collect();
    assert_eq!(thicknesses, vec![1.0, 3.0]);
    for r in &rows {
        assert_eq!((r.width_cm, r.height_cm), (1.0, 1.0));
        assert_eq!(r.detected, 4);
        assert_eq!((r.thermal, r.epithermal, r.fast), (2, 1, 1));
    }

    // outputs were renamed per geometry, nothing left under the live name
    assert!(dir.path().join("NeutronData_1.0x1.0x1.0_nt_NeutronTracks.csv").exists());
    assert!(dir.path().join("NeutronData_1.0x1.0x3.0_nt_NeutronTracks.csv").exists());
    assert!(!dir.path().join("NeutronData_nt_NeutronTracks.csv").exists());
}

#[test]
fn failed_simulator_is_distinct_from_missing_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = sweep_config(dir.path());
    let runner = SweepRunner::new(config, Thresholds::default());

    let mut sim = FakeSimulator::new(dir.path(), vec![0.01]);
    sim.fail_on = vec![0];
    sim.produce_nothing_on = vec![1];

    let point_a = runner.config().grid()[0];
    let point_b = runner.config().grid()[1];
    assert!(matches!(
        runner.run_point(&mut sim, &point_a),
        Err(AnalysisError::SimulatorFailed(_))
    ));
    assert!(matches!(
        runner.run_point(&mut sim, &point_b),
        Err(AnalysisError::ExternalProcessOutputMissing(_))
    ));
}

#[test]
fn stale_output_is_not_counted_as_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let config = sweep_config(dir.path());
    let runner = SweepRunner::new(config, Thresholds::default());

    let stale = dir.path().join("NeutronData_nt_NeutronTracks.csv");
    fs::write(&stale, "#column double KineticEnergy_eV\n0.01\n").unwrap();

    let mut sim = FakeSimulator::new(dir.path(), vec![0.01]);
    sim.produce_nothing_on = vec![0];

    let point = runner.config().grid()[0];
    assert!(matches!(
        runner.run_point(&mut sim, &point),
        Err(AnalysisError::ExternalProcessOutputMissing(_))
    ));
    assert!(dir.path().join("NeutronData_nt_NeutronTracks.csv.stale").exists());
}

#[test]
fn sweep_uses_configured_thresholds() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = sweep_config(dir.path());
    config.z = GridAxis {
        start: 0.5,
        stop: 0.6,
        step: 0.5,
    };
    // 0.5 eV epithermal cut used by the sweep tables
    let runner = SweepRunner::new(config, Thresholds::new(0.025, 0.5).unwrap());
    let mut sim = FakeSimulator::new(dir.path(), vec![0.01, 0.5, 0.7]);

    let summary = runner.run_all(&mut sim).unwrap();
    let r = &summary.rows[0];
    assert_eq!((r.thermal, r.epithermal, r.fast), (1, 0, 2));
}

#[test]
fn macro_is_written_for_each_point() {
    let dir = tempfile::tempdir().unwrap();
    let config = sweep_config(dir.path());
    let runner = SweepRunner::new(config, Thresholds::default());
    let mut sim = FakeSimulator::new(dir.path(), vec![0.01]);

    runner.run_all(&mut sim).unwrap();
    assert_eq!(sim.macros.len(), 3);
    assert!(sim.macros[0].contains("/detector/setParaffinZ 0.5 cm"));
    assert!(sim.macros[2].contains("/detector/setParaffinZ 1.5 cm"));
    assert!(sim.macros[2].contains("/gun/position 0 0 -1.6 cm"));
    assert!(sim.macros[2].contains("/run/beamOn 1000"));
}
