// plotting/tests.rs
// Binning and plot-selection tests; nothing here writes a PNG

use super::analysis::*;
use super::export::{AngularPlot, EnergyPlot, TofPlot};
use super::*;
use crate::classify::{partition, Thresholds};
use crate::loader::{test_records, Column, Record, RecordSet};
use std::path::Path;
use ultraviolet::{DVec2, DVec3};

fn full_records(n: usize) -> RecordSet {
    let records = (0..n)
        .map(|i| {
            let mut r = Record::with_energy(2.0 * 10f64.powi(i as i32 % 8 - 3));
            r.final_time_ns = Some(i as f64);
            r.track_length_mm = Some(100.0);
            r.final_pos_mm = Some(DVec2::new(i as f64 * 0.1, -(i as f64) * 0.1));
            r.num_steps = Some(3.0);
            r.direction = Some(DVec3::new(0.0, 0.0, if i % 2 == 0 { 1.0 } else { -0.5 }));
            r
        })
        .collect();
    RecordSet::new(
        records,
        vec![
            Column::KineticEnergy,
            Column::FinalTime,
            Column::TrackLength,
            Column::FinalPosX,
            Column::FinalPosY,
            Column::NumSteps,
            Column::DirX,
            Column::DirY,
            Column::DirZ,
        ],
    )
}

#[test]
fn log_edges_span_decades() {
    let edges = log_edges(1e-3, 1e7, 200);
    assert_eq!(edges.len(), 200);
    assert!((edges[0] - 1e-3).abs() < 1e-15);
    assert!((edges[199] - 1e7).abs() < 1e-3);
    assert!(edges.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn last_bin_is_closed() {
    let edges = linear_edges(0.0, 1.0, 3);
    assert_eq!(edges, vec![0.0, 0.5, 1.0]);
    assert_eq!(bin_index(&edges, 0.0), Some(0));
    assert_eq!(bin_index(&edges, 0.5), Some(1));
    assert_eq!(bin_index(&edges, 1.0), Some(1));
    assert_eq!(bin_index(&edges, 1.0001), None);
    assert_eq!(bin_index(&edges, -0.1), None);
    assert_eq!(histogram(&[0.1, 0.6, 1.0, 2.0], &edges), vec![1.0, 2.0]);
}

#[test]
fn density_integrates_to_one() {
    let edges = linear_edges(-1.0, 1.0, 100);
    let values: Vec<f64> = (0..500).map(|i| -1.0 + 2.0 * i as f64 / 499.0).collect();
    let d = density(&histogram(&values, &edges), &edges);
    let integral: f64 = d.iter().zip(edges.windows(2)).map(|(h, w)| h * (w[1] - w[0])).sum();
    assert!((integral - 1.0).abs() < 1e-9);
}

#[test]
fn adaptive_energy_edges_respect_floor() {
    let binning = EnergyBinning::Adaptive {
        floor_ev: 1e-5,
        bins: 150,
    };
    let edges = energy_edges(&[1e-8, 0.5, 2e6, -1.0, 0.0], &binning).unwrap();
    assert_eq!(edges.len(), 151);
    assert!((edges[0] - 1e-5).abs() < 1e-18);
    assert!((edges[150] - 2e6).abs() < 1e-3);

    assert!(energy_edges(&[0.0, -3.0], &binning).is_none());
}

#[test]
fn tof_range_uses_percentile_or_max() {
    let times: Vec<f64> = (0..=100).map(|i| i as f64).collect();
    assert_eq!(tof_upper_edge(&times, &TofRange::Max), Some(100.0));
    assert_eq!(tof_upper_edge(&times, &TofRange::Percentile { q: 0.99 }), Some(99.0));
    assert_eq!(tof_upper_edge(&[0.0, 0.0], &TofRange::Max), None);
}

#[test]
fn profile_histogram_is_square_and_counts_everything() {
    let points: Vec<(f64, f64)> = (0..50).map(|i| (i as f64, (i % 5) as f64)).collect();
    let hist = histogram_2d(&points, 10).unwrap();
    let x_span = hist.x_edges[10] - hist.x_edges[0];
    let y_span = hist.y_edges[10] - hist.y_edges[0];
    assert!((x_span - y_span).abs() < 1e-9);
    let total: u32 = hist.occupied_cells().map(|(_, _, c)| c).sum();
    assert_eq!(total, 50);
    assert!(hist.occupied_cells().all(|(_, _, c)| c > 0));
}

#[test]
fn viridis_endpoints() {
    assert_eq!(export::viridis(0.0), plotters::style::RGBColor(68, 1, 84));
    assert_eq!(export::viridis(1.0), plotters::style::RGBColor(253, 231, 37));
    assert_eq!(export::viridis(f64::NAN), export::viridis(0.0));
}

#[test]
fn angular_plot_skipped_without_angular_columns() {
    let full = test_records(&[0.01, 2.0]);
    let err = check(PlotKind::AngularDistribution, &full, false).unwrap_err();
    assert!(err.contains("angular"));
    assert!(check(PlotKind::EnergySpectrum, &full, false).is_ok());
    let tof = check(PlotKind::TimeOfFlight, &full, false).unwrap_err();
    assert!(tof.contains("FinalTime_ns"));
    let profile = check(PlotKind::BeamProfile, &full, false).unwrap_err();
    assert!(profile.contains("FinalPosX_mm"));
}

#[test]
fn render_all_skips_every_plot_for_an_empty_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = PlotConfig {
        output_dir: dir.path().join("plots"),
        ..PlotConfig::default()
    };
    let full = RecordSet::new(Vec::new(), vec![Column::KineticEnergy]);
    let outcomes = render_all(&full, &full, false, &Thresholds::default(), &config);
    assert_eq!(outcomes.len(), 4);
    assert!(outcomes
        .iter()
        .all(|(_, o)| matches!(o, PlotOutcome::Skipped(_))));
    assert!(!dir.path().join("plots").join("espectro_energia.png").exists());
}

#[test]
fn prepared_series_cover_the_thermal_subset() {
    let full = full_records(40);
    let thresholds = Thresholds::default();
    let parts = partition(&full, &thresholds);

    let energy = EnergyPlot::prepare(&full, &parts.thermal, &thresholds, &EnergyBinning::default()).unwrap();
    assert_eq!(energy.full.iter().sum::<f64>() as usize, 40);
    assert_eq!(energy.thermal.iter().sum::<f64>() as usize, parts.thermal.len());

    let config = PlotConfig {
        tof_range: TofRange::Max,
        ..PlotConfig::default()
    };
    let tof = TofPlot::prepare(&full, &parts.thermal, &config).unwrap();
    assert_eq!(tof.edges.len(), config.tof_bins + 1);
    assert_eq!(tof.full.iter().sum::<f64>() as usize, 40);

    let angular = AngularPlot::prepare(&full, &parts.thermal, 99);
    assert_eq!(angular.edges.len(), 100);
    assert!(angular.full.iter().all(|d| *d >= 0.0));
}

#[test]
fn file_names_are_fixed() {
    let dir = Path::new("out");
    assert_eq!(
        output_path(dir, PlotKind::EnergySpectrum),
        dir.join("espectro_energia.png")
    );
    assert_eq!(PlotKind::BeamProfile.file_name(), "perfil_del_haz.png");
    assert_eq!(PlotKind::TimeOfFlight.file_name(), "tiempo_de_vuelo.png");
    assert_eq!(PlotKind::AngularDistribution.file_name(), "distribucion_angular.png");
}
