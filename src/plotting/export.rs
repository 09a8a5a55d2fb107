// plotting/export.rs
// PNG rendering of the diagnostic histograms

use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::ranged1d::Ranged;
use plotters::prelude::*;
use std::error::Error;
use std::path::Path;

use super::analysis::{self, Histogram2d};
use super::{EnergyBinning, PlotConfig};
use crate::classify::Thresholds;
use crate::loader::{Column, RecordSet};

type DrawResult = Result<(), Box<dyn Error>>;

const FULL_COLOR: RGBColor = RGBColor(31, 119, 180);
const THERMAL_COLOR: RGBColor = RGBColor(255, 127, 14);
const THERMAL_CUT_COLOR: RGBColor = RGBColor(214, 39, 40);
const EPITHERMAL_CUT_COLOR: RGBColor = RGBColor(44, 160, 44);

/// Binned energy spectrum of all and thermal neutrons
#[derive(Debug, Clone)]
pub struct EnergyPlot {
    pub edges: Vec<f64>,
    pub full: Vec<f64>,
    pub thermal: Vec<f64>,
    pub full_total: usize,
    pub thermal_total: usize,
    pub thresholds: Thresholds,
}

impl EnergyPlot {
    pub fn prepare(
        full: &RecordSet,
        thermal: &RecordSet,
        thresholds: &Thresholds,
        binning: &EnergyBinning,
    ) -> Option<Self> {
        let energies = full.values(Column::KineticEnergy);
        let edges = analysis::energy_edges(&energies, binning)?;
        let thermal_energies = thermal.values(Column::KineticEnergy);
        Some(Self {
            full: analysis::histogram(&energies, &edges),
            thermal: analysis::histogram(&thermal_energies, &edges),
            edges,
            full_total: full.len(),
            thermal_total: thermal.len(),
            thresholds: *thresholds,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TofPlot {
    pub edges: Vec<f64>,
    pub full: Vec<f64>,
    pub thermal: Vec<f64>,
}

impl TofPlot {
    pub fn prepare(full: &RecordSet, thermal: &RecordSet, config: &PlotConfig) -> Option<Self> {
        let times = full.values(Column::FinalTime);
        let upper = analysis::tof_upper_edge(&times, &config.tof_range)?;
        let edges = analysis::linear_edges(0.0, upper, config.tof_bins.max(1) + 1);
        Some(Self {
            full: analysis::histogram(&times, &edges),
            thermal: analysis::histogram(&thermal.values(Column::FinalTime), &edges),
            edges,
        })
    }
}

/// Density-normalised cos(theta) distributions
#[derive(Debug, Clone)]
pub struct AngularPlot {
    pub edges: Vec<f64>,
    pub full: Vec<f64>,
    pub thermal: Vec<f64>,
}

impl AngularPlot {
    pub fn prepare(full: &RecordSet, thermal: &RecordSet, bins: usize) -> Self {
        let edges = analysis::linear_edges(-1.0, 1.0, bins.max(1) + 1);
        let full_counts = analysis::histogram(&full.values(Column::DirZ), &edges);
        let thermal_counts = analysis::histogram(&thermal.values(Column::DirZ), &edges);
        Self {
            full: analysis::density(&full_counts, &edges),
            thermal: analysis::density(&thermal_counts, &edges),
            edges,
        }
    }
}

fn max_height(heights: &[f64]) -> f64 {
    heights.iter().copied().fold(0.0, f64::max)
}

/// Outline of a histogram, heights clamped to `floor` so log axes stay drawable
fn step_points(edges: &[f64], heights: &[f64], floor: f64) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(heights.len() * 2 + 2);
    points.push((edges[0], floor));
    for (w, h) in edges.windows(2).zip(heights) {
        let h = h.max(floor);
        points.push((w[0], h));
        points.push((w[1], h));
    }
    if let Some(last) = edges.last() {
        points.push((*last, floor));
    }
    points
}

fn draw_step<X, Y>(
    chart: &mut ChartContext<'_, BitMapBackend<'_>, Cartesian2d<X, Y>>,
    edges: &[f64],
    heights: &[f64],
    floor: f64,
    color: RGBColor,
    label: String,
) -> DrawResult
where
    X: Ranged<ValueType = f64>,
    Y: Ranged<ValueType = f64>,
{
    chart
        .draw_series(std::iter::once(PathElement::new(
            step_points(edges, heights, floor),
            color.stroke_width(2),
        )))?
        .label(label)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    Ok(())
}

fn draw_filled<X, Y>(
    chart: &mut ChartContext<'_, BitMapBackend<'_>, Cartesian2d<X, Y>>,
    edges: &[f64],
    heights: &[f64],
    floor: f64,
    color: RGBColor,
    label: String,
) -> DrawResult
where
    X: Ranged<ValueType = f64>,
    Y: Ranged<ValueType = f64>,
{
    let fill = color.mix(0.7).filled();
    chart
        .draw_series(
            edges
                .windows(2)
                .zip(heights)
                .filter(|(_, h)| **h > floor)
                .map(move |(w, h)| Rectangle::new([(w[0], floor), (w[1], *h)], fill)),
        )?
        .label(label)
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.mix(0.7).filled()));
    Ok(())
}

fn draw_vertical<X, Y>(
    chart: &mut ChartContext<'_, BitMapBackend<'_>, Cartesian2d<X, Y>>,
    x: f64,
    (y_lo, y_hi): (f64, f64),
    color: RGBColor,
    label: String,
) -> DrawResult
where
    X: Ranged<ValueType = f64>,
    Y: Ranged<ValueType = f64>,
{
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(x, y_lo), (x, y_hi)],
            color.stroke_width(2),
        )))?
        .label(label)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    Ok(())
}

pub fn draw_energy(path: &Path, data: &EnergyPlot, config: &PlotConfig) -> DrawResult {
    let root = BitMapBackend::new(path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let floor = 0.5;
    let y_max = (max_height(&data.full) * 2.0).max(10.0);
    let x_lo = data.edges[0];
    let x_hi = data.edges[data.edges.len() - 1];

    let mut chart = ChartBuilder::on(&root)
        .caption("Espectro de Energía de Neutrones en el Detector", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d((x_lo..x_hi).log_scale(), (floor..y_max).log_scale())?;

    chart
        .configure_mesh()
        .x_desc("Energía Cinética (eV)")
        .y_desc("Cuentas / Bin")
        .x_label_formatter(&|x| format!("{:.0e}", x))
        .y_label_formatter(&|y| format!("{:.0e}", y))
        .draw()?;

    draw_step(
        &mut chart,
        &data.edges,
        &data.full,
        floor,
        FULL_COLOR,
        format!("Todos los neutrones (total: {})", data.full_total),
    )?;
    if data.thermal_total > 0 {
        draw_filled(
            &mut chart,
            &data.edges,
            &data.thermal,
            floor,
            THERMAL_COLOR,
            format!(
                "Térmicos (< {} eV) (total: {})",
                data.thresholds.thermal_max_ev, data.thermal_total
            ),
        )?;
    }

    let cuts = [
        (data.thresholds.thermal_max_ev, THERMAL_CUT_COLOR, "Corte térmico"),
        (data.thresholds.epithermal_max_ev, EPITHERMAL_CUT_COLOR, "Corte epitérmico"),
    ];
    for (x, color, name) in cuts {
        if x > x_lo && x < x_hi {
            draw_vertical(&mut chart, x, (floor, y_max), color, format!("{} ({} eV)", name, x))?;
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

pub fn draw_tof(path: &Path, data: &TofPlot, config: &PlotConfig) -> DrawResult {
    let root = BitMapBackend::new(path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_range = data.edges[0]..data.edges[data.edges.len() - 1];
    let peak = max_height(&data.full).max(1.0);
    let caption = "Tiempo de Vuelo (ToF) de Neutrones en el Detector";

    if config.tof_log_y {
        let floor = 0.5;
        let mut chart = ChartBuilder::on(&root)
            .caption(caption, ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(45)
            .y_label_area_size(65)
            .build_cartesian_2d(x_range, (floor..peak * 2.0).log_scale())?;
        chart
            .configure_mesh()
            .x_desc("Tiempo (ns)")
            .y_desc("Cuentas / Bin")
            .y_label_formatter(&|y| format!("{:.0e}", y))
            .draw()?;
        draw_step(&mut chart, &data.edges, &data.full, floor, FULL_COLOR, "Todos los neutrones".into())?;
        draw_filled(&mut chart, &data.edges, &data.thermal, floor, THERMAL_COLOR, "Neutrones térmicos".into())?;
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    } else {
        let mut chart = ChartBuilder::on(&root)
            .caption(caption, ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(45)
            .y_label_area_size(65)
            .build_cartesian_2d(x_range, 0.0..peak * 1.1)?;
        chart
            .configure_mesh()
            .x_desc("Tiempo (ns)")
            .y_desc("Cuentas / Bin")
            .draw()?;
        draw_step(&mut chart, &data.edges, &data.full, 0.0, FULL_COLOR, "Todos los neutrones".into())?;
        draw_filled(&mut chart, &data.edges, &data.thermal, 0.0, THERMAL_COLOR, "Neutrones térmicos".into())?;
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// Viridis colour for `t` in [0, 1], interpolated between five anchors
pub fn viridis(t: f64) -> RGBColor {
    const STOPS: [(u8, u8, u8); 5] = [
        (68, 1, 84),
        (59, 82, 139),
        (33, 145, 140),
        (94, 201, 98),
        (253, 231, 37),
    ];
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let pos = t * (STOPS.len() - 1) as f64;
    let i = (pos.floor() as usize).min(STOPS.len() - 2);
    let frac = pos - i as f64;
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (STOPS[i], STOPS[i + 1]);
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

pub fn draw_profile(path: &Path, hist: &Histogram2d, config: &PlotConfig) -> DrawResult {
    // square plot plus a colour bar strip
    let side = config.height;
    let bar_width = 140;
    let root = BitMapBackend::new(path, (side + bar_width, side)).into_drawing_area();
    root.fill(&WHITE)?;
    let (plot_area, bar_area) = root.split_horizontally(side as i32);

    let n = hist.x_edges.len() - 1;
    let max_count = hist.max_count().max(1) as f64;

    let mut chart = ChartBuilder::on(&plot_area)
        .caption("Perfil del Haz en el Detector", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(hist.x_edges[0]..hist.x_edges[n], hist.y_edges[0]..hist.y_edges[n])?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Posición X (mm)")
        .y_desc("Posición Y (mm)")
        .draw()?;

    chart.draw_series(hist.occupied_cells().map(|(lo, hi, count)| {
        let t = if max_count > 1.0 {
            (count as f64 - 1.0) / (max_count - 1.0)
        } else {
            1.0
        };
        Rectangle::new([lo, hi], viridis(t).filled())
    }))?;

    let mut bar = ChartBuilder::on(&bar_area)
        .margin_top(45)
        .margin_bottom(55)
        .margin_right(10)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..1.0, 1.0..max_count.max(2.0))?;
    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc("Cuentas")
        .draw()?;

    let steps = 100;
    let span = max_count.max(2.0) - 1.0;
    bar.draw_series((0..steps).map(|i| {
        let y0 = 1.0 + span * i as f64 / steps as f64;
        let y1 = 1.0 + span * (i + 1) as f64 / steps as f64;
        Rectangle::new([(0.0, y0), (1.0, y1)], viridis(i as f64 / (steps - 1) as f64).filled())
    }))?;

    root.present()?;
    Ok(())
}

pub fn draw_angular(path: &Path, data: &AngularPlot, config: &PlotConfig) -> DrawResult {
    let root = BitMapBackend::new(path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let peak = max_height(&data.full).max(max_height(&data.thermal)).max(0.1);
    let mut chart = ChartBuilder::on(&root)
        .caption("Distribución Angular de Neutrones en el Detector", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(-1.0..1.0, 0.0..peak * 1.1)?;
    chart
        .configure_mesh()
        .x_desc("cos(θ) (DirZ)")
        .y_desc("Cuentas (normalizado)")
        .draw()?;

    draw_step(&mut chart, &data.edges, &data.full, 0.0, FULL_COLOR, "Todos los neutrones".into())?;
    if max_height(&data.thermal) > 0.0 {
        draw_filled(&mut chart, &data.edges, &data.thermal, 0.0, THERMAL_COLOR, "Neutrones térmicos".into())?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}
