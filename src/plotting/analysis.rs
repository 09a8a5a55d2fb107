// plotting/analysis.rs
// Binning functions for the diagnostic histograms

use super::{EnergyBinning, TofRange};
use crate::stats;

/// `n_edges` logarithmically spaced edges from `min` to `max` (both > 0)
pub fn log_edges(min: f64, max: f64, n_edges: usize) -> Vec<f64> {
    let (lo, hi) = (min.log10(), max.log10());
    let mut edges: Vec<f64> = linear_edges(lo, hi, n_edges)
        .into_iter()
        .map(|e| 10f64.powf(e))
        .collect();
    // pin the endpoints so values exactly on them are not lost to rounding
    if let Some(first) = edges.first_mut() {
        *first = min;
    }
    if let Some(last) = edges.last_mut() {
        *last = max;
    }
    edges
}

/// `n_edges` evenly spaced edges from `min` to `max`, endpoints included
pub fn linear_edges(min: f64, max: f64, n_edges: usize) -> Vec<f64> {
    if n_edges < 2 {
        return vec![min, max];
    }
    let step = (max - min) / (n_edges - 1) as f64;
    (0..n_edges)
        .map(|i| {
            if i == n_edges - 1 {
                max
            } else {
                min + i as f64 * step
            }
        })
        .collect()
}

/// Bin index of `value`; the last bin is closed on the right, values outside
/// the edges are dropped.
pub fn bin_index(edges: &[f64], value: f64) -> Option<usize> {
    let n_bins = edges.len().checked_sub(1)?;
    if n_bins == 0 || !value.is_finite() || value < edges[0] || value > edges[n_bins] {
        return None;
    }
    if value == edges[n_bins] {
        return Some(n_bins - 1);
    }
    let idx = edges.partition_point(|e| *e <= value);
    Some(idx.saturating_sub(1).min(n_bins - 1))
}

pub fn histogram(values: &[f64], edges: &[f64]) -> Vec<f64> {
    let mut counts = vec![0.0; edges.len().saturating_sub(1)];
    for &v in values {
        if let Some(i) = bin_index(edges, v) {
            counts[i] += 1.0;
        }
    }
    counts
}

/// Normalise counts so the histogram integrates to one over the edges
pub fn density(counts: &[f64], edges: &[f64]) -> Vec<f64> {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return counts.to_vec();
    }
    counts
        .iter()
        .zip(edges.windows(2))
        .map(|(c, w)| c / (total * (w[1] - w[0])))
        .collect()
}

/// Energy bin edges, or `None` when no positive energy exists to put on a log axis.
pub fn energy_edges(energies: &[f64], binning: &EnergyBinning) -> Option<Vec<f64>> {
    match *binning {
        EnergyBinning::Fixed { min_ev, max_ev, bins } => {
            Some(log_edges(min_ev, max_ev, bins.max(1) + 1))
        }
        EnergyBinning::Adaptive { floor_ev, bins } => {
            let (min_pos, max_pos) = energies
                .iter()
                .filter(|e| **e > 0.0 && e.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(mn, mx), &e| {
                    (mn.min(e), mx.max(e))
                });
            if !min_pos.is_finite() {
                return None;
            }
            let e_min = floor_ev.max(min_pos);
            if e_min < max_pos {
                Some(log_edges(e_min, max_pos, bins.max(1) + 1))
            } else {
                // every positive energy sits at or below the floor
                Some(vec![e_min, e_min * 10.0])
            }
        }
    }
}

/// Upper edge of the time-of-flight axis
pub fn tof_upper_edge(times: &[f64], range: &TofRange) -> Option<f64> {
    let upper = match *range {
        TofRange::Max => times
            .iter()
            .copied()
            .filter(|t| t.is_finite())
            .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t)))),
        TofRange::Percentile { q } => stats::quantile(times, q),
    }?;
    if upper > 0.0 {
        Some(upper)
    } else {
        None
    }
}

/// Counts on a regular nx * ny grid
#[derive(Debug, Clone)]
pub struct Histogram2d {
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    /// counts[ix][iy]
    pub counts: Vec<Vec<u32>>,
}

impl Histogram2d {
    pub fn max_count(&self) -> u32 {
        self.counts
            .iter()
            .flat_map(|col| col.iter().copied())
            .max()
            .unwrap_or(0)
    }

    /// Non-empty cells as ((x0, y0), (x1, y1), count); empty cells are left as background
    pub fn occupied_cells(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64), u32)> + '_ {
        self.counts.iter().enumerate().flat_map(move |(ix, col)| {
            col.iter().enumerate().filter(|(_, c)| **c > 0).map(move |(iy, c)| {
                (
                    (self.x_edges[ix], self.y_edges[iy]),
                    (self.x_edges[ix + 1], self.y_edges[iy + 1]),
                    *c,
                )
            })
        })
    }
}

/// 2D histogram over a square window centred on the data so both axes share one scale.
pub fn histogram_2d(points: &[(f64, f64)], bins: usize) -> Option<Histogram2d> {
    let finite: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if finite.is_empty() || bins == 0 {
        return None;
    }

    let (mut x_min, mut x_max, mut y_min, mut y_max) =
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in &finite {
        x_min = x_min.min(*x);
        x_max = x_max.max(*x);
        y_min = y_min.min(*y);
        y_max = y_max.max(*y);
    }
    let half = ((x_max - x_min).max(y_max - y_min) / 2.0).max(0.5);
    let (cx, cy) = ((x_min + x_max) / 2.0, (y_min + y_max) / 2.0);

    let x_edges = linear_edges(cx - half, cx + half, bins + 1);
    let y_edges = linear_edges(cy - half, cy + half, bins + 1);
    let mut counts = vec![vec![0u32; bins]; bins];
    for (x, y) in &finite {
        if let (Some(ix), Some(iy)) = (bin_index(&x_edges, *x), bin_index(&y_edges, *y)) {
            counts[ix][iy] += 1;
        }
    }

    Some(Histogram2d {
        x_edges,
        y_edges,
        counts,
    })
}
