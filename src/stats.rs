// stats.rs
// Descriptive statistics and counting-error helpers

use serde::Serialize;

/// mean / std / min / max of one column, as a dataframe `describe()` would give
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0 for a single value
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnSummary {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0).max(1.0);
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(mn, mx), &v| {
                (mn.min(v), mx.max(v))
            });
        Some(Self {
            count: values.len(),
            mean,
            std: variance.sqrt(),
            min,
            max,
        })
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Linear-interpolated quantile (`q` in [0, 1]) of unsorted values.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Poisson relative error of a count: 1/sqrt(N). `None` for N = 0.
pub fn relative_error(count: usize) -> Option<f64> {
    if count == 0 {
        None
    } else {
        Some(1.0 / (count as f64).sqrt())
    }
}

/// Count needed for a target relative error: (1/e)^2
pub fn required_count(target_relative_error: f64) -> f64 {
    (1.0 / target_relative_error).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_matches_hand_computation() {
        let s = ColumnSummary::from_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(s.count, 4);
        assert!((s.mean - 2.5).abs() < 1e-12);
        // sample variance = 5/3
        assert!((s.std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
    }

    #[test]
    fn single_value_has_zero_std() {
        let s = ColumnSummary::from_values(&[7.0]).unwrap();
        assert_eq!(s.std, 0.0);
        assert!(ColumnSummary::from_values(&[]).is_none());
    }

    #[test]
    fn quantile_interpolates() {
        let v: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        assert_eq!(quantile(&v, 0.99), Some(99.0));
        assert_eq!(quantile(&[1.0, 3.0], 0.5), Some(2.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn hundred_counts_give_ten_percent() {
        assert!((relative_error(100).unwrap() - 0.1).abs() < 1e-12);
        assert!((required_count(0.01) - 10_000.0).abs() < 1e-6);
        assert!((required_count(0.001) - 1_000_000.0).abs() < 1e-3);
        assert_eq!(relative_error(0), None);
    }
}
