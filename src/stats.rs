use std::collections::HashMap;

use serde::Serialize;

/// Population statistics of a sample. All fields are zero for an empty sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl DescriptiveStats {
    /// Computes statistics over the finite values of `values`.
    ///
    /// The standard deviation uses the population formula (divides by `N`).
    /// The mode is the first value, in order of first appearance, whose
    /// frequency is strictly greater than every value seen before it.
    ///
    /// ```
    /// # use cohort_risk_analytics::stats::DescriptiveStats;
    /// let stats = DescriptiveStats::compute(&[70.0, 70.0, 80.0, 90.0]);
    /// assert_eq!(stats.mean, 77.5);
    /// assert_eq!(stats.median, 75.0);
    /// assert_eq!(stats.mode, 70.0);
    /// assert_eq!(stats.std_dev, 8.29);
    /// ```
    pub fn compute(values: &[f64]) -> Self {
        let finite = finite_values(values);
        if finite.is_empty() {
            return Self::default();
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let mode = first_mode(&finite);

        let mut sorted = finite;
        sorted.sort_by(f64::total_cmp);
        let len = sorted.len();
        let median = if len % 2 == 0 {
            (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
        } else {
            sorted[len / 2]
        };

        Self {
            mean: round_to(mean, 2),
            median: round_to(median, 2),
            mode: round_to(mode, 2),
            std_dev: round_to(variance.sqrt(), 2),
            min: round_to(sorted[0], 2),
            max: round_to(sorted[len - 1], 2),
        }
    }
}

/// Keeps only finite values, preserving input order.
pub fn finite_values(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Smallest and largest finite value, or `None` for an empty sample.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // avoid reporting -0.0
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn first_mode(values: &[f64]) -> f64 {
    let mut order: Vec<(f64, usize)> = Vec::new();
    let mut index_of: HashMap<u64, usize> = HashMap::new();

    for &value in values {
        // +0.0 and -0.0 count as the same value
        let key = if value == 0.0 { 0f64.to_bits() } else { value.to_bits() };
        match index_of.get(&key) {
            Some(&index) => order[index].1 += 1,
            None => {
                index_of.insert(key, order.len());
                order.push((value, 1));
            }
        }
    }

    let mut mode = 0.0;
    let mut best = 0;
    for (value, count) in order {
        if count > best {
            best = count;
            mode = value;
        }
    }
    mode
}
