use serde::Serialize;

use crate::stats::{finite_values, min_max};

pub const DEFAULT_BINS: usize = 10;

/// Bin count used when the first pass lands every value in a single bin.
const REFINED_BINS: usize = 5;

/// The first pass plus at most one refinement.
const MAX_ATTEMPTS: usize = 2;

/// One contiguous range of the sample and the number of values that fell into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub range_label: String,
    pub low: f64,
    pub high: f64,
    pub frequency: usize,
}

/// Number of bins actually used for a sample of `sample_size` finite values.
///
/// Small samples override the requested count: fewer than 10 values get at most
/// 5 bins (never more bins than values) and fewer than 30 get 7.
pub fn bin_count(sample_size: usize, requested_bins: usize) -> usize {
    if sample_size < 10 {
        REFINED_BINS.min(sample_size)
    } else if sample_size < 30 {
        7
    } else {
        requested_bins.max(1)
    }
}

/// Partitions the finite values of `values` into contiguous bins covering `[min, max]`.
///
/// Every finite value is counted in exactly one bin. A sample whose values are all
/// equal produces a single bin labelled with that value.
pub fn build_histogram(values: &[f64], requested_bins: usize) -> Vec<HistogramBin> {
    let finite = finite_values(values);
    let Some((min, max)) = min_max(&finite) else {
        return Vec::new();
    };

    if min == max {
        return vec![HistogramBin {
            range_label: format!("{min:.1}"),
            low: min,
            high: max,
            frequency: finite.len(),
        }];
    }

    let mut bins = bin_count(finite.len(), requested_bins);
    let mut attempt = 1;
    loop {
        let histogram = assign(&finite, min, max, bins);

        let populated = histogram.iter().filter(|bin| bin.frequency > 0).count();
        if populated != 1 || finite.len() <= 1 || attempt == MAX_ATTEMPTS {
            return histogram;
        }
        tracing::debug!(
            bins,
            retry_bins = REFINED_BINS,
            "all values landed in one bin, rebuilding histogram"
        );
        bins = REFINED_BINS;
        attempt += 1;
    }
}

fn assign(values: &[f64], min: f64, max: f64, bins: usize) -> Vec<HistogramBin> {
    let width = (max - min) / bins as f64;
    let mut frequencies = vec![0usize; bins];

    for &value in values {
        let index = if value == max {
            bins - 1
        } else {
            let raw = ((value - min) / width).floor();
            if raw <= 0.0 {
                0
            } else {
                (raw as usize).min(bins - 1)
            }
        };
        frequencies[index] += 1;
    }

    frequencies
        .into_iter()
        .enumerate()
        .map(|(index, frequency)| {
            let low = min + width * index as f64;
            let high = if index == bins - 1 { max } else { low + width };
            HistogramBin {
                range_label: format!("{low:.1} - {high:.1}"),
                low,
                high,
                frequency,
            }
        })
        .collect()
}
