use serde::Serialize;

use crate::classify::{aggregate_categories, CategoryBucket};
use crate::correlation::{analyze, CorrelationResult, ScatterInput};
use crate::error::{AnalyticsError, Result};
use crate::histogram::{build_histogram, HistogramBin, DEFAULT_BINS};
use crate::models::{Metric, StudentRecord};
use crate::stats::DescriptiveStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisRequest {
    Histogram { metric: Metric, requested_bins: usize },
    Scatter { x: Metric, y: Metric },
    Ishikawa,
}

impl AnalysisRequest {
    pub fn histogram(metric: Metric, requested_bins: Option<usize>) -> Result<Self> {
        let requested_bins = requested_bins.unwrap_or(DEFAULT_BINS);
        if requested_bins == 0 {
            return Err(AnalyticsError::InvalidBinCount(requested_bins));
        }
        Ok(Self::Histogram {
            metric,
            requested_bins,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramResult {
    pub semester: String,
    pub metric: Metric,
    pub sample_size: usize,
    pub dropped: usize,
    pub stats: DescriptiveStats,
    pub bins: Vec<HistogramBin>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterResult {
    pub semester: String,
    pub x_metric: Metric,
    pub y_metric: Metric,
    pub sample_size: usize,
    pub dropped: usize,
    pub correlation: CorrelationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IshikawaResult {
    pub semester: String,
    pub total_students: usize,
    pub total_factors: usize,
    pub categories: Vec<CategoryBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnalysisResult {
    Histogram(HistogramResult),
    Scatter(ScatterResult),
    Ishikawa(IshikawaResult),
    Empty { semester: String, reason: String },
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, AnalysisResult::Empty { .. })
    }
}

/// Runs `request` over a semester's records.
///
/// An empty batch yields [`AnalysisResult::Empty`] rather than a zeroed analysis.
pub fn assemble(
    semester: &str,
    records: &[StudentRecord],
    request: AnalysisRequest,
) -> AnalysisResult {
    if records.is_empty() {
        return AnalysisResult::Empty {
            semester: semester.to_string(),
            reason: format!("No student records found for semester {semester}."),
        };
    }

    match request {
        AnalysisRequest::Histogram {
            metric,
            requested_bins,
        } => AnalysisResult::Histogram(histogram(semester, records, metric, requested_bins)),
        AnalysisRequest::Scatter { x, y } => {
            AnalysisResult::Scatter(scatter(semester, records, x, y))
        }
        AnalysisRequest::Ishikawa => AnalysisResult::Ishikawa(ishikawa(semester, records)),
    }
}

fn histogram(
    semester: &str,
    records: &[StudentRecord],
    metric: Metric,
    requested_bins: usize,
) -> HistogramResult {
    let values: Vec<f64> = records.iter().map(|record| record.metric(metric)).collect();
    let sample_size = values.iter().filter(|value| value.is_finite()).count();

    HistogramResult {
        semester: semester.to_string(),
        metric,
        sample_size,
        dropped: values.len() - sample_size,
        stats: DescriptiveStats::compute(&values),
        bins: build_histogram(&values, requested_bins),
    }
}

fn scatter(semester: &str, records: &[StudentRecord], x: Metric, y: Metric) -> ScatterResult {
    let pairs: Vec<ScatterInput> = records
        .iter()
        .map(|record| ScatterInput {
            x: record.metric(x),
            y: record.metric(y),
            label: record.full_name.clone(),
            id: record.student_id,
        })
        .collect();
    let correlation = analyze(&pairs);

    ScatterResult {
        semester: semester.to_string(),
        x_metric: x,
        y_metric: y,
        sample_size: correlation.points.len(),
        dropped: pairs.len() - correlation.points.len(),
        correlation,
    }
}

fn ishikawa(semester: &str, records: &[StudentRecord]) -> IshikawaResult {
    let categories = aggregate_categories(records);

    IshikawaResult {
        semester: semester.to_string(),
        total_students: records.len(),
        total_factors: categories.iter().map(|bucket| bucket.count).sum(),
        categories,
    }
}
