use thiserror::Error;

/// Errors raised while building an analysis request. The analyses themselves never fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("unknown metric `{0}` (expected grade-average or risk-factor-count)")]
    UnknownMetric(String),

    #[error("histogram needs at least one bin, got {0}")]
    InvalidBinCount(usize),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
