//! Academic risk analytics: descriptive statistics, histograms, correlation
//! and root-cause classification over a semester of student records.
//!
//! Every analysis is a pure function of its input batch.

pub mod classify;
pub mod correlation;
pub mod error;
pub mod histogram;
pub mod models;
pub mod report;
pub mod stats;

pub use error::AnalyticsError;
pub use models::{GradeEntry, Metric, StudentRecord};
pub use report::{assemble, AnalysisRequest, AnalysisResult};
