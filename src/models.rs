use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AnalyticsError;

/// A single recorded grade. Values are expected in `[0, 100]` but the engine
/// only filters non-finite values, it never rejects out-of-range ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeEntry {
    pub subject: String,
    pub value: f64,
    pub recorded_on: NaiveDate,
}

/// One student's observations for a semester, as supplied by the query layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: Uuid,
    pub full_name: String,
    pub semester: String,
    pub grades: Vec<GradeEntry>,
    pub risk_factors: Vec<String>,
}

impl StudentRecord {
    /// Mean of all grade values; NaN when the student has no grades.
    pub fn grade_average(&self) -> f64 {
        if self.grades.is_empty() {
            return f64::NAN;
        }
        let total: f64 = self.grades.iter().map(|grade| grade.value).sum();
        total / self.grades.len() as f64
    }

    pub fn risk_factor_count(&self) -> f64 {
        self.risk_factors.len() as f64
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::GradeAverage => self.grade_average(),
            Metric::RiskFactorCount => self.risk_factor_count(),
        }
    }
}

/// Per-student variables the analyses can be run over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    GradeAverage,
    RiskFactorCount,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::GradeAverage, Metric::RiskFactorCount];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::GradeAverage => "grade-average",
            Metric::RiskFactorCount => "risk-factor-count",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Metric::GradeAverage => "Grade average",
            Metric::RiskFactorCount => "Risk factor count",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = AnalyticsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        Metric::ALL
            .into_iter()
            .find(|metric| metric.as_str() == normalized)
            .ok_or_else(|| AnalyticsError::UnknownMetric(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_grades(values: &[f64]) -> StudentRecord {
        let recorded_on = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        StudentRecord {
            student_id: Uuid::new_v4(),
            full_name: "Avery Lee".to_string(),
            semester: "2026-1".to_string(),
            grades: values
                .iter()
                .map(|value| GradeEntry {
                    subject: "Calculus".to_string(),
                    value: *value,
                    recorded_on,
                })
                .collect(),
            risk_factors: vec!["Family issues".to_string(), "Part-time job".to_string()],
        }
    }

    #[test]
    fn grade_average_is_arithmetic_mean() {
        let record = record_with_grades(&[60.0, 80.0, 100.0]);
        assert_eq!(record.grade_average(), 80.0);
        assert_eq!(record.metric(Metric::RiskFactorCount), 2.0);
    }

    #[test]
    fn grade_average_without_grades_is_nan() {
        let record = record_with_grades(&[]);
        assert!(record.grade_average().is_nan());
    }

    #[test]
    fn metrics_parse_from_cli_names() {
        assert_eq!("grade-average".parse::<Metric>().unwrap(), Metric::GradeAverage);
        assert_eq!("RISK_FACTOR_COUNT".parse::<Metric>().unwrap(), Metric::RiskFactorCount);
        assert!(matches!(
            "attendance".parse::<Metric>(),
            Err(AnalyticsError::UnknownMetric(name)) if name == "attendance"
        ));
    }
}
