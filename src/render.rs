use std::fmt::Write;

use chrono::NaiveDate;
use cohort_risk_analytics::correlation::{interpret, Direction, Strength};
use cohort_risk_analytics::report::{HistogramResult, IshikawaResult, ScatterResult};
use cohort_risk_analytics::{assemble, AnalysisRequest, AnalysisResult, Metric, StudentRecord};

const BAR_WIDTH: usize = 30;

pub fn render_result(result: &AnalysisResult) -> String {
    let mut output = String::new();
    match result {
        AnalysisResult::Histogram(histogram) => write_histogram(&mut output, histogram),
        AnalysisResult::Scatter(scatter) => write_scatter(&mut output, scatter),
        AnalysisResult::Ishikawa(ishikawa) => write_ishikawa(&mut output, ishikawa),
        AnalysisResult::Empty { reason, .. } => {
            let _ = writeln!(output, "{reason}");
        }
    }
    output
}

pub fn build_report(
    semester: &str,
    generated_on: NaiveDate,
    records: &[StudentRecord],
    requested_bins: usize,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Academic Risk Report");
    let _ = writeln!(
        output,
        "Semester {} ({} students), generated {}",
        semester,
        records.len(),
        generated_on
    );

    let requests = [
        AnalysisRequest::Histogram {
            metric: Metric::GradeAverage,
            requested_bins,
        },
        AnalysisRequest::Scatter {
            x: Metric::GradeAverage,
            y: Metric::RiskFactorCount,
        },
        AnalysisRequest::Ishikawa,
    ];

    for request in requests {
        let result = assemble(semester, records, request);
        let _ = writeln!(output);
        let _ = write!(output, "{}", render_result(&result));
        if result.is_empty() {
            break;
        }
    }

    output
}

fn write_histogram(output: &mut String, result: &HistogramResult) {
    let stats = &result.stats;
    let _ = writeln!(output, "## Distribution: {}", result.metric.display_name());
    let _ = writeln!(
        output,
        "{} students analyzed ({} without data)",
        result.sample_size, result.dropped
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "- mean {:.2}, median {:.2}, mode {:.2}",
        stats.mean, stats.median, stats.mode
    );
    let _ = writeln!(
        output,
        "- std dev {:.2}, range {:.2} to {:.2}",
        stats.std_dev, stats.min, stats.max
    );
    let _ = writeln!(output);

    let peak = result.bins.iter().map(|bin| bin.frequency).max().unwrap_or(0);
    for bin in &result.bins {
        let bar_len = if peak == 0 {
            0
        } else {
            (bin.frequency * BAR_WIDTH).div_ceil(peak)
        };
        let _ = writeln!(
            output,
            "- {:>15} | {} {}",
            bin.range_label,
            "#".repeat(bar_len),
            bin.frequency
        );
    }
}

fn write_scatter(output: &mut String, result: &ScatterResult) {
    let _ = writeln!(
        output,
        "## Correlation: {} vs {}",
        result.x_metric.display_name(),
        result.y_metric.display_name()
    );
    let (strength, direction) = interpret(result.correlation.r);
    let summary = match (strength, direction) {
        (Strength::None, _) | (_, Direction::Flat) => "no linear relationship".to_string(),
        (strength, direction) => format!(
            "{} {} relationship",
            strength.as_str(),
            direction.as_str()
        ),
    };
    let _ = writeln!(
        output,
        "r = {:.4} across {} students ({summary}, {} excluded)",
        result.correlation.r, result.sample_size, result.dropped
    );
    let _ = writeln!(output);

    if result.correlation.points.is_empty() {
        let _ = writeln!(output, "No students with valid values for both variables.");
        return;
    }
    for point in &result.correlation.points {
        let _ = writeln!(output, "- {}: ({:.2}, {:.2})", point.label, point.x, point.y);
    }
}

fn write_ishikawa(output: &mut String, result: &IshikawaResult) {
    let _ = writeln!(output, "## Root Causes");
    let _ = writeln!(
        output,
        "{} distinct risk factors across {} students",
        result.total_factors, result.total_students
    );

    for bucket in &result.categories {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {} ({})", bucket.label, bucket.count);
        if bucket.members.is_empty() {
            let _ = writeln!(output, "No factors recorded.");
        }
        for member in &bucket.members {
            let _ = writeln!(output, "- {member}");
        }
    }
}
