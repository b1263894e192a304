use chrono::NaiveDate;
use cohort_risk_analytics::classify::{aggregate_categories, classify, RiskCategory};
use cohort_risk_analytics::correlation::{analyze, ScatterInput};
use cohort_risk_analytics::histogram::{build_histogram, DEFAULT_BINS};
use cohort_risk_analytics::stats::DescriptiveStats;
use cohort_risk_analytics::{
    assemble, AnalysisRequest, AnalysisResult, GradeEntry, Metric, StudentRecord,
};
use proptest::prelude::*;
use uuid::Uuid;

fn sample_value() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => 0.0..100.0f64,
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
    ]
}

fn record(grades: Vec<f64>, factors: Vec<String>) -> StudentRecord {
    let recorded_on = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
    StudentRecord {
        student_id: Uuid::from_u128(grades.len() as u128 * 31 + factors.len() as u128),
        full_name: "Student".to_string(),
        semester: "2026-1".to_string(),
        grades: grades
            .into_iter()
            .map(|value| GradeEntry {
                subject: "Algebra".to_string(),
                value,
                recorded_on,
            })
            .collect(),
        risk_factors: factors,
    }
}

proptest! {
    #[test]
    fn histogram_frequencies_sum_to_finite_count(
        values in prop::collection::vec(sample_value(), 0..120),
        requested in 1usize..20,
    ) {
        let bins = build_histogram(&values, requested);
        let finite = values.iter().filter(|v| v.is_finite()).count();
        prop_assert_eq!(bins.iter().map(|bin| bin.frequency).sum::<usize>(), finite);
        prop_assert_eq!(bins.is_empty(), finite == 0);
    }

    #[test]
    fn equal_values_make_a_single_bin(value in 0.0..100.0f64, count in 1usize..60) {
        let bins = build_histogram(&vec![value; count], DEFAULT_BINS);
        prop_assert_eq!(bins.len(), 1);
        prop_assert_eq!(bins[0].frequency, count);
    }

    #[test]
    fn stats_stay_within_sample_range(values in prop::collection::vec(0.0..100.0f64, 1..80)) {
        let stats = DescriptiveStats::compute(&values);
        prop_assert!(stats.min <= stats.median && stats.median <= stats.max);
        prop_assert!(stats.min <= stats.mean + 0.01 && stats.mean <= stats.max + 0.01);
        prop_assert!(stats.std_dev >= 0.0);
        prop_assert!(values.iter().any(|v| (v - stats.mode).abs() <= 0.006));
    }

    #[test]
    fn correlation_is_bounded_and_repeatable(
        pairs in prop::collection::vec((sample_value(), -10.0..100.0f64), 0..60),
    ) {
        let inputs: Vec<ScatterInput> = pairs
            .iter()
            .enumerate()
            .map(|(index, (x, y))| ScatterInput {
                x: *x,
                y: *y,
                label: format!("student {index}"),
                id: Uuid::from_u128(index as u128),
            })
            .collect();
        let first = analyze(&inputs);
        let second = analyze(&inputs);
        prop_assert!((-1.0..=1.0).contains(&first.r));
        prop_assert!(first.points.iter().all(|p| p.x >= 0.0 && p.y >= 0.0));
        prop_assert_eq!(first.r.to_bits(), second.r.to_bits());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn classification_is_total_and_case_insensitive(label in "[A-Za-z ]{0,40}") {
        let category = classify(&label);
        prop_assert!(RiskCategory::ALL.contains(&category));
        prop_assert_eq!(category, classify(&label.to_lowercase()));
    }

    #[test]
    fn category_counts_match_distinct_labels(
        factors in prop::collection::vec(prop::collection::vec("[a-z ]{1,12}", 0..5), 0..10),
    ) {
        let records: Vec<StudentRecord> = factors
            .iter()
            .cloned()
            .map(|labels| record(vec![70.0], labels))
            .collect();
        let buckets = aggregate_categories(&records);
        let distinct: std::collections::BTreeSet<&str> = factors
            .iter()
            .flatten()
            .map(|label| label.trim())
            .filter(|label| !label.is_empty())
            .collect();
        prop_assert_eq!(buckets.iter().map(|bucket| bucket.count).sum::<usize>(), distinct.len());
    }
}

#[test]
fn assembling_twice_gives_identical_results() {
    let records = vec![
        record(vec![88.0, 92.0], vec![]),
        record(vec![55.0], vec!["Part-time job".to_string()]),
        record(
            vec![61.0, 64.0, 59.0],
            vec!["Family issues".to_string(), "Salud mental".to_string()],
        ),
    ];
    let requests = [
        AnalysisRequest::histogram(Metric::GradeAverage, None).unwrap(),
        AnalysisRequest::Scatter {
            x: Metric::GradeAverage,
            y: Metric::RiskFactorCount,
        },
        AnalysisRequest::Ishikawa,
    ];
    for request in requests {
        assert_eq!(
            assemble("2026-1", &records, request),
            assemble("2026-1", &records, request)
        );
    }
}

#[test]
fn empty_batch_never_panics() {
    for metric in Metric::ALL {
        let request = AnalysisRequest::histogram(metric, Some(3)).unwrap();
        assert!(matches!(
            assemble("2026-1", &[], request),
            AnalysisResult::Empty { .. }
        ));
    }
}
