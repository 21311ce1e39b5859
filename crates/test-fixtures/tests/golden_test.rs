use chrono::NaiveDate;
use stride_core::models::{LoadMetric, NewConfiguration};
use stride_decay::{canonical_divergence, chronic_average_decayed};

#[test]
fn divergence_matches_golden_literals() {
    let set = test_fixtures::divergence_literals();
    for case in &set.cases {
        let value = canonical_divergence(case.external, case.internal);
        assert!(
            (value - case.expected).abs() <= set.tolerance,
            "divergence({}, {}) = {value}, expected {}",
            case.external,
            case.internal,
            case.expected
        );
    }
}

#[test]
fn decay_weighted_mean_matches_golden_cases() {
    let set = test_fixtures::decay_cases();
    let reference = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    for case in &set.cases {
        let records = case.load_records(9, reference);
        let chronic = chronic_average_decayed(
            &records,
            reference,
            case.chronic_period_days,
            case.decay_rate,
            LoadMetric::Load,
        );
        assert!(
            (chronic - case.expected).abs() <= set.tolerance,
            "{}: got {chronic}, expected {}",
            case.name,
            case.expected
        );
    }
}

#[test]
fn configuration_bounds_match_golden_cases() {
    for case in test_fixtures::configuration_bounds().cases {
        let candidate = NewConfiguration {
            name: "bounds".to_string(),
            chronic_period_days: case.chronic_period_days,
            decay_rate: case.decay_rate,
            notes: None,
            created_by: None,
            supersedes: None,
        };
        assert_eq!(
            candidate.validate().is_ok(),
            case.valid,
            "days={} rate={}",
            case.chronic_period_days,
            case.decay_rate
        );
    }
}
