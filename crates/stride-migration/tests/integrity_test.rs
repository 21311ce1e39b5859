use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use stride_core::config::MigrationConfig;
use stride_core::errors::{MigrationError, StrideError};
use stride_core::models::*;
use stride_core::traits::{IConfigurationStorage, IMigrationStorage};
use stride_migration::integrity::{BatchCounts, BatchProposal};
use stride_migration::IntegrityManager;
use stride_storage::StorageEngine;

const USER: UserId = 5;

fn day(i: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, 1).unwrap() + Duration::days(i)
}

fn setup() -> (Arc<StorageEngine>, IntegrityManager, MigrationJob) {
    setup_with(&MigrationConfig::default())
}

/// Storage with one configuration and one running job to hang checkpoints on.
fn setup_with(config: &MigrationConfig) -> (Arc<StorageEngine>, IntegrityManager, MigrationJob) {
    let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
    let configuration_id = storage
        .insert_configuration(&NewConfiguration {
            name: "integrity".to_string(),
            chronic_period_days: 28,
            decay_rate: 0.05,
            notes: None,
            created_by: None,
            supersedes: None,
        })
        .unwrap();
    let mut job = MigrationJob::new(USER, configuration_id, 10, 3);
    job.transition(MigrationStatus::Running).unwrap();
    storage.insert_job(&job).unwrap();
    let manager = IntegrityManager::new(storage.clone(), config);
    (storage, manager, job)
}

fn snapshot(n: i64) -> Vec<LoadRecord> {
    (0..n)
        .map(|i| {
            let mut record = LoadRecord::new(USER, day(i), 12.5 + i as f64).with_stress(7.0);
            if i == 1 {
                record.enhanced = Some(EnhancedFields {
                    chronic_load: 14.2,
                    chronic_stress: Some(6.9),
                    acwr_ratio: 0.88,
                    stress_ratio: Some(1.01),
                    divergence: Some(-0.137),
                    calculation_method: MethodKind::Fallback,
                    configuration_id: None,
                });
            }
            record
        })
        .collect()
}

fn result(date: NaiveDate, ratio: f64) -> CalculationResult {
    CalculationResult {
        user_id: USER,
        reference_date: date,
        acute: 10.0,
        chronic: 10.0 / ratio.max(f64::MIN_POSITIVE),
        ratio,
        acute_stress: Some(5.0),
        chronic_stress: Some(5.0),
        stress_ratio: Some(1.0),
        divergence: Some(0.0),
        method: CalculationMethod::Standard,
    }
}

fn proposal<'a>(
    inputs: &'a [LoadRecord],
    updates: &'a [CalculationResult],
) -> BatchProposal<'a> {
    BatchProposal {
        migration_id: "m-1",
        user_id: USER,
        batch_index: 0,
        inputs,
        updates,
        counts: BatchCounts {
            expected_len: inputs.len(),
            expected_remaining: inputs.len(),
            found_remaining: inputs.len(),
        },
        sample_seed: "cp-1",
        recompute: None,
    }
}

#[test]
fn checkpoint_is_persisted_prepared_with_a_restore_payload() {
    let (storage, manager, job) = setup();
    let records = snapshot(3);
    let checkpoint = manager.checkpoint(&job.migration_id, USER, 0, &records).unwrap();

    assert_eq!(checkpoint.state, CheckpointState::Prepared);
    assert_eq!(checkpoint.data_snapshot, records);
    assert_eq!(checkpoint.rollback_payload.len(), 3);
    assert_eq!(checkpoint.rollback_payload[1].fields, records[1].enhanced);
    assert!(checkpoint.rollback_payload[0].fields.is_none());

    let stored = storage.get_checkpoint(&checkpoint.checkpoint_id).unwrap().unwrap();
    assert_eq!(stored.checksum, checkpoint.checksum);
    assert!(manager.verify_checksum(&stored));
    assert_eq!(manager.prepared(&job.migration_id).unwrap().len(), 1);
}

#[test]
fn any_content_change_breaks_the_checksum() {
    let (_, manager, job) = setup();
    let checkpoint = manager.checkpoint(&job.migration_id, USER, 0, &snapshot(4)).unwrap();

    let mut altered_payload = checkpoint.clone();
    altered_payload.rollback_payload[1].fields = None;
    assert!(!manager.verify_checksum(&altered_payload));

    let mut altered_snapshot = checkpoint.clone();
    altered_snapshot.data_snapshot[3].acute_stress = Some(7.000001);
    assert!(!manager.verify_checksum(&altered_snapshot));

    let mut moved = checkpoint.clone();
    moved.batch_index = 1;
    let err = manager.verify_or_err(&moved).unwrap_err();
    match err {
        StrideError::Migration(MigrationError::ChecksumMismatch { expected, actual, .. }) => {
            assert_eq!(expected, checkpoint.checksum);
            assert_ne!(actual, expected);
        }
        other => panic!("expected checksum mismatch, got {other}"),
    }

    // State changes do not affect the digest.
    let mut committed = checkpoint.clone();
    committed.state = CheckpointState::Committed;
    assert!(manager.verify_checksum(&committed));
}

#[test]
fn basic_validation_rejects_unusable_numbers() {
    let (_, manager, _) = setup();
    let inputs = snapshot(4);
    let mut updates: Vec<CalculationResult> = inputs.iter().map(|r| result(r.date, 1.0)).collect();
    updates[0].ratio = f64::NAN;
    updates[1].stress_ratio = Some(-0.5);
    updates[2].chronic_stress = None;
    updates[3].divergence = None;

    let outcome = manager.validate(&proposal(&inputs, &updates), ValidationLevel::Basic);
    assert!(!outcome.passed);
    assert_eq!(outcome.checked, 4);
    let joined = outcome.errors.join("\n");
    assert!(joined.contains("ratio is not finite"));
    assert!(joined.contains("stress_ratio is negative"));
    assert!(joined.contains("stress fields partially present"));
    assert!(joined.contains("divergence must accompany stress_ratio"));
    assert!(outcome.failure_reason().contains("more"));
}

#[test]
fn negative_divergence_and_fallbacks_are_not_errors() {
    let (_, manager, _) = setup();
    let inputs = snapshot(2);
    let mut updates: Vec<CalculationResult> = inputs.iter().map(|r| result(r.date, 0.8)).collect();
    updates[0].divergence = Some(-0.4);
    updates[1].method = CalculationMethod::Fallback(FallbackReason::CalculationFailure);

    let outcome = manager.validate(&proposal(&inputs, &updates), ValidationLevel::Standard);
    assert!(outcome.passed, "{:?}", outcome.errors);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("fallback:calculation_failure"));
}

#[test]
fn standard_validation_checks_count_and_dates() {
    let (_, manager, _) = setup();
    let inputs = snapshot(3);
    let short: Vec<CalculationResult> = inputs[..2].iter().map(|r| result(r.date, 1.0)).collect();

    assert!(manager.validate(&proposal(&inputs, &short), ValidationLevel::Basic).passed);
    let outcome = manager.validate(&proposal(&inputs, &short), ValidationLevel::Standard);
    assert!(!outcome.passed);
    assert!(outcome.errors[0].contains("2 results for 3 records"));

    let shifted: Vec<CalculationResult> = inputs.iter().map(|r| result(r.date + Duration::days(10), 1.0)).collect();
    let outcome = manager.validate(&proposal(&inputs, &shifted), ValidationLevel::Standard);
    assert_eq!(outcome.errors.len(), 3);
}

#[test]
fn standard_validation_checks_counts_against_the_job() {
    let (_, manager, _) = setup();
    let inputs = snapshot(4);
    let updates: Vec<CalculationResult> = inputs.iter().map(|r| result(r.date, 1.0)).collect();

    // The store lost a record after the job started.
    let mut shrunk = proposal(&inputs, &updates);
    shrunk.counts = BatchCounts {
        expected_len: 5,
        expected_remaining: 5,
        found_remaining: 4,
    };
    assert!(manager.validate(&shrunk, ValidationLevel::Basic).passed);
    let outcome = manager.validate(&shrunk, ValidationLevel::Standard);
    assert!(!outcome.passed);
    assert!(outcome.errors[0].contains("4 unmigrated records in scope, expected 5"));
    assert!(outcome.errors[1].contains("batch 0 has 4 records, expected 5"));

    // A record appeared inside the range still to be migrated.
    let mut grown = proposal(&inputs, &updates);
    grown.counts = BatchCounts {
        expected_len: 4,
        expected_remaining: 9,
        found_remaining: 10,
    };
    let outcome = manager.validate(&grown, ValidationLevel::Standard);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("10 unmigrated records in scope, expected 9"));
}

#[test]
fn strict_validation_recomputes_a_sample() {
    let config = MigrationConfig {
        strict_sample_size: 50,
        ..MigrationConfig::default()
    };
    let (_, manager, _) = setup_with(&config);
    let inputs = snapshot(6);
    let updates: Vec<CalculationResult> = inputs.iter().map(|r| result(r.date, 1.25)).collect();

    let faithful: &dyn Fn(NaiveDate) -> CalculationResult = &|date| result(date, 1.25);
    let mut strict = proposal(&inputs, &updates);
    strict.recompute = Some(faithful);
    assert!(manager.validate(&strict, ValidationLevel::Strict).passed);

    let drifted: &dyn Fn(NaiveDate) -> CalculationResult = &|date| {
        if date == day(4) {
            result(date, 1.2501)
        } else {
            result(date, 1.25)
        }
    };
    strict.recompute = Some(drifted);
    let outcome = manager.validate(&strict, ValidationLevel::Strict);
    assert!(!outcome.passed);
    assert!(outcome.errors.iter().all(|e| e.starts_with("2024-02-05")));

    let outcome = manager.validate(&proposal(&inputs, &updates), ValidationLevel::Strict);
    assert!(!outcome.passed);
    assert!(outcome.errors[0].contains("independent recomputation"));
}

#[test]
fn archive_requires_a_terminal_job() {
    let (storage, manager, mut job) = setup();
    let checkpoint = manager.checkpoint(&job.migration_id, USER, 0, &snapshot(3)).unwrap();

    let err = manager.archive(&job.migration_id).unwrap_err();
    assert_eq!(err.code(), "INVALID_TRANSITION");

    job.current_batch = 1;
    job.processed_count = 3;
    manager.commit(&checkpoint, &job).unwrap();
    job.transition(MigrationStatus::Completed).unwrap();
    storage.update_job(&job).unwrap();

    assert_eq!(manager.archive(&job.migration_id).unwrap(), 1);
    let stored = manager.checkpoints(&job.migration_id).unwrap();
    assert_eq!(stored[0].state, CheckpointState::Archived);
    assert!(manager.verify_checksum(&stored[0]));

    let err = manager.archive("unknown").unwrap_err();
    assert_eq!(err.code(), "MIGRATION_NOT_FOUND");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Checksums survive the storage round-trip for arbitrary finite values.
    #[test]
    fn stored_checkpoints_always_verify(
        loads in prop::collection::vec(0.0f64..1.0e6, 1..20),
        ratio in 0.0f64..5.0,
    ) {
        let (storage, manager, job) = setup();
        let records: Vec<LoadRecord> = loads
            .iter()
            .enumerate()
            .map(|(i, load)| {
                let mut record = LoadRecord::new(USER, day(i as i64), *load);
                record.enhanced = Some(EnhancedFields {
                    chronic_load: load / 3.0,
                    chronic_stress: None,
                    acwr_ratio: ratio,
                    stress_ratio: None,
                    divergence: None,
                    calculation_method: MethodKind::Enhanced,
                    configuration_id: Some(1),
                });
                record
            })
            .collect();
        let checkpoint = manager.checkpoint(&job.migration_id, USER, 0, &records).unwrap();
        let stored = storage.get_checkpoint(&checkpoint.checkpoint_id).unwrap().unwrap();
        prop_assert_eq!(&stored.data_snapshot, &records);
        prop_assert!(manager.verify_checksum(&stored));
    }
}
