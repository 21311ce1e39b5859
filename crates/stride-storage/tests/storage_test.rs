//! Storage engine tests: schema, configuration and assignment persistence,
//! load record write-back, job uniqueness, and checkpoint two-phase commit.

use chrono::{Duration, NaiveDate, Utc};
use stride_core::errors::{MigrationError, StrideError};
use stride_core::models::*;
use stride_core::traits::{IActivityLoadStore, IConfigurationStorage, IMigrationStorage};
use stride_storage::migrations::LATEST_VERSION;
use stride_storage::StorageEngine;

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + Duration::days(offset)
}

fn new_config(name: &str) -> NewConfiguration {
    NewConfiguration {
        name: name.to_string(),
        chronic_period_days: 42,
        decay_rate: 0.07,
        notes: Some("endurance block".to_string()),
        created_by: Some(900),
        supersedes: None,
    }
}

fn enhanced(acwr: f64) -> EnhancedFields {
    EnhancedFields {
        chronic_load: 41.123456789012345,
        chronic_stress: Some(12.5),
        acwr_ratio: acwr,
        stress_ratio: Some(0.1 + 0.2),
        divergence: Some(-0.037),
        calculation_method: MethodKind::Enhanced,
        configuration_id: Some(1),
    }
}

fn seeded(user_id: UserId, days: i64) -> StorageEngine {
    let engine = StorageEngine::open_in_memory().unwrap();
    let records: Vec<LoadRecord> = (0..days)
        .map(|i| LoadRecord::new(user_id, day(i), 10.0 + i as f64).with_stress(5.0))
        .collect();
    engine.upsert_records(&records).unwrap();
    engine
}

// ── Schema ─────────────────────────────────────────────────────────────

#[test]
fn migrations_reach_latest_version() {
    let engine = StorageEngine::open_in_memory().unwrap();
    assert_eq!(engine.schema_version().unwrap(), LATEST_VERSION);
    engine.integrity_check().unwrap();
}

#[test]
fn file_backed_engine_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stride.db");
    let id = {
        let engine = StorageEngine::open(&path).unwrap();
        engine.upsert_records(&[LoadRecord::new(3, day(0), 22.0)]).unwrap();
        engine.insert_configuration(&new_config("persisted")).unwrap()
    };

    let engine = StorageEngine::open(&path).unwrap();
    assert_eq!(engine.schema_version().unwrap(), LATEST_VERSION);
    assert_eq!(engine.get_configuration(id).unwrap().unwrap().name, "persisted");
    assert_eq!(engine.read_records(3, DateRange::all()).unwrap().len(), 1);
    assert_eq!(
        stride_storage::pool::pragmas::journal_mode(&rusqlite::Connection::open(&path).unwrap()).unwrap(),
        "wal"
    );
}

// ── Configurations ─────────────────────────────────────────────────────

#[test]
fn configuration_roundtrips_and_deactivates() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let id = engine.insert_configuration(&new_config("base")).unwrap();

    let stored = engine.get_configuration(id).unwrap().unwrap();
    assert_eq!(stored.chronic_period_days, 42);
    assert_eq!(stored.decay_rate, 0.07);
    assert!(stored.is_active);
    assert_eq!(stored.created_by, Some(900));

    engine.set_configuration_active(id, false).unwrap();
    assert!(engine.list_configurations(false).unwrap().is_empty());
    assert_eq!(engine.list_configurations(true).unwrap().len(), 1);
    assert!(!engine.get_configuration(id).unwrap().unwrap().is_active);
}

#[test]
fn deactivating_unknown_configuration_is_not_found() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let err = engine.set_configuration_active(77, false).unwrap_err();
    assert_eq!(err.code(), "CONFIGURATION_NOT_FOUND");
}

#[test]
fn schema_rejects_out_of_range_configuration() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let mut bad = new_config("bad");
    bad.chronic_period_days = 91;
    assert!(engine.insert_configuration(&bad).is_err());
}

// ── Assignments ────────────────────────────────────────────────────────

#[test]
fn assignment_history_is_newest_first_and_filterable() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let a = engine.insert_configuration(&new_config("a")).unwrap();
    let b = engine.insert_configuration(&new_config("b")).unwrap();

    for (user, config, action, admin) in [
        (1, a, AssignmentAction::Assign, 10),
        (2, a, AssignmentAction::Assign, 11),
        (1, b, AssignmentAction::Assign, 10),
        (1, b, AssignmentAction::Unassign, 11),
    ] {
        engine
            .append_assignment(&NewAssignment {
                user_id: user,
                configuration_id: config,
                action,
                admin_id: admin,
                reason: "test".to_string(),
            })
            .unwrap();
    }

    let latest = engine.latest_assignment(1).unwrap().unwrap();
    assert_eq!(latest.action, AssignmentAction::Unassign);
    assert_eq!(latest.configuration_id, b);

    let history = engine.assignment_history(&AssignmentFilter::user(1)).unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.windows(2).all(|w| w[0].id > w[1].id));

    let by_admin = engine
        .assignment_history(&AssignmentFilter {
            admin_id: Some(11),
            ..AssignmentFilter::default()
        })
        .unwrap();
    assert_eq!(by_admin.len(), 2);

    let by_config = engine
        .assignment_history(&AssignmentFilter {
            configuration_id: Some(a),
            ..AssignmentFilter::default()
        })
        .unwrap();
    assert!(by_config.iter().all(|e| e.configuration_id == a));
    assert!(engine.latest_assignment(99).unwrap().is_none());
}

// ── Load records ───────────────────────────────────────────────────────

#[test]
fn records_read_in_date_order_within_range() {
    let engine = StorageEngine::open_in_memory().unwrap();
    engine
        .upsert_records(&[
            LoadRecord::new(1, day(2), 3.0),
            LoadRecord::new(1, day(0), 1.0),
            LoadRecord::new(1, day(1), 2.0),
            LoadRecord::new(2, day(0), 9.0),
        ])
        .unwrap();

    let all = engine.read_records(1, DateRange::all()).unwrap();
    assert_eq!(
        all.iter().map(|r| r.acute_load).collect::<Vec<_>>(),
        vec![1.0, 2.0, 3.0]
    );
    let upto = engine.read_records(1, DateRange::until(day(1))).unwrap();
    assert_eq!(upto.len(), 2);
    let middle = engine.read_records(1, DateRange::between(day(1), day(1))).unwrap();
    assert_eq!(middle[0].date, day(1));
    assert_eq!(engine.user_ids().unwrap(), vec![1, 2]);
    assert_eq!(engine.count_records(1).unwrap(), 3);
}

#[test]
fn enhanced_fields_write_back_is_exact_and_clearable() {
    let engine = seeded(4, 3);
    let fields = enhanced(1.0 / 3.0);
    engine.write_enhanced_fields(4, day(1), Some(&fields)).unwrap();

    let records = engine.read_records(4, DateRange::all()).unwrap();
    assert_eq!(records[1].enhanced.as_ref(), Some(&fields));
    assert_eq!(records[0].enhanced, None);

    engine.write_enhanced_fields(4, day(1), None).unwrap();
    assert!(engine.read_records(4, DateRange::all()).unwrap()[1].enhanced.is_none());
}

#[test]
fn write_back_to_missing_record_fails() {
    let engine = seeded(4, 1);
    assert!(engine.write_enhanced_fields(4, day(10), None).is_err());
}

// ── Jobs ───────────────────────────────────────────────────────────────

fn running_job(engine: &StorageEngine, user: UserId, config: ConfigurationId) -> MigrationJob {
    let mut job = MigrationJob::new(user, config, 10, 25);
    job.transition(MigrationStatus::Running).unwrap();
    engine.insert_job(&job).unwrap();
    job
}

#[test]
fn second_running_job_for_user_conflicts() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let config = engine.insert_configuration(&new_config("c")).unwrap();
    let first = running_job(&engine, 1, config);

    let mut second = MigrationJob::new(1, config, 10, 25);
    second.transition(MigrationStatus::Running).unwrap();
    let err = engine.insert_job(&second).unwrap_err();
    match err {
        StrideError::Migration(MigrationError::ConcurrencyConflict {
            user_id,
            running_migration_id,
        }) => {
            assert_eq!(user_id, 1);
            assert_eq!(running_migration_id, first.migration_id);
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    // Other users are unaffected.
    running_job(&engine, 2, config);
    assert!(engine
        .running_migration_for_configuration(config)
        .unwrap()
        .is_some());
}

#[test]
fn pending_job_cannot_be_promoted_while_another_runs() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let config = engine.insert_configuration(&new_config("c")).unwrap();
    running_job(&engine, 1, config);

    let mut pending = MigrationJob::new(1, config, 10, 25);
    engine.insert_job(&pending).unwrap();
    pending.transition(MigrationStatus::Running).unwrap();
    let err = engine.update_job(&pending).unwrap_err();
    assert_eq!(err.code(), "CONCURRENCY_CONFLICT");
}

#[test]
fn job_state_roundtrips_with_failure() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let config = engine.insert_configuration(&new_config("c")).unwrap();
    let mut job = running_job(&engine, 1, config);
    job.current_batch = 2;
    job.processed_count = 20;
    job.success_count = 19;
    job.failure_count = 1;
    job.fail(2, "validation failed").unwrap();
    engine.update_job(&job).unwrap();

    let stored = engine.get_job(&job.migration_id).unwrap().unwrap();
    assert_eq!(stored.status, MigrationStatus::Failed);
    assert_eq!(stored.failure, job.failure);
    assert_eq!(stored.total_batches, 3);
    assert_eq!(stored.failure_count, 1);
    assert!(engine.running_job_for_user(1).unwrap().is_none());

    let failed = engine
        .list_jobs(&JobFilter {
            status: Some(MigrationStatus::Failed),
            ..JobFilter::default()
        })
        .unwrap();
    assert_eq!(failed.len(), 1);
}

#[test]
fn job_cursor_roundtrips() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let config = engine.insert_configuration(&new_config("c")).unwrap();
    let mut job = MigrationJob::new(1, config, 10, 25).with_range_end(Some(day(24)));
    job.transition(MigrationStatus::Running).unwrap();
    engine.insert_job(&job).unwrap();

    let stored = engine.get_job(&job.migration_id).unwrap().unwrap();
    assert_eq!(stored.total_records, 25);
    assert_eq!(stored.range_end, Some(day(24)));
    assert_eq!(stored.last_migrated_date, None);

    job.current_batch = 1;
    job.processed_count = 10;
    job.last_migrated_date = Some(day(9));
    engine.update_job(&job).unwrap();
    assert_eq!(engine.get_job(&job.migration_id).unwrap().unwrap(), job);
}

#[test]
fn updating_unknown_job_is_not_found() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let job = MigrationJob::new(1, 1, 10, 10);
    assert_eq!(engine.update_job(&job).unwrap_err().code(), "MIGRATION_NOT_FOUND");
}

// ── Checkpoints ────────────────────────────────────────────────────────

fn checkpoint(job: &MigrationJob, batch_index: u32) -> Checkpoint {
    Checkpoint {
        checkpoint_id: format!("{}-{batch_index}", job.migration_id),
        migration_id: job.migration_id.clone(),
        user_id: job.user_id,
        batch_index,
        timestamp: Utc::now(),
        data_snapshot: vec![LoadRecord::new(job.user_id, day(0), 0.1 + 0.7)],
        checksum: "abc".to_string(),
        rollback_payload: vec![RestoreEntry {
            date: day(0),
            fields: Some(enhanced(0.123456789)),
        }],
        state: CheckpointState::Prepared,
    }
}

#[test]
fn commit_batch_advances_job_and_checkpoint_together() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let config = engine.insert_configuration(&new_config("c")).unwrap();
    let mut job = running_job(&engine, 1, config);
    let cp = checkpoint(&job, 0);
    engine.insert_checkpoint(&cp).unwrap();

    job.current_batch = 1;
    engine.commit_batch(&cp.checkpoint_id, &job).unwrap();

    let stored = engine.get_checkpoint(&cp.checkpoint_id).unwrap().unwrap();
    assert_eq!(stored.state, CheckpointState::Committed);
    assert_eq!(stored.data_snapshot, cp.data_snapshot);
    assert_eq!(stored.rollback_payload, cp.rollback_payload);
    assert_eq!(engine.get_job(&job.migration_id).unwrap().unwrap().current_batch, 1);
}

#[test]
fn commit_batch_with_missing_checkpoint_leaves_job_untouched() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let config = engine.insert_configuration(&new_config("c")).unwrap();
    let mut job = running_job(&engine, 1, config);
    job.current_batch = 1;

    assert!(engine.commit_batch("missing", &job).is_err());
    assert_eq!(engine.get_job(&job.migration_id).unwrap().unwrap().current_batch, 0);
}

#[test]
fn checkpoints_ordered_and_archived() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let config = engine.insert_configuration(&new_config("c")).unwrap();
    let job = running_job(&engine, 1, config);
    for batch in [2, 0, 1] {
        let mut cp = checkpoint(&job, batch);
        if batch != 2 {
            cp.state = CheckpointState::Committed;
        }
        engine.insert_checkpoint(&cp).unwrap();
    }

    let ordered = engine.checkpoints_for_migration(&job.migration_id).unwrap();
    assert_eq!(
        ordered.iter().map(|c| c.batch_index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );

    assert_eq!(engine.archive_checkpoints(&job.migration_id).unwrap(), 2);
    let states: Vec<_> = engine
        .checkpoints_for_migration(&job.migration_id)
        .unwrap()
        .into_iter()
        .map(|c| c.state)
        .collect();
    assert_eq!(
        states,
        vec![
            CheckpointState::Archived,
            CheckpointState::Archived,
            CheckpointState::Prepared
        ]
    );
}
