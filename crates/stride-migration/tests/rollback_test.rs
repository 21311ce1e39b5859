use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate};
use stride_calculation::{CalculationOrchestrator, ConfigurationStore, StaticFeatureGate};
use stride_core::config::{CalculationConfig, FeatureGateConfig, MigrationConfig, MonitoringConfig};
use stride_core::errors::{MigrationError, StrideError};
use stride_core::models::*;
use stride_core::traits::IActivityLoadStore;
use stride_migration::rollback::CHECKSUM_MISMATCH_ALERT;
use stride_migration::{IntegrityManager, MigrationEngine, RollbackManager};
use stride_observability::MonitoringSink;
use stride_storage::StorageEngine;

struct Harness {
    storage: Arc<StorageEngine>,
    configurations: Arc<ConfigurationStore>,
    integrity: Arc<IntegrityManager>,
    monitor: Arc<MonitoringSink>,
    engine: MigrationEngine,
    rollback: RollbackManager,
}

fn harness() -> Harness {
    let config = MigrationConfig::default();
    let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
    let configurations = Arc::new(ConfigurationStore::new(storage.clone()));
    let calc = CalculationConfig::default();
    let gate = Arc::new(StaticFeatureGate::from_config(&calc, &FeatureGateConfig::default()));
    let orchestrator = Arc::new(CalculationOrchestrator::new(configurations.clone(), gate, calc));
    let integrity = Arc::new(IntegrityManager::new(storage.clone(), &config));
    let monitor = Arc::new(MonitoringSink::new(&MonitoringConfig::default()));
    let engine = MigrationEngine::new(
        storage.clone(),
        storage.clone(),
        configurations.clone(),
        orchestrator,
        integrity.clone(),
        monitor.clone(),
        config.clone(),
    );
    let rollback = RollbackManager::new(
        storage.clone(),
        storage.clone(),
        integrity.clone(),
        monitor.clone(),
        &config,
    );
    Harness {
        storage,
        configurations,
        integrity,
        monitor,
        engine,
        rollback,
    }
}

fn seed(h: &Harness, user_id: UserId, days: i64) -> Vec<LoadRecord> {
    let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    let records: Vec<LoadRecord> = (0..days)
        .map(|i| {
            let mut record = LoadRecord::new(user_id, start + Duration::days(i), 25.0 + (i % 9) as f64 * 3.5);
            if i % 3 != 0 {
                record = record.with_stress(9.0 + (i % 5) as f64);
            }
            if i % 2 == 0 {
                record.enhanced = Some(EnhancedFields {
                    chronic_load: 31.25,
                    chronic_stress: None,
                    acwr_ratio: 1.0 / 3.0,
                    stress_ratio: None,
                    divergence: None,
                    calculation_method: MethodKind::Standard,
                    configuration_id: None,
                });
            }
            record
        })
        .collect();
    h.storage.upsert_records(&records).unwrap();
    records
}

fn configuration(h: &Harness) -> ConfigurationId {
    h.configurations
        .create(NewConfiguration {
            name: "rollback".to_string(),
            chronic_period_days: 35,
            decay_rate: 0.06,
            notes: Some("rollback tests".to_string()),
            created_by: Some(1),
            supersedes: None,
        })
        .unwrap()
}

fn migrate(h: &Harness, user_id: UserId, cfg: ConfigurationId) -> MigrationJob {
    let job = h.engine.start(user_id, cfg, 10).unwrap();
    h.engine.run(&job.migration_id).unwrap()
}

fn records(h: &Harness, user_id: UserId) -> Vec<LoadRecord> {
    h.storage.read_records(user_id, DateRange::all()).unwrap()
}

#[test]
fn migrate_then_rollback_restores_the_original_records() {
    let h = harness();
    let original = seed(&h, 1, 25);
    let cfg = configuration(&h);
    let job = migrate(&h, 1, cfg);
    assert_ne!(records(&h, 1), original);

    let plan = h.rollback.plan(RollbackScope::UserMigration(1), "bad parameters").unwrap();
    assert_eq!(plan.ops.len(), 3);
    assert_eq!(
        plan.ops.iter().map(|op| op.batch_index).collect::<Vec<_>>(),
        vec![2, 1, 0]
    );
    assert_eq!(plan.record_count(), 25);
    assert_eq!(plan.risk, RiskLevel::Low);
    assert_eq!(plan.estimated_duration, StdDuration::from_millis(50));
    assert_eq!(plan.reason, "bad parameters");

    let result = h.rollback.execute(&plan).unwrap();
    assert_eq!(result.checkpoints_restored, 3);
    assert_eq!(result.records_restored, 25);
    assert_eq!(result.migrations_rolled_back, vec![job.migration_id.clone()]);
    assert!(result.summary().starts_with("rolled back successfully"));

    assert_eq!(records(&h, 1), original);
    assert_eq!(
        h.engine.status(&job.migration_id).unwrap().status,
        MigrationStatus::RolledBack
    );
    assert!(h
        .integrity
        .checkpoints(&job.migration_id)
        .unwrap()
        .iter()
        .all(|cp| cp.state == CheckpointState::RolledBack));
    assert!(h
        .monitor
        .events_for(&job.migration_id)
        .iter()
        .any(|e| e.kind == EventKind::RollbackExecuted));

    // Nothing left to undo.
    assert!(h.rollback.plan(RollbackScope::UserMigration(1), "again").unwrap().is_empty());
    let err = h
        .rollback
        .plan(RollbackScope::Migration(job.migration_id.clone()), "again")
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_TRANSITION");
}

#[test]
fn tampered_checkpoint_aborts_before_touching_records() {
    let h = harness();
    seed(&h, 1, 25);
    let cfg = configuration(&h);
    let job = migrate(&h, 1, cfg);
    let migrated = records(&h, 1);

    let target = h
        .integrity
        .checkpoints(&job.migration_id)
        .unwrap()
        .into_iter()
        .find(|cp| cp.batch_index == 0)
        .unwrap();
    let mut payload = target.rollback_payload.clone();
    payload[0].fields = None;
    payload[1].fields = Some(EnhancedFields {
        chronic_load: 0.0,
        chronic_stress: None,
        acwr_ratio: 0.0,
        stress_ratio: None,
        divergence: None,
        calculation_method: MethodKind::Standard,
        configuration_id: None,
    });
    let tampered = serde_json::to_string(&payload).unwrap();
    h.storage
        .pool()
        .writer
        .with_conn_sync(|conn| {
            conn.execute(
                "UPDATE migration_checkpoints SET rollback_payload = ?1 WHERE checkpoint_id = ?2",
                rusqlite::params![tampered, target.checkpoint_id],
            )
            .map_err(|e| stride_storage::to_storage_err(e.to_string()))?;
            Ok(())
        })
        .unwrap();

    let plan = h.rollback.plan(RollbackScope::UserMigration(1), "revert").unwrap();
    let err = h.rollback.execute(&plan).unwrap_err();
    match &err {
        StrideError::Migration(MigrationError::ChecksumMismatch {
            checkpoint_id,
            expected,
            actual,
        }) => {
            assert_eq!(checkpoint_id, &target.checkpoint_id);
            assert_eq!(expected, &target.checksum);
            assert_ne!(expected, actual);
        }
        other => panic!("expected checksum mismatch, got {other}"),
    }
    assert!(err.is_fatal());
    assert!(err.to_string().contains("data state unchanged"));

    // Newer batches were verified too, and none was restored.
    assert_eq!(records(&h, 1), migrated);
    assert_eq!(
        h.engine.status(&job.migration_id).unwrap().status,
        MigrationStatus::Completed
    );
    assert!(h
        .integrity
        .checkpoints(&job.migration_id)
        .unwrap()
        .iter()
        .all(|cp| cp.state == CheckpointState::Committed));

    let alert = h.monitor.alerts().pop().unwrap();
    assert_eq!(alert.severity, AlertSeverity::Critical);
    assert_eq!(alert.alert_type, CHECKSUM_MISMATCH_ALERT);
    assert!(h
        .monitor
        .events_for(&job.migration_id)
        .iter()
        .any(|e| e.kind == EventKind::RollbackAborted));
}

#[test]
fn running_migrations_are_not_rolled_back() {
    let h = harness();
    seed(&h, 1, 25);
    let cfg = configuration(&h);
    let job = h.engine.start(1, cfg, 10).unwrap();
    h.engine.step(&job.migration_id).unwrap();

    for scope in [
        RollbackScope::UserMigration(1),
        RollbackScope::Migration(job.migration_id.clone()),
        RollbackScope::FullSystem,
    ] {
        let err = h.rollback.plan(scope, "too early").unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }
}

#[test]
fn failed_migration_rolls_back_its_committed_batches() {
    let h = harness();
    let original = seed(&h, 1, 25);
    let cfg = configuration(&h);
    let job = h.engine.start(1, cfg, 10).unwrap();
    h.engine.step(&job.migration_id).unwrap();
    h.engine.step(&job.migration_id).unwrap();
    let cancelled = h.engine.cancel(&job.migration_id).unwrap();
    assert_eq!(cancelled.status, MigrationStatus::Failed);

    let plan = h
        .rollback
        .plan(RollbackScope::Migration(job.migration_id.clone()), "cancelled midway")
        .unwrap();
    assert_eq!(plan.record_count(), 20);

    let result = h.rollback.execute(&plan).unwrap();
    assert_eq!(result.records_restored, 20);
    assert_eq!(records(&h, 1), original);
    assert_eq!(
        h.engine.status(&job.migration_id).unwrap().status,
        MigrationStatus::RolledBack
    );
}

#[test]
fn full_system_rollback_covers_every_user() {
    let h = harness();
    let first = seed(&h, 1, 12);
    let second = seed(&h, 2, 18);
    let cfg = configuration(&h);
    let a = migrate(&h, 1, cfg);
    let b = migrate(&h, 2, cfg);

    let plan = h.rollback.plan(RollbackScope::FullSystem, "global revert").unwrap();
    assert_eq!(plan.risk, RiskLevel::High);
    assert_eq!(plan.ops.len(), 4);
    assert!(plan
        .ops
        .windows(2)
        .all(|w| w[0].checkpoint_timestamp >= w[1].checkpoint_timestamp));

    let result = h.rollback.execute(&plan).unwrap();
    let mut rolled = result.migrations_rolled_back.clone();
    rolled.sort();
    let mut expected = vec![a.migration_id.clone(), b.migration_id.clone()];
    expected.sort();
    assert_eq!(rolled, expected);
    assert_eq!(records(&h, 1), first);
    assert_eq!(records(&h, 2), second);
}

#[test]
fn user_scope_spanning_two_migrations_is_medium_risk() {
    let h = harness();
    let original = seed(&h, 1, 8);
    let cfg = configuration(&h);
    migrate(&h, 1, cfg);
    migrate(&h, 1, cfg);

    let plan = h.rollback.plan(RollbackScope::UserMigration(1), "both").unwrap();
    assert_eq!(plan.risk, RiskLevel::Medium);
    assert_eq!(plan.migration_ids().len(), 2);

    h.rollback.execute(&plan).unwrap();
    assert_eq!(records(&h, 1), original);
}

#[test]
fn finalized_migrations_leave_nothing_to_roll_back() {
    let h = harness();
    seed(&h, 1, 12);
    let cfg = configuration(&h);
    let job = migrate(&h, 1, cfg);
    h.engine.finalize(&job.migration_id).unwrap();

    let plan = h
        .rollback
        .plan(RollbackScope::Migration(job.migration_id.clone()), "late")
        .unwrap();
    assert!(plan.is_empty());
}

#[test]
fn stale_plan_is_rejected() {
    let h = harness();
    seed(&h, 1, 12);
    let cfg = configuration(&h);
    migrate(&h, 1, cfg);

    let plan = h.rollback.plan(RollbackScope::UserMigration(1), "once").unwrap();
    h.rollback.execute(&plan).unwrap();
    let err = h.rollback.execute(&plan).unwrap_err();
    assert_eq!(err.code(), "INVALID_TRANSITION");
}
