use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::json;

use stride_core::config::MigrationConfig;
use stride_core::errors::{MigrationError, StrideError, StrideResult};
use stride_core::models::{
    AlertSeverity, Checkpoint, CheckpointState, EventKind, EventLevel, JobFilter, MigrationJob,
    MigrationStatus, RollbackPlan, RollbackResult, RollbackScope,
};
use stride_core::traits::{IActivityLoadStore, IMigrationStorage};
use stride_observability::{rollback_span, MonitoringSink};

use super::plan::{assess_risk, estimate_duration, operations, sort_newest_first};
use crate::integrity::IntegrityManager;
use crate::restore::restore_payload;

/// Alert type raised when a rollback finds a tampered checkpoint.
pub const CHECKSUM_MISMATCH_ALERT: &str = "rollback_checksum_mismatch";

/// The only path that restores records outside a migration's own write-back.
pub struct RollbackManager {
    activity: Arc<dyn IActivityLoadStore>,
    storage: Arc<dyn IMigrationStorage>,
    integrity: Arc<IntegrityManager>,
    monitor: Arc<MonitoringSink>,
    cost_per_record_ms: u64,
}

impl RollbackManager {
    /// Rollback manager over the shared stores.
    pub fn new(
        activity: Arc<dyn IActivityLoadStore>,
        storage: Arc<dyn IMigrationStorage>,
        integrity: Arc<IntegrityManager>,
        monitor: Arc<MonitoringSink>,
        config: &MigrationConfig,
    ) -> Self {
        Self {
            activity,
            storage,
            integrity,
            monitor,
            cost_per_record_ms: config.rollback_cost_per_record_ms,
        }
    }

    /// Collect the committed checkpoints in `scope`, newest first.
    ///
    /// Only `Completed` and `Failed` jobs are eligible. A running job in
    /// scope refuses the whole plan.
    pub fn plan(&self, scope: RollbackScope, reason: &str) -> StrideResult<RollbackPlan> {
        let jobs = self.jobs_in_scope(&scope)?;

        let mut ops = Vec::new();
        for job in jobs.iter().filter(|job| is_eligible(job)) {
            ops.extend(operations(&self.integrity.checkpoints(&job.migration_id)?));
        }
        sort_newest_first(&mut ops);

        let records: usize = ops.iter().map(|op| op.record_count).sum();
        let mut migrations: Vec<&str> = ops.iter().map(|op| op.migration_id.as_str()).collect();
        migrations.sort_unstable();
        migrations.dedup();

        let plan = RollbackPlan {
            risk: assess_risk(&scope, records, migrations.len()),
            estimated_duration: estimate_duration(records, self.cost_per_record_ms),
            scope,
            reason: reason.to_string(),
            ops,
            created_at: Utc::now(),
        };
        tracing::info!(
            event = "rollback_planned",
            scope = ?plan.scope,
            ops = plan.ops.len(),
            records = records,
            risk = ?plan.risk,
            "rollback planned"
        );
        Ok(plan)
    }

    fn jobs_in_scope(&self, scope: &RollbackScope) -> StrideResult<Vec<MigrationJob>> {
        let jobs = match scope {
            RollbackScope::Migration(migration_id) => {
                let job = self.load_job(migration_id)?;
                if !is_eligible(&job) {
                    return Err(refuse(&job));
                }
                vec![job]
            }
            RollbackScope::UserMigration(user_id) => self.storage.list_jobs(&JobFilter {
                user_id: Some(*user_id),
                status: None,
            })?,
            RollbackScope::FullSystem => self.storage.list_jobs(&JobFilter::default())?,
        };
        if let Some(running) = jobs.iter().find(|job| job.status == MigrationStatus::Running) {
            return Err(refuse(running));
        }
        Ok(jobs)
    }

    /// Restore every checkpoint in `plan`.
    ///
    /// All checksums are verified before the first record is touched; any
    /// mismatch aborts the rollback with the data unchanged.
    pub fn execute(&self, plan: &RollbackPlan) -> StrideResult<RollbackResult> {
        let _span = rollback_span!(plan.scope, plan.ops.len()).entered();
        let started = Instant::now();
        let migration_ids = plan.migration_ids();

        let mut checkpoints: Vec<Checkpoint> = Vec::with_capacity(plan.ops.len());
        for op in &plan.ops {
            let checkpoint = self.storage.get_checkpoint(&op.checkpoint_id)?.ok_or_else(|| {
                MigrationError::CheckpointNotFound {
                    checkpoint_id: op.checkpoint_id.clone(),
                }
            })?;
            if checkpoint.state != CheckpointState::Committed {
                return Err(MigrationError::InvalidTransition {
                    migration_id: checkpoint.migration_id.clone(),
                    from: format!("checkpoint {} {}", checkpoint.checkpoint_id, checkpoint.state.as_str()),
                    to: CheckpointState::RolledBack.as_str().to_string(),
                }
                .into());
            }
            checkpoints.push(checkpoint);
        }

        let mut jobs = Vec::with_capacity(migration_ids.len());
        for migration_id in &migration_ids {
            let job = self.load_job(migration_id)?;
            if !is_eligible(&job) {
                return Err(refuse(&job));
            }
            jobs.push(job);
        }

        for checkpoint in &checkpoints {
            if let Err(e) = self.integrity.verify_or_err(checkpoint) {
                self.abort(plan, checkpoint, &e.to_string());
                return Err(e);
            }
        }

        let mut records_restored = 0;
        for checkpoint in &checkpoints {
            records_restored += restore_payload(self.activity.as_ref(), checkpoint)?;
            self.integrity.mark_rolled_back(&checkpoint.checkpoint_id)?;
        }
        for job in &mut jobs {
            job.transition(MigrationStatus::RolledBack)?;
            self.storage.update_job(job)?;
        }

        let result = RollbackResult {
            scope: plan.scope.clone(),
            checkpoints_restored: checkpoints.len(),
            records_restored,
            migrations_rolled_back: migration_ids,
            duration: started.elapsed(),
        };
        for migration_id in &result.migrations_rolled_back {
            self.monitor.record(
                EventKind::RollbackExecuted,
                Some(migration_id),
                EventLevel::Warning,
                result.summary(),
                json!({ "reason": plan.reason, "scope": plan.scope }),
            );
        }
        if result.migrations_rolled_back.is_empty() {
            self.monitor.record(
                EventKind::RollbackExecuted,
                None,
                EventLevel::Info,
                result.summary(),
                json!({ "reason": plan.reason, "scope": plan.scope }),
            );
        }
        Ok(result)
    }

    /// Plan and execute in one call.
    pub fn rollback(&self, scope: RollbackScope, reason: &str) -> StrideResult<RollbackResult> {
        let plan = self.plan(scope, reason)?;
        self.execute(&plan)
    }

    fn abort(&self, plan: &RollbackPlan, checkpoint: &Checkpoint, error: &str) {
        let details = json!({
            "checkpoint_id": checkpoint.checkpoint_id,
            "batch_index": checkpoint.batch_index,
            "scope": plan.scope,
            "error": error,
        });
        self.monitor.alert_for(
            Some(&checkpoint.migration_id),
            AlertSeverity::Critical,
            CHECKSUM_MISMATCH_ALERT,
            format!(
                "rollback aborted: checkpoint {} failed checksum verification; data state unchanged",
                checkpoint.checkpoint_id
            ),
            details.clone(),
        );
        self.monitor.record(
            EventKind::RollbackAborted,
            Some(&checkpoint.migration_id),
            EventLevel::Critical,
            "rollback aborted before any record was restored",
            details,
        );
    }

    fn load_job(&self, migration_id: &str) -> StrideResult<MigrationJob> {
        self.storage.get_job(migration_id)?.ok_or_else(|| {
            MigrationError::JobNotFound {
                migration_id: migration_id.to_string(),
            }
            .into()
        })
    }
}

fn is_eligible(job: &MigrationJob) -> bool {
    matches!(job.status, MigrationStatus::Completed | MigrationStatus::Failed)
}

fn refuse(job: &MigrationJob) -> StrideError {
    MigrationError::InvalidTransition {
        migration_id: job.migration_id.clone(),
        from: job.status.to_string(),
        to: MigrationStatus::RolledBack.to_string(),
    }
    .into()
}
