//! [`MigrationEngine`]: per-user batch migrations onto a target configuration.
//!
//! Each batch is checkpointed, recomputed, validated, written back, and
//! committed. Batches are taken by date after the last committed record, up
//! to the newest record present at start. A job's progress and its
//! checkpoint's `Committed` state are persisted in one transaction, so a
//! crash leaves at most one `Prepared` checkpoint, which `resume` restores
//! before re-running that batch.

mod batch;
mod locks;
mod pool;

use std::sync::Arc;

use serde_json::json;

use stride_calculation::{CalculationOrchestrator, ConfigurationStore};
use stride_core::config::MigrationConfig;
use stride_core::constants::MAX_MIGRATION_BATCH_SIZE;
use stride_core::errors::{ConfigurationError, MigrationError, StrideError, StrideResult};
use stride_core::models::{
    AlertSeverity, ConfigurationId, DateRange, EventKind, EventLevel, JobFilter, MigrationJob,
    MigrationStatus, UserId,
};
use stride_core::traits::{IActivityLoadStore, IMigrationStorage};
use stride_observability::{migration_span, MonitoringSink};

use crate::integrity::IntegrityManager;
use crate::restore::restore_payload;

pub use locks::{ExecutionGuard, ExecutionRegistry, UserLockRegistry};
pub use pool::MigrationRequest;

/// Reason recorded on jobs stopped by [`MigrationEngine::cancel`].
pub const CANCELLED_REASON: &str = "cancelled";

pub struct MigrationEngine {
    activity: Arc<dyn IActivityLoadStore>,
    storage: Arc<dyn IMigrationStorage>,
    configurations: Arc<ConfigurationStore>,
    orchestrator: Arc<CalculationOrchestrator>,
    integrity: Arc<IntegrityManager>,
    monitor: Arc<MonitoringSink>,
    config: MigrationConfig,
    locks: UserLockRegistry,
    executions: ExecutionRegistry,
}

impl MigrationEngine {
    /// Build an engine over shared storage, calculation, integrity and monitoring services.
    pub fn new(
        activity: Arc<dyn IActivityLoadStore>,
        storage: Arc<dyn IMigrationStorage>,
        configurations: Arc<ConfigurationStore>,
        orchestrator: Arc<CalculationOrchestrator>,
        integrity: Arc<IntegrityManager>,
        monitor: Arc<MonitoringSink>,
        config: MigrationConfig,
    ) -> Self {
        Self {
            activity,
            storage,
            configurations,
            orchestrator,
            integrity,
            monitor,
            config,
            locks: UserLockRegistry::new(),
            executions: ExecutionRegistry::new(),
        }
    }

    /// The migration settings this engine was built with.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Create a job and move it straight to `Running`.
    ///
    /// Nothing is persisted when the user already has a running migration.
    pub fn start(
        &self,
        user_id: UserId,
        target_configuration_id: ConfigurationId,
        batch_size: usize,
    ) -> StrideResult<MigrationJob> {
        if batch_size == 0 || batch_size > MAX_MIGRATION_BATCH_SIZE {
            return Err(MigrationError::InvalidBatchSize {
                batch_size,
                max: MAX_MIGRATION_BATCH_SIZE,
            }
            .into());
        }
        let target = self.configurations.get(target_configuration_id)?;
        if !target.is_active {
            return Err(ConfigurationError::Inactive {
                id: target_configuration_id,
            }
            .into());
        }

        let history = self.activity.read_records(user_id, DateRange::all())?;
        let mut job = MigrationJob::new(user_id, target_configuration_id, batch_size, history.len())
            .with_range_end(history.last().map(|r| r.date));

        if let Err(holder) = self.locks.acquire(user_id, &job.migration_id) {
            return Err(conflict(user_id, holder));
        }
        if let Err(e) = self.persist_started(&mut job) {
            self.locks.release(user_id, &job.migration_id);
            return Err(e);
        }

        self.monitor.record(
            EventKind::MigrationStarted,
            Some(&job.migration_id),
            EventLevel::Info,
            format!("migration started for user {user_id}"),
            json!({
                "user_id": user_id,
                "target_configuration_id": target_configuration_id,
                "batch_size": batch_size,
                "total_batches": job.total_batches,
            }),
        );
        Ok(job)
    }

    /// Start with the configured default batch size.
    pub fn start_default(
        &self,
        user_id: UserId,
        target_configuration_id: ConfigurationId,
    ) -> StrideResult<MigrationJob> {
        self.start(user_id, target_configuration_id, self.config.default_batch_size)
    }

    fn persist_started(&self, job: &mut MigrationJob) -> StrideResult<()> {
        if let Some(running) = self.storage.running_job_for_user(job.user_id)? {
            return Err(conflict(job.user_id, running.migration_id));
        }
        job.transition(MigrationStatus::Running)?;
        self.storage.insert_job(job)
    }

    /// Drive a `Running` job until it completes, fails, or is cancelled.
    ///
    /// Validation, time-budget, and write-back failures leave the job
    /// `Failed` and are returned as errors. Cancellation is not an error.
    pub fn run(&self, migration_id: &str) -> StrideResult<MigrationJob> {
        let job = self.load_running(migration_id)?;
        let guard = self.claim(&job)?;
        self.recover_prepared(&job)?;
        self.execute(job, &guard)
    }

    /// Continue a `Running` job after an interruption. An uncommitted batch
    /// is restored from its checkpoint and re-run; committed batches are kept.
    pub fn resume(&self, migration_id: &str) -> StrideResult<MigrationJob> {
        let job = self.load_running(migration_id)?;
        let guard = self.claim(&job)?;
        let recovered = self.recover_prepared(&job)?;
        self.monitor.record(
            EventKind::MigrationResumed,
            Some(migration_id),
            EventLevel::Info,
            format!("migration resumed at batch {}", job.current_batch),
            json!({
                "current_batch": job.current_batch,
                "total_batches": job.total_batches,
                "restored_checkpoints": recovered,
            }),
        );
        self.execute(job, &guard)
    }

    /// Process at most one batch, or complete the job when none remain.
    pub fn step(&self, migration_id: &str) -> StrideResult<MigrationJob> {
        let mut job = self.load_running(migration_id)?;
        let _guard = self.claim(&job)?;
        self.recover_prepared(&job)?;
        if !job.has_remaining_batches() {
            return self.complete(job);
        }
        let configuration = self.configurations.get(job.target_configuration_id)?;
        self.process_batch(&mut job, &configuration)?;
        Ok(job)
    }

    fn execute(&self, mut job: MigrationJob, guard: &ExecutionGuard<'_>) -> StrideResult<MigrationJob> {
        let _span = migration_span!(job.migration_id, job.user_id).entered();
        let configuration = self.configurations.get(job.target_configuration_id)?;
        loop {
            if guard.cancel_requested() {
                return self.finish_cancelled(job);
            }
            if !job.has_remaining_batches() {
                return self.complete(job);
            }
            self.process_batch(&mut job, &configuration)?;
        }
    }

    /// Stop a job after its current batch with reason `cancelled`. A job no
    /// worker is executing is stopped immediately.
    pub fn cancel(&self, migration_id: &str) -> StrideResult<MigrationJob> {
        let job = self.status(migration_id)?;
        if !matches!(job.status, MigrationStatus::Pending | MigrationStatus::Running) {
            return Err(MigrationError::InvalidTransition {
                migration_id: migration_id.to_string(),
                from: job.status.to_string(),
                to: MigrationStatus::Failed.to_string(),
            }
            .into());
        }
        if self.executions.request_cancel(migration_id) {
            tracing::info!(event = "cancel_requested", migration_id = %migration_id, "cancellation requested");
            return Ok(job);
        }
        match self.executions.claim(migration_id) {
            Some(_guard) => {
                let job = self.status(migration_id)?;
                self.recover_prepared(&job)?;
                self.finish_cancelled(job)
            }
            None => {
                // A worker claimed it in between.
                self.executions.request_cancel(migration_id);
                Ok(job)
            }
        }
    }

    /// Current persisted state of a job.
    pub fn status(&self, migration_id: &str) -> StrideResult<MigrationJob> {
        self.storage
            .get_job(migration_id)?
            .ok_or_else(|| {
                MigrationError::JobNotFound {
                    migration_id: migration_id.to_string(),
                }
                .into()
            })
    }

    /// Jobs matching `filter`, oldest first.
    pub fn list(&self, filter: &JobFilter) -> StrideResult<Vec<MigrationJob>> {
        self.storage.list_jobs(filter)
    }

    /// Archive a completed migration's checkpoints. Archived batches are no
    /// longer eligible for rollback.
    pub fn finalize(&self, migration_id: &str) -> StrideResult<usize> {
        let archived = self.integrity.archive(migration_id)?;
        tracing::info!(
            event = "migration_finalized",
            migration_id = %migration_id,
            archived = archived,
            "checkpoints archived"
        );
        Ok(archived)
    }

    /// Whether a worker in this process is currently driving the job.
    pub fn is_executing(&self, migration_id: &str) -> bool {
        self.executions.is_executing(migration_id)
    }

    fn load_running(&self, migration_id: &str) -> StrideResult<MigrationJob> {
        let job = self.status(migration_id)?;
        if job.status != MigrationStatus::Running {
            return Err(MigrationError::InvalidTransition {
                migration_id: migration_id.to_string(),
                from: job.status.to_string(),
                to: MigrationStatus::Running.to_string(),
            }
            .into());
        }
        Ok(job)
    }

    /// Take the user lock (re-entrant for the owning job) and the execution
    /// slot for `job`.
    fn claim(&self, job: &MigrationJob) -> StrideResult<ExecutionGuard<'_>> {
        self.locks
            .acquire(job.user_id, &job.migration_id)
            .map_err(|holder| conflict(job.user_id, holder))?;
        self.executions.claim(&job.migration_id).ok_or_else(|| {
            StrideError::ConcurrencyError(format!(
                "migration {} is already executing",
                job.migration_id
            ))
        })
    }

    /// Restore and abandon any `Prepared` checkpoint left by an interrupted
    /// batch. Returns how many were recovered.
    fn recover_prepared(&self, job: &MigrationJob) -> StrideResult<usize> {
        let prepared = self.integrity.prepared(&job.migration_id)?;
        for checkpoint in &prepared {
            if let Err(e) = self.integrity.verify_or_err(checkpoint) {
                self.monitor.alert_for(
                    Some(&job.migration_id),
                    AlertSeverity::Critical,
                    "checkpoint_checksum_mismatch",
                    format!(
                        "uncommitted checkpoint {} failed verification; manual intervention required",
                        checkpoint.checkpoint_id
                    ),
                    json!({ "checkpoint_id": checkpoint.checkpoint_id, "batch_index": checkpoint.batch_index }),
                );
                return Err(e);
            }
            let restored = restore_payload(self.activity.as_ref(), checkpoint)?;
            self.integrity.mark_abandoned(&checkpoint.checkpoint_id)?;
            tracing::info!(
                event = "prepared_checkpoint_restored",
                migration_id = %job.migration_id,
                checkpoint_id = %checkpoint.checkpoint_id,
                batch_index = checkpoint.batch_index,
                records = restored,
                "restored uncommitted batch"
            );
        }
        Ok(prepared.len())
    }

    fn complete(&self, mut job: MigrationJob) -> StrideResult<MigrationJob> {
        job.transition(MigrationStatus::Completed)?;
        self.storage.update_job(&job)?;
        self.release(&job);
        self.monitor.record(
            EventKind::MigrationCompleted,
            Some(&job.migration_id),
            EventLevel::Info,
            format!("migration completed for user {}", job.user_id),
            json!({
                "processed": job.processed_count,
                "succeeded": job.success_count,
                "failed": job.failure_count,
                "batches": job.total_batches,
            }),
        );
        Ok(job)
    }

    fn finish_cancelled(&self, mut job: MigrationJob) -> StrideResult<MigrationJob> {
        job.fail(job.current_batch, CANCELLED_REASON)?;
        self.storage.update_job(&job)?;
        self.release(&job);
        self.monitor.record(
            EventKind::MigrationCancelled,
            Some(&job.migration_id),
            EventLevel::Warning,
            format!("migration cancelled at batch {}", job.current_batch),
            json!({ "batch_index": job.current_batch, "processed": job.processed_count }),
        );
        Ok(job)
    }

    fn release(&self, job: &MigrationJob) {
        self.locks.release(job.user_id, &job.migration_id);
        self.monitor.forget_migration(&job.migration_id);
    }
}

fn conflict(user_id: UserId, running_migration_id: String) -> StrideError {
    MigrationError::ConcurrencyConflict {
        user_id,
        running_migration_id,
    }
    .into()
}
