//! One batch: checkpoint, recompute, validate, write back, commit.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde_json::json;

use stride_core::errors::{MigrationError, StrideResult};
use stride_core::models::{
    stored_now, AlertSeverity, CalculationResult, Checkpoint, Configuration, DateRange, EventKind,
    EventLevel, LoadRecord, MigrationJob, UserId, ValidationLevel,
};
use stride_observability::batch_span;

use super::MigrationEngine;
use crate::integrity::{BatchCounts, BatchProposal};
use crate::restore::restore_payload;

impl MigrationEngine {
    /// Run batch `job.current_batch` and advance `job` on commit. On any
    /// failure the job is persisted as `Failed` and the batch left unmutated.
    pub(super) fn process_batch(
        &self,
        job: &mut MigrationJob,
        configuration: &Configuration,
    ) -> StrideResult<()> {
        let started = Instant::now();
        let batch_index = job.current_batch;
        let _span = batch_span!(job.migration_id, batch_index).entered();

        let history = self.activity.read_records(job.user_id, DateRange::all())?;
        let (batch, counts) = next_batch(job, &history);

        let checkpoint =
            match self
                .integrity
                .checkpoint(&job.migration_id, job.user_id, batch_index, batch)
            {
                Ok(checkpoint) => checkpoint,
                Err(e) => {
                    let reason = format!("checkpoint failed: {e}");
                    self.fail_job(job, batch_index, &reason);
                    return Err(e);
                }
            };

        let lookback = self.orchestrator.lookback_days(configuration);
        let updates: Vec<CalculationResult> = batch
            .iter()
            .map(|record| self.recompute(&history, job.user_id, record.date, configuration, lookback))
            .collect();

        let validation = self.integrity.validate(
            &BatchProposal {
                migration_id: &job.migration_id,
                user_id: job.user_id,
                batch_index,
                inputs: batch,
                updates: &updates,
                counts,
                sample_seed: &checkpoint.checkpoint_id,
                recompute: None,
            },
            ValidationLevel::Standard,
        );
        if !validation.passed {
            let reason = validation.failure_reason();
            self.abandon(&checkpoint);
            self.fail_job(job, batch_index, &reason);
            self.monitor.alert_for(
                Some(&job.migration_id),
                AlertSeverity::Warning,
                "migration_validation_failed",
                format!(
                    "migration {} for user {} failed validation at batch {batch_index}",
                    job.migration_id, job.user_id
                ),
                json!({ "errors": validation.errors, "warnings": validation.warnings }),
            );
            return Err(MigrationError::ValidationFailed {
                migration_id: job.migration_id.clone(),
                batch_index,
                reason,
            }
            .into());
        }

        let budget = Duration::from_millis(self.config.batch_time_budget_ms);
        let elapsed = started.elapsed();
        if elapsed > budget {
            self.abandon(&checkpoint);
            self.fail_job(job, batch_index, "batch time budget exceeded");
            return Err(MigrationError::BatchTimeBudgetExceeded {
                migration_id: job.migration_id.clone(),
                batch_index,
                elapsed_ms: elapsed.as_millis() as u64,
                budget_ms: self.config.batch_time_budget_ms,
            }
            .into());
        }

        let mut advanced = job.clone();
        let failed = updates.iter().filter(|u| u.method.is_fallback()).count() as u64;
        let processed = updates.len() as u64;
        advanced.current_batch += 1;
        if let Some(last) = batch.last() {
            advanced.last_migrated_date = Some(last.date);
        }
        advanced.processed_count += processed;
        advanced.failure_count += failed;
        advanced.success_count += processed - failed;
        advanced.updated_at = stored_now();

        let applied = self
            .write_back(job.user_id, &updates)
            .and_then(|()| self.integrity.commit(&checkpoint, &advanced));
        if let Err(e) = applied {
            self.undo_batch(job, &checkpoint);
            self.fail_job(job, batch_index, &format!("write-back failed: {e}"));
            return Err(e);
        }
        *job = advanced;

        self.monitor
            .record_batch_outcome(&job.migration_id, batch_index, processed, failed);
        Ok(())
    }

    /// Enhanced result for `date` using only the history that can affect it.
    fn recompute(
        &self,
        history: &[LoadRecord],
        user_id: UserId,
        date: NaiveDate,
        configuration: &Configuration,
        lookback_days: u32,
    ) -> CalculationResult {
        let earliest = date - chrono::Duration::days(i64::from(lookback_days));
        let start = history.partition_point(|r| r.date <= earliest);
        let end = history.partition_point(|r| r.date <= date);
        self.orchestrator
            .calculate_enhanced(user_id, &history[start..end], date, configuration)
    }

    fn write_back(&self, user_id: UserId, updates: &[CalculationResult]) -> StrideResult<()> {
        for update in updates {
            let fields = update.to_enhanced_fields();
            self.activity
                .write_enhanced_fields(user_id, update.reference_date, Some(&fields))?;
        }
        Ok(())
    }

    /// Put a partially written batch back the way the checkpoint found it.
    fn undo_batch(&self, job: &MigrationJob, checkpoint: &Checkpoint) {
        match restore_payload(self.activity.as_ref(), checkpoint) {
            Ok(_) => self.abandon(checkpoint),
            Err(e) => {
                // Left Prepared so resume or rollback can retry the restore.
                self.monitor.alert_for(
                    Some(&job.migration_id),
                    AlertSeverity::Critical,
                    "batch_restore_failed",
                    format!(
                        "could not restore batch {} from checkpoint {}: {e}",
                        checkpoint.batch_index, checkpoint.checkpoint_id
                    ),
                    json!({ "checkpoint_id": checkpoint.checkpoint_id }),
                );
            }
        }
    }

    fn abandon(&self, checkpoint: &Checkpoint) {
        if let Err(e) = self.integrity.mark_abandoned(&checkpoint.checkpoint_id) {
            tracing::warn!(
                event = "checkpoint_abandon_failed",
                checkpoint_id = %checkpoint.checkpoint_id,
                error = %e,
                "failed to mark checkpoint abandoned"
            );
        }
    }

    /// Persist `job` as `Failed` and release it. Errors while recording the
    /// failure are logged; the caller returns the original error.
    pub(super) fn fail_job(&self, job: &mut MigrationJob, batch_index: u32, reason: &str) {
        if let Err(e) = job.fail(batch_index, reason) {
            tracing::warn!(event = "job_fail_rejected", migration_id = %job.migration_id, error = %e);
            return;
        }
        if let Err(e) = self.storage.update_job(job) {
            tracing::error!(
                event = "job_fail_persist_failed",
                migration_id = %job.migration_id,
                error = %e,
                "failed to persist job failure"
            );
        }
        self.release(job);
        self.monitor.record(
            EventKind::BatchFailed,
            Some(&job.migration_id),
            EventLevel::Error,
            format!("batch {batch_index} failed: {reason}"),
            json!({ "batch_index": batch_index, "reason": reason }),
        );
        self.monitor.record(
            EventKind::MigrationFailed,
            Some(&job.migration_id),
            EventLevel::Error,
            format!("migration failed for user {}", job.user_id),
            json!({
                "user_id": job.user_id,
                "batch_index": batch_index,
                "reason": reason,
                "processed": job.processed_count,
            }),
        );
    }
}

/// The next batch of `job`: up to `batch_size` records dated after the last
/// committed one and no later than the job's range end. `history` must be
/// ordered by date.
fn next_batch<'h>(job: &MigrationJob, history: &'h [LoadRecord]) -> (&'h [LoadRecord], BatchCounts) {
    let start = match job.last_migrated_date {
        Some(cursor) => history.partition_point(|r| r.date <= cursor),
        None => 0,
    };
    let end = match job.range_end {
        Some(range_end) => history.partition_point(|r| r.date <= range_end),
        None => start,
    }
    .max(start);

    if start as u64 != job.processed_count {
        tracing::warn!(
            event = "records_behind_cursor",
            migration_id = %job.migration_id,
            expected = job.processed_count,
            found = start,
            "records dated at or before the last migrated date changed; they are outside this job"
        );
    }

    let found_remaining = end - start;
    let len = job.batch_size.min(found_remaining);
    let counts = BatchCounts {
        expected_len: job.expected_batch_len(),
        expected_remaining: job.remaining_records() as usize,
        found_remaining,
    };
    (&history[start..start + len], counts)
}
