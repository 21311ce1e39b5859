use std::sync::Arc;

use stride_core::config::MigrationConfig;
use stride_core::errors::{MigrationError, StrideResult};
use stride_core::models::{
    Checkpoint, CheckpointState, LoadRecord, MigrationJob, RestoreEntry, UserId, ValidationLevel,
    ValidationResult,
};
use stride_core::traits::IMigrationStorage;

use super::checksum::{checksum_of, compute_checksum};
use super::validation::{validate_batch, BatchProposal, StrictSettings};

/// Owns the checkpoint lifecycle: prepare before mutation, commit with the
/// job's progress, and verification before any restore.
pub struct IntegrityManager {
    storage: Arc<dyn IMigrationStorage>,
    strict: StrictSettings,
}

impl IntegrityManager {
    /// Manager persisting checkpoints through `storage`.
    pub fn new(storage: Arc<dyn IMigrationStorage>, config: &MigrationConfig) -> Self {
        Self {
            storage,
            strict: StrictSettings {
                sample_size: config.strict_sample_size,
                tolerance: config.validation_tolerance,
            },
        }
    }

    /// Snapshot `snapshot` and persist it as a `Prepared` checkpoint.
    ///
    /// The rollback payload is each record's current write-back fields. An
    /// error here means nothing was persisted and the batch must not run.
    pub fn checkpoint(
        &self,
        migration_id: &str,
        user_id: UserId,
        batch_index: u32,
        snapshot: &[LoadRecord],
    ) -> StrideResult<Checkpoint> {
        let checkpoint_id = uuid::Uuid::new_v4().to_string();
        let rollback_payload: Vec<RestoreEntry> = snapshot
            .iter()
            .map(|record| RestoreEntry {
                date: record.date,
                fields: record.enhanced.clone(),
            })
            .collect();
        let checksum = compute_checksum(
            &checkpoint_id,
            migration_id,
            user_id,
            batch_index,
            snapshot,
            &rollback_payload,
        )?;

        let checkpoint = Checkpoint {
            checkpoint_id,
            migration_id: migration_id.to_string(),
            user_id,
            batch_index,
            timestamp: stride_core::models::stored_now(),
            data_snapshot: snapshot.to_vec(),
            checksum,
            rollback_payload,
            state: CheckpointState::Prepared,
        };
        self.storage.insert_checkpoint(&checkpoint)?;
        tracing::debug!(
            event = "checkpoint_prepared",
            checkpoint_id = %checkpoint.checkpoint_id,
            migration_id = %migration_id,
            batch_index = batch_index,
            records = snapshot.len(),
            "checkpoint prepared"
        );
        Ok(checkpoint)
    }

    /// Validate a proposed batch at `level`, logging the outcome.
    pub fn validate(&self, proposal: &BatchProposal<'_>, level: ValidationLevel) -> ValidationResult {
        validate_batch(proposal, level, self.strict)
    }

    /// True when the stored checksum matches the checkpoint's content.
    pub fn verify_checksum(&self, checkpoint: &Checkpoint) -> bool {
        matches!(checksum_of(checkpoint), Ok(actual) if actual == checkpoint.checksum)
    }

    /// Like [`verify_checksum`](Self::verify_checksum), but reports the digests.
    pub fn verify_or_err(&self, checkpoint: &Checkpoint) -> StrideResult<()> {
        let actual = checksum_of(checkpoint)?;
        if actual != checkpoint.checksum {
            return Err(MigrationError::ChecksumMismatch {
                checkpoint_id: checkpoint.checkpoint_id.clone(),
                expected: checkpoint.checksum.clone(),
                actual,
            }
            .into());
        }
        Ok(())
    }

    /// Mark the checkpoint `Committed` and persist `job` atomically.
    pub fn commit(&self, checkpoint: &Checkpoint, job: &MigrationJob) -> StrideResult<()> {
        self.storage.commit_batch(&checkpoint.checkpoint_id, job)
    }

    /// Mark a checkpoint whose batch was never written.
    pub fn mark_abandoned(&self, checkpoint_id: &str) -> StrideResult<()> {
        self.storage
            .set_checkpoint_state(checkpoint_id, CheckpointState::Abandoned)
    }

    /// Mark a checkpoint whose records have been restored.
    pub fn mark_rolled_back(&self, checkpoint_id: &str) -> StrideResult<()> {
        self.storage
            .set_checkpoint_state(checkpoint_id, CheckpointState::RolledBack)
    }

    /// Freeze the committed checkpoints of a terminal migration.
    pub fn archive(&self, migration_id: &str) -> StrideResult<usize> {
        let job = self
            .storage
            .get_job(migration_id)?
            .ok_or_else(|| MigrationError::JobNotFound {
                migration_id: migration_id.to_string(),
            })?;
        if !job.status.is_terminal() {
            return Err(MigrationError::InvalidTransition {
                migration_id: migration_id.to_string(),
                from: job.status.to_string(),
                to: "archived".to_string(),
            }
            .into());
        }
        self.storage.archive_checkpoints(migration_id)
    }

    /// Every checkpoint of a migration, by batch then time.
    pub fn checkpoints(&self, migration_id: &str) -> StrideResult<Vec<Checkpoint>> {
        self.storage.checkpoints_for_migration(migration_id)
    }

    /// Checkpoints left `Prepared` by an interrupted batch.
    pub fn prepared(&self, migration_id: &str) -> StrideResult<Vec<Checkpoint>> {
        Ok(self
            .checkpoints(migration_id)?
            .into_iter()
            .filter(|cp| cp.state == CheckpointState::Prepared)
            .collect())
    }
}
