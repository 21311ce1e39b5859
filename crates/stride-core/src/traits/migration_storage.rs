use crate::errors::StrideResult;
use crate::models::{Checkpoint, CheckpointState, JobFilter, MigrationJob, UserId};

/// Persistence for migration jobs and their checkpoints.
pub trait IMigrationStorage: Send + Sync {
    // --- Jobs ---
    /// Insert a new job. Fails with `ConcurrencyConflict` if the job is
    /// `Running` and the user already has another `Running` job.
    fn insert_job(&self, job: &MigrationJob) -> StrideResult<()>;
    /// Persist the job's current state. Same uniqueness rule as `insert_job`.
    fn update_job(&self, job: &MigrationJob) -> StrideResult<()>;
    fn get_job(&self, migration_id: &str) -> StrideResult<Option<MigrationJob>>;
    fn list_jobs(&self, filter: &JobFilter) -> StrideResult<Vec<MigrationJob>>;
    fn running_job_for_user(&self, user_id: UserId) -> StrideResult<Option<MigrationJob>>;

    // --- Checkpoints ---
    fn insert_checkpoint(&self, checkpoint: &Checkpoint) -> StrideResult<()>;
    fn get_checkpoint(&self, checkpoint_id: &str) -> StrideResult<Option<Checkpoint>>;
    /// Checkpoints of a migration ordered by batch index, then timestamp.
    fn checkpoints_for_migration(&self, migration_id: &str) -> StrideResult<Vec<Checkpoint>>;
    fn set_checkpoint_state(&self, checkpoint_id: &str, state: CheckpointState) -> StrideResult<()>;

    /// Mark the checkpoint `Committed` and persist the advanced job in one
    /// transaction.
    fn commit_batch(&self, checkpoint_id: &str, job: &MigrationJob) -> StrideResult<()>;

    /// Move every `Committed` checkpoint of a terminal migration to `Archived`.
    fn archive_checkpoints(&self, migration_id: &str) -> StrideResult<usize>;
}
