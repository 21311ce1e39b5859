/// Migration, checkpoint, and rollback errors.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("migration {migration_id} failed validation at batch {batch_index}: {reason}")]
    ValidationFailed {
        migration_id: String,
        batch_index: u32,
        reason: String,
    },

    /// Fatal: a checkpoint no longer matches its stored checksum.
    #[error(
        "rollback aborted: checksum mismatch on checkpoint {checkpoint_id} \
         (expected {expected}, got {actual}); data state unchanged, do not retry automatically"
    )]
    ChecksumMismatch {
        checkpoint_id: String,
        expected: String,
        actual: String,
    },

    #[error("user {user_id} already has running migration {running_migration_id}")]
    ConcurrencyConflict {
        user_id: i64,
        running_migration_id: String,
    },

    #[error("migration {migration_id} not found")]
    JobNotFound { migration_id: String },

    #[error("checkpoint {checkpoint_id} not found")]
    CheckpointNotFound { checkpoint_id: String },

    #[error("migration {migration_id} cannot transition from {from} to {to}")]
    InvalidTransition {
        migration_id: String,
        from: String,
        to: String,
    },

    #[error(
        "migration {migration_id} batch {batch_index} exceeded time budget: \
         {elapsed_ms}ms > {budget_ms}ms"
    )]
    BatchTimeBudgetExceeded {
        migration_id: String,
        batch_index: u32,
        elapsed_ms: u64,
        budget_ms: u64,
    },

    #[error("invalid batch size {batch_size}: must be between 1 and {max}")]
    InvalidBatchSize { batch_size: usize, max: usize },
}

impl MigrationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationFailed { .. } => "VALIDATION_FAILURE",
            Self::ChecksumMismatch { .. } => "CHECKSUM_MISMATCH",
            Self::ConcurrencyConflict { .. } => "CONCURRENCY_CONFLICT",
            Self::JobNotFound { .. } => "MIGRATION_NOT_FOUND",
            Self::CheckpointNotFound { .. } => "CHECKPOINT_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::BatchTimeBudgetExceeded { .. } => "BATCH_TIME_BUDGET_EXCEEDED",
            Self::InvalidBatchSize { .. } => "INVALID_BATCH_SIZE",
        }
    }
}
