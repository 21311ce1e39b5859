//! Error taxonomy for the Stride workspace.
//!
//! Each subsystem owns a focused error enum; [`StrideError`] aggregates them
//! so callers can propagate with `?` across crate boundaries.

mod configuration_error;
mod migration_error;
mod storage_error;

pub use configuration_error::ConfigurationError;
pub use migration_error::MigrationError;
pub use storage_error::StorageError;

/// Result alias used throughout the workspace.
pub type StrideResult<T> = Result<T, StrideError>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum StrideError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    /// Bad or missing input during a single date's computation. Recovered by
    /// the calculation orchestrator and never surfaced to its callers.
    #[error("calculation failure: {reason}")]
    CalculationFailure { reason: String },

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("concurrency error: {0}")]
    ConcurrencyError(String),
}

impl StrideError {
    /// Stable machine-readable code for the admin layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(e) => e.code(),
            Self::Migration(e) => e.code(),
            Self::StorageError(_) => "STORAGE_ERROR",
            Self::CalculationFailure { .. } => "CALCULATION_FAILURE",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ConcurrencyError(_) => "CONCURRENCY_ERROR",
        }
    }

    /// True for conditions that require manual intervention and must never be
    /// retried automatically.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Migration(MigrationError::ChecksumMismatch { .. })
                | Self::StorageError(StorageError::CorruptionDetected { .. })
        )
    }
}
