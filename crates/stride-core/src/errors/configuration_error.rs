/// Configuration validation and lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// A parameter fell outside its inclusive bounds. Never partially applied.
    #[error("{field} must be between {min} and {max} (inclusive), got {value}")]
    InvalidRange {
        field: String,
        min: String,
        max: String,
        value: String,
    },

    #[error("configuration name must not be empty")]
    InvalidName,

    #[error("configuration {id} not found")]
    NotFound { id: i64 },

    #[error("configuration {id} is inactive")]
    Inactive { id: i64 },

    /// Mutation would invalidate an in-flight migration.
    #[error("configuration {id} is the target of running migration {migration_id}")]
    InUseByMigration { id: i64, migration_id: String },
}

impl ConfigurationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRange { .. } => "INVALID_RANGE",
            Self::InvalidName => "INVALID_NAME",
            Self::NotFound { .. } => "CONFIGURATION_NOT_FOUND",
            Self::Inactive { .. } => "CONFIGURATION_INACTIVE",
            Self::InUseByMigration { .. } => "CONFIGURATION_IN_USE",
        }
    }
}
