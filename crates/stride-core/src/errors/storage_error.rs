/// Storage-layer errors for SQLite operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("schema migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("database corruption detected: {details}")]
    CorruptionDetected { details: String },
}
