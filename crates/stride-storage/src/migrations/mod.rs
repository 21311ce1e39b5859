//! Schema migrations tracked with `PRAGMA user_version`.

pub mod v001_configurations;
pub mod v002_load_records;
pub mod v003_migration_jobs;
pub mod v004_job_cursor;

use rusqlite::Connection;

use stride_core::errors::StorageError;

/// Latest schema version.
pub const LATEST_VERSION: u32 = 4;

/// Apply every migration newer than the database's `user_version`.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let current = current_version(conn)?;

    let migrations: &[(&str, u32)] = &[
        (v001_configurations::MIGRATION_SQL, 1),
        (v002_load_records::MIGRATION_SQL, 2),
        (v003_migration_jobs::MIGRATION_SQL, 3),
        (v004_job_cursor::MIGRATION_SQL, 4),
    ];

    for (sql, version) in migrations {
        if current < *version {
            conn.execute_batch(sql)
                .map_err(|e| StorageError::MigrationFailed {
                    version: *version,
                    reason: e.to_string(),
                })?;
            conn.pragma_update(None, "user_version", version)
                .map_err(|e| StorageError::MigrationFailed {
                    version: *version,
                    reason: e.to_string(),
                })?;
            tracing::info!(version = version, "applied schema migration");
        }
    }

    Ok(())
}

/// Schema version recorded in `user_version`.
pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })
}
