//! Integrity check and WAL checkpoint.

use rusqlite::Connection;

use stride_core::errors::{StorageError, StrideResult};

use crate::to_storage_err;

/// `PRAGMA integrity_check`; anything other than `ok` is corruption.
pub fn integrity_check(conn: &Connection) -> StrideResult<()> {
    let result: String = conn
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    if result != "ok" {
        return Err(StorageError::CorruptionDetected { details: result }.into());
    }
    Ok(())
}

/// Run a TRUNCATE WAL checkpoint.
pub fn wal_checkpoint(conn: &Connection) -> StrideResult<()> {
    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
