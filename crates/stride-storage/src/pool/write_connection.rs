//! Single write connection behind `tokio::sync::Mutex`. All writes are serialized.

use std::path::Path;

use rusqlite::Connection;
use tokio::sync::Mutex;

use stride_core::config::defaults::DEFAULT_BUSY_TIMEOUT_MS;
use stride_core::errors::StrideResult;

use super::pragmas::{self, ConnectionRole};
use crate::to_storage_err;

/// The only connection that mutates the database.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    /// Open (creating if needed) the database file in WAL mode.
    pub fn open(path: &Path, busy_timeout_ms: u32) -> StrideResult<Self> {
        let conn = Connection::open(path).map_err(|e| to_storage_err(e.to_string()))?;
        pragmas::configure(&conn, ConnectionRole::Writer, busy_timeout_ms)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> StrideResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?;
        pragmas::configure(&conn, ConnectionRole::Writer, DEFAULT_BUSY_TIMEOUT_MS)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the write lock from async code.
    pub async fn with_conn<F, T>(&self, f: F) -> StrideResult<T>
    where
        F: FnOnce(&Connection) -> StrideResult<T>,
    {
        let guard = self.conn.lock().await;
        f(&guard)
    }

    /// Synchronous access. Must not be called from inside an async runtime worker.
    pub fn with_conn_sync<F, T>(&self, f: F) -> StrideResult<T>
    where
        F: FnOnce(&Connection) -> StrideResult<T>,
    {
        let guard = self.conn.blocking_lock();
        f(&guard)
    }
}
