//! Per-connection SQLite settings for the activity store.
//!
//! The writer owns the journal mode; readers only size their page cache and
//! share the writer's busy timeout.

use rusqlite::Connection;

use stride_core::errors::StrideResult;

use crate::to_storage_err;

/// Page cache for the writer, in KiB. Migration batches rewrite whole
/// record ranges, so the writer gets the larger cache.
const WRITER_CACHE_KIB: u32 = 64_000;
const READER_CACHE_KIB: u32 = 16_000;

/// Which side of the pool a connection serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    Writer,
    Reader,
}

impl ConnectionRole {
    fn cache_kib(self) -> u32 {
        match self {
            Self::Writer => WRITER_CACHE_KIB,
            Self::Reader => READER_CACHE_KIB,
        }
    }
}

/// The PRAGMA batch executed on a freshly opened connection.
pub fn pragma_script(role: ConnectionRole, busy_timeout_ms: u32) -> String {
    let mut script = String::new();
    if role == ConnectionRole::Writer {
        script.push_str("PRAGMA journal_mode = WAL;\nPRAGMA synchronous = NORMAL;\n");
    }
    script.push_str(&format!(
        "PRAGMA cache_size = -{};\nPRAGMA busy_timeout = {busy_timeout_ms};\nPRAGMA foreign_keys = ON;\n",
        role.cache_kib()
    ));
    script
}

/// Apply the settings for `role` to `conn`.
pub fn configure(conn: &Connection, role: ConnectionRole, busy_timeout_ms: u32) -> StrideResult<()> {
    conn.execute_batch(&pragma_script(role, busy_timeout_ms))
        .map_err(|e| to_storage_err(format!("configuring {role:?} connection: {e}")))
}

/// The journal mode SQLite reports for `conn`, lowercased.
pub fn journal_mode(conn: &Connection) -> StrideResult<String> {
    conn.pragma_query_value(None, "journal_mode", |row| row.get::<_, String>(0))
        .map(|mode| mode.to_ascii_lowercase())
        .map_err(|e| to_storage_err(e.to_string()))
}
