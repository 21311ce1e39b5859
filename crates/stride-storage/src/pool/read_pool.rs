//! Read-only connections used for history reads while a migration writes.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

use rusqlite::{Connection, OpenFlags};

use stride_core::errors::StrideResult;

use super::pragmas::{self, ConnectionRole};
use crate::to_storage_err;

/// Upper bound on reader connections regardless of configuration.
pub const MAX_READERS: usize = 8;

/// A fixed set of read connections. A read takes the first idle
/// connection and only waits when every reader is busy.
pub struct ReadPool {
    readers: Vec<Mutex<Connection>>,
    /// Where a busy pool starts waiting next, so waits spread across readers.
    next_wait: AtomicUsize,
}

impl ReadPool {
    /// Open `size` read-only connections (clamped to `1..=MAX_READERS`) on
    /// an existing database file.
    pub fn open(path: &Path, size: usize, busy_timeout_ms: u32) -> StrideResult<Self> {
        Self::build(size, || {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| to_storage_err(format!("opening reader on {}: {e}", path.display())))?;
            pragmas::configure(&conn, ConnectionRole::Reader, busy_timeout_ms)?;
            Ok(conn)
        })
    }

    /// Private in-memory databases. They never see the writer's data.
    pub fn open_in_memory(size: usize) -> StrideResult<Self> {
        Self::build(size, || Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string())))
    }

    fn build(size: usize, mut open: impl FnMut() -> StrideResult<Connection>) -> StrideResult<Self> {
        let readers = (0..size.clamp(1, MAX_READERS))
            .map(|_| open().map(Mutex::new))
            .collect::<StrideResult<Vec<_>>>()?;
        Ok(Self {
            readers,
            next_wait: AtomicUsize::new(0),
        })
    }

    /// Run `f` on an idle reader, waiting for one if all are in use.
    pub fn with_conn<F, T>(&self, f: F) -> StrideResult<T>
    where
        F: FnOnce(&Connection) -> StrideResult<T>,
    {
        let conn = self.acquire()?;
        f(&conn)
    }

    fn acquire(&self) -> StrideResult<MutexGuard<'_, Connection>> {
        for reader in &self.readers {
            match reader.try_lock() {
                Ok(conn) => return Ok(conn),
                Err(TryLockError::WouldBlock) => continue,
                Err(TryLockError::Poisoned(e)) => {
                    return Err(to_storage_err(format!("reader poisoned: {e}")))
                }
            }
        }
        let idx = self.next_wait.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        self.readers[idx]
            .lock()
            .map_err(|e| to_storage_err(format!("reader poisoned: {e}")))
    }

    /// Number of reader connections.
    pub fn size(&self) -> usize {
        self.readers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_clamped() {
        assert_eq!(ReadPool::open_in_memory(0).unwrap().size(), 1);
        assert_eq!(ReadPool::open_in_memory(64).unwrap().size(), MAX_READERS);
    }

    #[test]
    fn nested_reads_use_a_second_reader() {
        let pool = ReadPool::open_in_memory(2).unwrap();
        let seen = pool
            .with_conn(|outer| {
                outer.execute_batch("CREATE TABLE marker (x INTEGER)").map_err(|e| to_storage_err(e.to_string()))?;
                pool.with_conn(|inner| {
                    let tables: i64 = inner
                        .query_row("SELECT count(*) FROM sqlite_master WHERE name = 'marker'", [], |r| r.get(0))
                        .map_err(|e| to_storage_err(e.to_string()))?;
                    Ok(tables)
                })
            })
            .unwrap();
        assert_eq!(seen, 0);
    }
}
