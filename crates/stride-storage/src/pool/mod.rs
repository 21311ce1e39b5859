//! Connection pool managing read/write connections.

pub mod pragmas;
pub mod read_pool;
pub mod write_connection;

use std::path::{Path, PathBuf};

use stride_core::errors::StrideResult;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

/// The single write connection plus the read connection pool.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    pub readers: ReadPool,
    pub db_path: Option<PathBuf>,
}

impl ConnectionPool {
    /// Open a pool for the given database file. The writer is opened first so
    /// the file exists before readers attach read-only.
    pub fn open(path: &Path, read_pool_size: usize, busy_timeout_ms: u32) -> StrideResult<Self> {
        let writer = WriteConnection::open(path, busy_timeout_ms)?;
        let readers = ReadPool::open(path, read_pool_size, busy_timeout_ms)?;
        Ok(Self {
            writer,
            readers,
            db_path: Some(path.to_path_buf()),
        })
    }

    /// In-memory pool. Readers are separate databases and never see the
    /// writer's data; the engine routes reads through the writer instead.
    pub fn open_in_memory() -> StrideResult<Self> {
        let writer = WriteConnection::open_in_memory()?;
        let readers = ReadPool::open_in_memory(1)?;
        Ok(Self {
            writer,
            readers,
            db_path: None,
        })
    }
}
