//! # stride-storage
//!
//! SQLite persistence layer: one serialized writer, a pool of WAL readers,
//! numbered schema migrations, and the query modules behind the
//! [`IActivityLoadStore`], [`IConfigurationStorage`], and
//! [`IMigrationStorage`] traits.
//!
//! [`IActivityLoadStore`]: stride_core::traits::IActivityLoadStore
//! [`IConfigurationStorage`]: stride_core::traits::IConfigurationStorage
//! [`IMigrationStorage`]: stride_core::traits::IMigrationStorage

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use engine::StorageEngine;

use stride_core::errors::{StorageError, StrideError};

/// Wrap a low-level failure message as a storage error.
pub fn to_storage_err(message: String) -> StrideError {
    StrideError::StorageError(StorageError::SqliteError { message })
}
