//! # stride-migration
//!
//! Moves a user's stored history onto a new decay configuration in
//! checkpointed batches, and undoes it on demand.
//!
//! - [`IntegrityManager`]: checkpoints, checksums, batch validation.
//! - [`MigrationEngine`]: the per-user job state machine and worker pool.
//! - [`RollbackManager`]: checksum-verified restoration of committed batches.

pub mod engine;
pub mod integrity;
pub mod rollback;

mod restore;

pub use engine::{MigrationEngine, MigrationRequest};
pub use integrity::IntegrityManager;
pub use rollback::RollbackManager;
