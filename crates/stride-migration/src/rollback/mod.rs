//! Checksum-verified restoration of committed migration batches.

mod manager;
pub mod plan;

pub use manager::{RollbackManager, CHECKSUM_MISMATCH_ALERT};
