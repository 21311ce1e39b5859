//! Checkpoints, checksums, and batch validation.

mod checksum;
mod manager;
mod validation;

pub use checksum::{checksum_of, compute_checksum};
pub use manager::IntegrityManager;
pub use validation::{sample_indices, validate_batch, BatchCounts, BatchProposal, Recompute, StrictSettings};
