//! Content checksums for checkpoints.

use stride_core::errors::StrideResult;
use stride_core::models::{Checkpoint, LoadRecord, RestoreEntry, UserId};

/// Hex BLAKE3 digest binding a checkpoint's identity to its snapshot and
/// rollback payload. Timestamps and state are excluded so the digest
/// survives state transitions and storage round-trips.
pub fn compute_checksum(
    checkpoint_id: &str,
    migration_id: &str,
    user_id: UserId,
    batch_index: u32,
    snapshot: &[LoadRecord],
    payload: &[RestoreEntry],
) -> StrideResult<String> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(checkpoint_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(migration_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(&user_id.to_le_bytes());
    hasher.update(&batch_index.to_le_bytes());
    hasher.update(&serde_json::to_vec(snapshot)?);
    hasher.update(&[0]);
    hasher.update(&serde_json::to_vec(payload)?);
    Ok(hasher.finalize().to_hex().to_string())
}

/// Recompute the digest of a stored checkpoint.
pub fn checksum_of(checkpoint: &Checkpoint) -> StrideResult<String> {
    compute_checksum(
        &checkpoint.checkpoint_id,
        &checkpoint.migration_id,
        checkpoint.user_id,
        checkpoint.batch_index,
        &checkpoint.data_snapshot,
        &checkpoint.rollback_payload,
    )
}
