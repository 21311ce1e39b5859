//! Checkpoint persistence and the two-phase commit of a batch.

use rusqlite::{params, Connection, OptionalExtension, Row};

use stride_core::errors::{MigrationError, StrideResult};
use stride_core::models::{Checkpoint, CheckpointState, MigrationJob};

use super::{decode_ts, encode_ts, job_ops};
use crate::to_storage_err;

const COLUMNS: &str = "checkpoint_id, migration_id, user_id, batch_index, timestamp,
    data_snapshot, checksum, rollback_payload, state";

struct CheckpointRow {
    checkpoint_id: String,
    migration_id: String,
    user_id: i64,
    batch_index: u32,
    timestamp: String,
    data_snapshot: String,
    checksum: String,
    rollback_payload: String,
    state: String,
}

impl CheckpointRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            checkpoint_id: row.get(0)?,
            migration_id: row.get(1)?,
            user_id: row.get(2)?,
            batch_index: row.get(3)?,
            timestamp: row.get(4)?,
            data_snapshot: row.get(5)?,
            checksum: row.get(6)?,
            rollback_payload: row.get(7)?,
            state: row.get(8)?,
        })
    }

    fn into_checkpoint(self) -> StrideResult<Checkpoint> {
        let state = CheckpointState::parse(&self.state)
            .ok_or_else(|| to_storage_err(format!("unknown checkpoint state {:?}", self.state)))?;
        Ok(Checkpoint {
            checkpoint_id: self.checkpoint_id,
            migration_id: self.migration_id,
            user_id: self.user_id,
            batch_index: self.batch_index,
            timestamp: decode_ts(&self.timestamp)?,
            data_snapshot: serde_json::from_str(&self.data_snapshot)?,
            checksum: self.checksum,
            rollback_payload: serde_json::from_str(&self.rollback_payload)?,
            state,
        })
    }
}

/// Insert a checkpoint with its snapshot serialized as JSON.
pub fn insert_checkpoint(conn: &Connection, checkpoint: &Checkpoint) -> StrideResult<()> {
    let snapshot = serde_json::to_string(&checkpoint.data_snapshot)?;
    let payload = serde_json::to_string(&checkpoint.rollback_payload)?;
    conn.execute(
        "INSERT INTO migration_checkpoints (
            checkpoint_id, migration_id, user_id, batch_index, timestamp,
            data_snapshot, checksum, rollback_payload, state
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            checkpoint.checkpoint_id,
            checkpoint.migration_id,
            checkpoint.user_id,
            checkpoint.batch_index,
            encode_ts(&checkpoint.timestamp),
            snapshot,
            checkpoint.checksum,
            payload,
            checkpoint.state.as_str(),
        ],
    )
    .map_err(|e| to_storage_err(format!("insert_checkpoint: {e}")))?;
    Ok(())
}

/// A checkpoint by id.
pub fn get_checkpoint(conn: &Connection, checkpoint_id: &str) -> StrideResult<Option<Checkpoint>> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM migration_checkpoints WHERE checkpoint_id = ?1"),
            params![checkpoint_id],
            CheckpointRow::read,
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    row.map(CheckpointRow::into_checkpoint).transpose()
}

/// Checkpoints ordered by batch index, then timestamp.
pub fn checkpoints_for_migration(conn: &Connection, migration_id: &str) -> StrideResult<Vec<Checkpoint>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM migration_checkpoints
             WHERE migration_id = ?1
             ORDER BY batch_index, timestamp"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![migration_id], CheckpointRow::read)
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut checkpoints = Vec::new();
    for row in rows {
        checkpoints.push(row.map_err(|e| to_storage_err(e.to_string()))?.into_checkpoint()?);
    }
    Ok(checkpoints)
}

/// Move a checkpoint to `state`.
pub fn set_checkpoint_state(
    conn: &Connection,
    checkpoint_id: &str,
    state: CheckpointState,
) -> StrideResult<()> {
    let updated = conn
        .execute(
            "UPDATE migration_checkpoints SET state = ?2 WHERE checkpoint_id = ?1",
            params![checkpoint_id, state.as_str()],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if updated == 0 {
        return Err(MigrationError::CheckpointNotFound {
            checkpoint_id: checkpoint_id.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Mark the checkpoint committed and persist the advanced job atomically.
pub fn commit_batch(conn: &Connection, checkpoint_id: &str, job: &MigrationJob) -> StrideResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("commit_batch begin: {e}")))?;

    let result = set_checkpoint_state(&tx, checkpoint_id, CheckpointState::Committed)
        .and_then(|()| job_ops::update_job(&tx, job));
    match result {
        Ok(()) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("commit_batch commit: {e}")))?;
            Ok(())
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Committed checkpoints of a migration become read-only archive rows.
pub fn archive_checkpoints(conn: &Connection, migration_id: &str) -> StrideResult<usize> {
    conn.execute(
        "UPDATE migration_checkpoints SET state = 'archived'
         WHERE migration_id = ?1 AND state = 'committed'",
        params![migration_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
