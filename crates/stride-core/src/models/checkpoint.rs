use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::load_record::{EnhancedFields, LoadRecord, UserId};

/// Two-phase state of a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointState {
    /// Persisted before write-back; the batch may be partially applied.
    Prepared,
    /// Write-back finished and the job advanced past this batch.
    Committed,
    /// Batch never committed; the checkpoint is kept for audit only.
    Abandoned,
    /// Payload restored by a rollback.
    RolledBack,
    /// Job is terminal and the checkpoint is retained read-only.
    Archived,
}

impl CheckpointState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepared => "prepared",
            Self::Committed => "committed",
            Self::Abandoned => "abandoned",
            Self::RolledBack => "rolled_back",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "prepared" => Some(Self::Prepared),
            "committed" => Some(Self::Committed),
            "abandoned" => Some(Self::Abandoned),
            "rolled_back" => Some(Self::RolledBack),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Pre-mutation value of one record's write-back fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreEntry {
    pub date: NaiveDate,
    pub fields: Option<EnhancedFields>,
}

/// Tamper-detectable snapshot of a batch taken before it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_id: String,
    pub migration_id: String,
    pub user_id: UserId,
    pub batch_index: u32,
    pub timestamp: DateTime<Utc>,
    /// Full records of the batch, ordered by date.
    pub data_snapshot: Vec<LoadRecord>,
    /// Hex BLAKE3 digest of the snapshot and payload.
    pub checksum: String,
    /// Values to write back to undo the batch, ordered by date.
    pub rollback_payload: Vec<RestoreEntry>,
    pub state: CheckpointState,
}

impl Checkpoint {
    pub fn record_count(&self) -> usize {
        self.rollback_payload.len()
    }
}
