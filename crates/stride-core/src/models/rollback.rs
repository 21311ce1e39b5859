use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::load_record::UserId;

/// What a rollback restores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "target", rename_all = "snake_case")]
pub enum RollbackScope {
    /// Every rollback-eligible migration of one user.
    UserMigration(UserId),
    /// A single migration job.
    Migration(String),
    /// Every rollback-eligible migration in the system.
    FullSystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Restoration of one checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackOperation {
    pub checkpoint_id: String,
    pub migration_id: String,
    pub user_id: UserId,
    pub batch_index: u32,
    pub record_count: usize,
    pub checkpoint_timestamp: DateTime<Utc>,
}

/// Ordered (newest first) set of checkpoint restorations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackPlan {
    pub scope: RollbackScope,
    pub reason: String,
    pub ops: Vec<RollbackOperation>,
    pub estimated_duration: Duration,
    pub risk: RiskLevel,
    pub created_at: DateTime<Utc>,
}

impl RollbackPlan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.ops.iter().map(|op| op.record_count).sum()
    }

    /// Distinct migrations touched, in plan order.
    pub fn migration_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for op in &self.ops {
            if !ids.contains(&op.migration_id) {
                ids.push(op.migration_id.clone());
            }
        }
        ids
    }
}

/// Outcome of a successful rollback. Aborted rollbacks surface as
/// `MigrationError::ChecksumMismatch` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackResult {
    pub scope: RollbackScope,
    pub checkpoints_restored: usize,
    pub records_restored: usize,
    pub migrations_rolled_back: Vec<String>,
    pub duration: Duration,
}

impl RollbackResult {
    /// One-line description for confirmations and logs.
    pub fn summary(&self) -> String {
        format!(
            "rolled back successfully: {} records from {} checkpoints across {} migrations",
            self.records_restored,
            self.checkpoints_restored,
            self.migrations_rolled_back.len()
        )
    }
}
