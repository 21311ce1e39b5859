//! Rollback plan construction.

use std::time::Duration;

use stride_core::models::{Checkpoint, CheckpointState, RiskLevel, RollbackOperation, RollbackScope};

/// Plans restoring more records than this are `High` risk.
pub const HIGH_RISK_RECORDS: usize = 10_000;

/// Plans restoring more records than this, or spanning several migrations,
/// are at least `Medium` risk.
pub const MEDIUM_RISK_RECORDS: usize = 1_000;

/// Risk of undoing `migrations` migrations touching `records` records.
pub fn assess_risk(scope: &RollbackScope, records: usize, migrations: usize) -> RiskLevel {
    if matches!(scope, RollbackScope::FullSystem) || records > HIGH_RISK_RECORDS {
        RiskLevel::High
    } else if records > MEDIUM_RISK_RECORDS || migrations > 1 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Linear estimate of restore time.
pub fn estimate_duration(records: usize, cost_per_record_ms: u64) -> Duration {
    Duration::from_millis(cost_per_record_ms.saturating_mul(records as u64))
}

/// Operations for the committed checkpoints among `checkpoints`, newest first.
pub fn operations(checkpoints: &[Checkpoint]) -> Vec<RollbackOperation> {
    let mut ops: Vec<RollbackOperation> = checkpoints
        .iter()
        .filter(|cp| cp.state == CheckpointState::Committed)
        .map(|cp| RollbackOperation {
            checkpoint_id: cp.checkpoint_id.clone(),
            migration_id: cp.migration_id.clone(),
            user_id: cp.user_id,
            batch_index: cp.batch_index,
            record_count: cp.record_count(),
            checkpoint_timestamp: cp.timestamp,
        })
        .collect();
    sort_newest_first(&mut ops);
    ops
}

/// Order operations so later batches are restored before earlier ones.
pub fn sort_newest_first(ops: &mut [RollbackOperation]) {
    ops.sort_by(|a, b| {
        b.checkpoint_timestamp
            .cmp(&a.checkpoint_timestamp)
            .then_with(|| b.batch_index.cmp(&a.batch_index))
            .then_with(|| a.migration_id.cmp(&b.migration_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_grows_with_scope_and_volume() {
        let one = RollbackScope::Migration("m".into());
        assert_eq!(assess_risk(&one, 10, 1), RiskLevel::Low);
        assert_eq!(assess_risk(&one, 1_001, 1), RiskLevel::Medium);
        assert_eq!(assess_risk(&RollbackScope::UserMigration(3), 10, 2), RiskLevel::Medium);
        assert_eq!(assess_risk(&one, 10_001, 1), RiskLevel::High);
        assert_eq!(assess_risk(&RollbackScope::FullSystem, 0, 0), RiskLevel::High);
    }

    #[test]
    fn duration_scales_per_record() {
        assert_eq!(estimate_duration(250, 4), Duration::from_millis(1_000));
        assert_eq!(estimate_duration(0, 4), Duration::ZERO);
    }
}
