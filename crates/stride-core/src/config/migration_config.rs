use serde::{Deserialize, Serialize};

use super::defaults;

/// Migration subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Batch size used when a caller does not pick one.
    pub default_batch_size: usize,
    /// Wall-clock budget for a single batch before the job is failed.
    pub batch_time_budget_ms: u64,
    /// Maximum number of jobs executed in parallel.
    pub worker_pool_size: usize,
    /// Records recomputed per batch under `Strict` validation.
    pub strict_sample_size: usize,
    /// Absolute tolerance when comparing recomputed values.
    pub validation_tolerance: f64,
    /// Estimated restore cost per record, used by rollback plans.
    pub rollback_cost_per_record_ms: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            default_batch_size: defaults::DEFAULT_BATCH_SIZE,
            batch_time_budget_ms: defaults::DEFAULT_BATCH_TIME_BUDGET_MS,
            worker_pool_size: defaults::DEFAULT_WORKER_POOL_SIZE,
            strict_sample_size: defaults::DEFAULT_STRICT_SAMPLE_SIZE,
            validation_tolerance: defaults::DEFAULT_VALIDATION_TOLERANCE,
            rollback_cost_per_record_ms: defaults::DEFAULT_ROLLBACK_COST_PER_RECORD_MS,
        }
    }
}
