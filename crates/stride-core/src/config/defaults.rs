// Single source of truth for all default values.

// --- Storage ---
pub const DEFAULT_DB_FILENAME: &str = "stride.db";
pub const DEFAULT_READ_POOL_SIZE: usize = 4;
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5_000;

// --- Calculation ---
pub const DEFAULT_ACUTE_WINDOW_DAYS: u32 = crate::constants::ACUTE_WINDOW_DAYS;
pub const DEFAULT_STANDARD_CHRONIC_PERIOD_DAYS: u32 =
    crate::constants::STANDARD_CHRONIC_PERIOD_DAYS;
pub const DEFAULT_ENHANCED_FEATURE: &str = crate::constants::FEATURE_ENHANCED_ACWR;

// --- Migration ---
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_BATCH_TIME_BUDGET_MS: u64 = 30_000;
pub const DEFAULT_WORKER_POOL_SIZE: usize = 4;
pub const DEFAULT_STRICT_SAMPLE_SIZE: usize = 5;
pub const DEFAULT_VALIDATION_TOLERANCE: f64 = 1e-9;
pub const DEFAULT_ROLLBACK_COST_PER_RECORD_MS: u64 = 2;

// --- Monitoring ---
pub const DEFAULT_MONITORING_CAPACITY: usize = 1_000;
pub const DEFAULT_FAILURE_RATE_THRESHOLD: f64 = 0.05;
pub const DEFAULT_FAILURE_WINDOW_BATCHES: usize = 10;
pub const DEFAULT_LOG_LEVEL: &str = "info";

// --- Feature gate ---
pub const DEFAULT_ENHANCED_ENABLED_FOR_ALL: bool = false;
