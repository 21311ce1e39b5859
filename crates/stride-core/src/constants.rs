/// Stride system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lower bound (inclusive) for a configuration's chronic period.
pub const MIN_CHRONIC_PERIOD_DAYS: u32 = 28;

/// Upper bound (inclusive) for a configuration's chronic period.
pub const MAX_CHRONIC_PERIOD_DAYS: u32 = 90;

/// Lower bound (inclusive) for a configuration's decay rate.
pub const MIN_DECAY_RATE: f64 = 0.01;

/// Upper bound (inclusive) for a configuration's decay rate.
pub const MAX_DECAY_RATE: f64 = 0.20;

/// Trailing window of the acute average.
pub const ACUTE_WINDOW_DAYS: u32 = 7;

/// Chronic window of the standard (non-decayed) method.
pub const STANDARD_CHRONIC_PERIOD_DAYS: u32 = 28;

/// Feature name checked against the feature gate before using the enhanced method.
pub const FEATURE_ENHANCED_ACWR: &str = "enhanced_acwr_calculation";

/// Maximum batch size accepted by the migration engine.
pub const MAX_MIGRATION_BATCH_SIZE: usize = 1000;

/// Hard cap on monitoring ring buffer capacity.
pub const MAX_MONITORING_CAPACITY: usize = 100_000;
