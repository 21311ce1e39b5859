use serde::{Deserialize, Serialize};

use super::defaults;

/// Monitoring subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Number of events retained by the ring buffer.
    pub capacity: usize,
    /// Failure rate (0.0–1.0) above which a job raises an alert.
    pub failure_rate_threshold: f64,
    /// Number of trailing batches the failure rate is computed over.
    pub failure_window_batches: usize,
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub log_level: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::DEFAULT_MONITORING_CAPACITY,
            failure_rate_threshold: defaults::DEFAULT_FAILURE_RATE_THRESHOLD,
            failure_window_batches: defaults::DEFAULT_FAILURE_WINDOW_BATCHES,
            log_level: defaults::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}
