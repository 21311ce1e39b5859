//! TOML-backed configuration. Every section falls back to its defaults, so an
//! empty document is a valid configuration.

pub mod calculation_config;
pub mod defaults;
pub mod feature_gate_config;
pub mod migration_config;
pub mod monitoring_config;
pub mod storage_config;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use calculation_config::CalculationConfig;
pub use feature_gate_config::FeatureGateConfig;
pub use migration_config::MigrationConfig;
pub use monitoring_config::MonitoringConfig;
pub use storage_config::StorageConfig;

use crate::errors::{StrideError, StrideResult};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrideConfig {
    pub storage: StorageConfig,
    pub calculation: CalculationConfig,
    pub migration: MigrationConfig,
    pub monitoring: MonitoringConfig,
    pub feature_gate: FeatureGateConfig,
}

impl StrideConfig {
    /// Parse a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: &Path) -> StrideResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StrideError::ConfigError(format!("{}: {e}", path.display())))?;
        let config =
            Self::from_toml(&raw).map_err(|e| StrideError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engines cannot operate with.
    pub fn validate(&self) -> StrideResult<()> {
        let err = |msg: String| Err(StrideError::ConfigError(msg));

        if self.calculation.acute_window_days == 0 {
            return err("calculation.acute_window_days must be at least 1".into());
        }
        if self.calculation.standard_chronic_period_days == 0 {
            return err("calculation.standard_chronic_period_days must be at least 1".into());
        }
        if self.migration.default_batch_size == 0
            || self.migration.default_batch_size > crate::constants::MAX_MIGRATION_BATCH_SIZE
        {
            return err(format!(
                "migration.default_batch_size must be between 1 and {}, got {}",
                crate::constants::MAX_MIGRATION_BATCH_SIZE,
                self.migration.default_batch_size
            ));
        }
        if self.migration.worker_pool_size == 0 {
            return err("migration.worker_pool_size must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.monitoring.failure_rate_threshold) {
            return err(format!(
                "monitoring.failure_rate_threshold must be between 0.0 and 1.0, got {}",
                self.monitoring.failure_rate_threshold
            ));
        }
        if self.monitoring.capacity == 0
            || self.monitoring.capacity > crate::constants::MAX_MONITORING_CAPACITY
        {
            return err(format!(
                "monitoring.capacity must be between 1 and {}, got {}",
                crate::constants::MAX_MONITORING_CAPACITY,
                self.monitoring.capacity
            ));
        }
        if self.monitoring.failure_window_batches == 0 {
            return err("monitoring.failure_window_batches must be at least 1".into());
        }
        Ok(())
    }
}
