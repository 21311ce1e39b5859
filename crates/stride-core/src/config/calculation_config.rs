use serde::{Deserialize, Serialize};

use super::defaults;

/// Calculation subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationConfig {
    /// Trailing window of the acute average, in days.
    pub acute_window_days: u32,
    /// Chronic window used by the standard method, in days.
    pub standard_chronic_period_days: u32,
    /// Feature name checked against the feature gate.
    pub enhanced_feature: String,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            acute_window_days: defaults::DEFAULT_ACUTE_WINDOW_DAYS,
            standard_chronic_period_days: defaults::DEFAULT_STANDARD_CHRONIC_PERIOD_DAYS,
            enhanced_feature: defaults::DEFAULT_ENHANCED_FEATURE.to_string(),
        }
    }
}
