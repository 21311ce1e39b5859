use serde::{Deserialize, Serialize};

use super::defaults;

/// Static rollout of the enhanced calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureGateConfig {
    /// Enable the enhanced method for every user.
    pub enhanced_for_all: bool,
    /// Users with the enhanced method enabled when `enhanced_for_all` is off.
    pub enhanced_users: Vec<i64>,
}

impl Default for FeatureGateConfig {
    fn default() -> Self {
        Self {
            enhanced_for_all: defaults::DEFAULT_ENHANCED_ENABLED_FOR_ALL,
            enhanced_users: Vec::new(),
        }
    }
}
