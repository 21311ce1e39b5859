//! In-process feature gate driven by [`FeatureGateConfig`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use stride_core::config::{CalculationConfig, FeatureGateConfig};
use stride_core::models::UserId;
use stride_core::traits::IFeatureGate;

/// Gates one feature by a global switch plus a per-user allow list.
#[derive(Debug)]
pub struct StaticFeatureGate {
    feature: String,
    enabled_for_all: AtomicBool,
    users: RwLock<HashSet<UserId>>,
}

impl StaticFeatureGate {
    /// Gate for `feature`, seeded from configuration.
    pub fn new(feature: impl Into<String>, config: &FeatureGateConfig) -> Self {
        Self {
            feature: feature.into(),
            enabled_for_all: AtomicBool::new(config.enhanced_for_all),
            users: RwLock::new(config.enhanced_users.iter().copied().collect()),
        }
    }

    /// Gate for the enhanced-calculation feature named in `calculation`.
    pub fn from_config(calculation: &CalculationConfig, gate: &FeatureGateConfig) -> Self {
        Self::new(calculation.enhanced_feature.clone(), gate)
    }

    /// Switch the feature on or off for every user.
    pub fn set_enabled_for_all(&self, enabled: bool) {
        self.enabled_for_all.store(enabled, Ordering::SeqCst);
    }

    /// Add or remove a user from the enabled list.
    pub fn set_user(&self, user_id: UserId, enabled: bool) {
        let mut users = self.users.write().unwrap_or_else(|p| p.into_inner());
        if enabled {
            users.insert(user_id);
        } else {
            users.remove(&user_id);
        }
    }
}

impl IFeatureGate for StaticFeatureGate {
    fn enabled(&self, feature_name: &str, user_id: UserId) -> bool {
        if feature_name != self.feature {
            return false;
        }
        self.enabled_for_all.load(Ordering::SeqCst)
            || self
                .users
                .read()
                .unwrap_or_else(|p| p.into_inner())
                .contains(&user_id)
    }
}
