use crate::models::UserId;

/// Feature-flag capability. The only coupling to the flag subsystem.
pub trait IFeatureGate: Send + Sync {
    fn enabled(&self, feature_name: &str, user_id: UserId) -> bool;
}
