mod activity_store;
mod configuration_storage;
mod feature_gate;
mod migration_storage;

pub use activity_store::IActivityLoadStore;
pub use configuration_storage::IConfigurationStorage;
pub use feature_gate::IFeatureGate;
pub use migration_storage::IMigrationStorage;
