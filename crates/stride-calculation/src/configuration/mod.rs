//! Configuration lifecycle and per-user assignment.

mod store;

pub use store::ConfigurationStore;
