//! # stride-core
//!
//! Foundation crate for the Stride training-load system.
//! Defines all types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::StrideConfig;
pub use errors::{StrideError, StrideResult};
pub use models::{
    CalculationMethod, CalculationResult, Checkpoint, Configuration, ConfigurationId,
    EnhancedFields, LoadRecord, MigrationJob, MigrationStatus, UserId,
};
