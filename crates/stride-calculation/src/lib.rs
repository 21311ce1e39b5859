//! # stride-calculation
//!
//! Per-user ACWR calculation. [`ConfigurationStore`] owns configuration
//! lifecycle and assignment history; [`CalculationOrchestrator`] resolves
//! the calculation method once per call and never lets an enhanced-path
//! failure reach its caller.

pub mod configuration;
pub mod gate;
pub mod orchestrator;
pub mod report;

pub use configuration::ConfigurationStore;
pub use gate::StaticFeatureGate;
pub use orchestrator::CalculationOrchestrator;
pub use report::DivergenceReport;
