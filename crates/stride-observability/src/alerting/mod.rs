//! Failure-rate alerting over a trailing window of batches.

pub mod failure_rate;

pub use failure_rate::{BatchOutcome, FailureRateTracker};
