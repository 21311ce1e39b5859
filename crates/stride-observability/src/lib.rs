//! # stride-observability
//!
//! In-memory monitoring for migrations and rollbacks: a fixed-capacity ring
//! of [`MonitoringEvent`]s, failure-rate alerting, and the `tracing`
//! subscriber setup shared by every Stride binary.
//!
//! [`MonitoringEvent`]: stride_core::models::MonitoringEvent

pub mod alerting;
pub mod ring;
pub mod sink;
pub mod statistics;
pub mod tracing_setup;

pub use alerting::FailureRateTracker;
pub use ring::RingBuffer;
pub use sink::MonitoringSink;
pub use statistics::MonitoringStatistics;
