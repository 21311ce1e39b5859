//! # stride-runtime
//!
//! Owns one instance of every Stride subsystem, built from a single
//! [`StrideConfig`]. This is the surface an admin tool talks to.

mod runtime;

pub use runtime::{RuntimeOptions, StrideRuntime};
pub use stride_core::StrideConfig;
