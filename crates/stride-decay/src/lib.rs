//! # stride-decay
//!
//! Pure numeric core of the ACWR calculation.
//! Acute window mean, exponentially decay-weighted chronic mean, the plain
//! chronic mean used by the standard method, a NaN-free ratio, and the one
//! divergence formula every other crate delegates to.

pub mod aggregator;
pub mod divergence;
pub mod ratio;
pub mod weights;
pub mod window;

pub use aggregator::{ChronicMode, DecayAggregator, WindowSnapshot};
pub use divergence::canonical_divergence;
pub use ratio::ratio;
pub use weights::{chronic_average_decayed, decay_weight, effective_window_weight};
pub use window::{acute_average, chronic_average_standard};
