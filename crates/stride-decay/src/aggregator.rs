use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stride_core::constants::ACUTE_WINDOW_DAYS;
use stride_core::models::{Configuration, LoadMetric, LoadRecord};

use crate::{ratio, weights, window};

/// How the chronic average is computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChronicMode {
    /// Decay-weighted mean.
    Decayed { period_days: u32, decay_rate: f64 },
    /// Uniform mean.
    Standard { period_days: u32 },
}

impl ChronicMode {
    /// Aggregator using a stored configuration's period and rate.
    pub fn from_configuration(config: &Configuration) -> Self {
        Self::Decayed {
            period_days: config.chronic_period_days,
            decay_rate: config.decay_rate,
        }
    }

    pub fn period_days(&self) -> u32 {
        match *self {
            Self::Decayed { period_days, .. } | Self::Standard { period_days } => period_days,
        }
    }
}

/// Acute, chronic, and ratio of one metric at one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub acute: f64,
    pub chronic: f64,
    pub ratio: f64,
    /// Records of this metric inside the chronic window.
    pub samples: usize,
}

/// Bundles the acute window with the aggregate functions.
#[derive(Debug, Clone, Copy)]
pub struct DecayAggregator {
    acute_window_days: u32,
}

impl DecayAggregator {
    pub fn new() -> Self {
        Self {
            acute_window_days: ACUTE_WINDOW_DAYS,
        }
    }

    /// Acute aggregation over the last `acute_window_days` days.
    pub fn with_acute_window(acute_window_days: u32) -> Self {
        Self { acute_window_days }
    }

    pub fn acute_window_days(&self) -> u32 {
        self.acute_window_days
    }

    /// Compute the window snapshot of `metric` at `reference_date`.
    pub fn snapshot(
        &self,
        records: &[LoadRecord],
        reference_date: NaiveDate,
        mode: ChronicMode,
        metric: LoadMetric,
    ) -> WindowSnapshot {
        let acute = window::acute_average(records, reference_date, self.acute_window_days, metric);
        let chronic = match mode {
            ChronicMode::Decayed {
                period_days,
                decay_rate,
            } => weights::chronic_average_decayed(
                records,
                reference_date,
                period_days,
                decay_rate,
                metric,
            ),
            ChronicMode::Standard { period_days } => {
                window::chronic_average_standard(records, reference_date, period_days, metric)
            }
        };
        let samples =
            window::trailing_values(records, reference_date, mode.period_days(), metric).count();

        WindowSnapshot {
            acute,
            chronic,
            ratio: ratio::ratio(acute, chronic),
            samples,
        }
    }
}

impl Default for DecayAggregator {
    fn default() -> Self {
        Self::new()
    }
}
