use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::load_record::UserId;
use crate::constants::{
    MAX_CHRONIC_PERIOD_DAYS, MAX_DECAY_RATE, MIN_CHRONIC_PERIOD_DAYS, MIN_DECAY_RATE,
};
use crate::errors::ConfigurationError;

pub type ConfigurationId = i64;

/// Per-user calculation parameters for the enhanced method.
///
/// Immutable once stored: revisions create a new id that `supersedes` this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub id: ConfigurationId,
    pub name: String,
    pub chronic_period_days: u32,
    pub decay_rate: f64,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub supersedes: Option<ConfigurationId>,
}

/// A configuration that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConfiguration {
    pub name: String,
    pub chronic_period_days: u32,
    pub decay_rate: f64,
    pub notes: Option<String>,
    pub created_by: Option<UserId>,
    pub supersedes: Option<ConfigurationId>,
}

impl NewConfiguration {
    /// Check every invariant; the first violation wins.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::InvalidName);
        }
        validate_chronic_period_days(self.chronic_period_days)?;
        validate_decay_rate(self.decay_rate)?;
        Ok(())
    }
}

/// `28 <= days <= 90`.
pub fn validate_chronic_period_days(days: u32) -> Result<(), ConfigurationError> {
    if (MIN_CHRONIC_PERIOD_DAYS..=MAX_CHRONIC_PERIOD_DAYS).contains(&days) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidRange {
            field: "chronic_period_days".to_string(),
            min: MIN_CHRONIC_PERIOD_DAYS.to_string(),
            max: MAX_CHRONIC_PERIOD_DAYS.to_string(),
            value: days.to_string(),
        })
    }
}

/// `0.01 <= rate <= 0.20`. NaN is out of range.
pub fn validate_decay_rate(rate: f64) -> Result<(), ConfigurationError> {
    if (MIN_DECAY_RATE..=MAX_DECAY_RATE).contains(&rate) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidRange {
            field: "decay_rate".to_string(),
            min: MIN_DECAY_RATE.to_string(),
            max: MAX_DECAY_RATE.to_string(),
            value: rate.to_string(),
        })
    }
}
