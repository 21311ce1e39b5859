use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calculation::MethodKind;
use super::configuration::ConfigurationId;

/// Identifier of an athlete (and of the admins acting on their data).
pub type UserId = i64;

/// One day of training load for one user, owned by the activity store.
///
/// The core only ever writes `enhanced`; everything else is read-only input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRecord {
    pub user_id: UserId,
    pub date: NaiveDate,
    /// External load for the day.
    pub acute_load: f64,
    /// Internal load index for the day (e.g. TRIMP), when the device reports one.
    pub acute_stress: Option<f64>,
    /// Outputs written back by a calculation. `None` until first computed.
    pub enhanced: Option<EnhancedFields>,
}

impl LoadRecord {
    /// A record with no stress and no enhanced fields.
    pub fn new(user_id: UserId, date: NaiveDate, acute_load: f64) -> Self {
        Self {
            user_id,
            date,
            acute_load,
            acute_stress: None,
            enhanced: None,
        }
    }

    /// Set the acute stress value.
    pub fn with_stress(mut self, acute_stress: f64) -> Self {
        self.acute_stress = Some(acute_stress);
        self
    }
}

/// Derived fields written back to a [`LoadRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedFields {
    pub chronic_load: f64,
    pub chronic_stress: Option<f64>,
    pub acwr_ratio: f64,
    pub stress_ratio: Option<f64>,
    /// Signed divergence between `acwr_ratio` and `stress_ratio`.
    pub divergence: Option<f64>,
    pub calculation_method: MethodKind,
    pub configuration_id: Option<ConfigurationId>,
}

/// Which daily series an aggregate is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMetric {
    /// `acute_load` (external load).
    Load,
    /// `acute_stress` (internal load).
    Stress,
}

impl LoadMetric {
    /// Value of this metric on a record, if present.
    pub fn value(self, record: &LoadRecord) -> Option<f64> {
        match self {
            Self::Load => Some(record.acute_load),
            Self::Stress => record.acute_stress,
        }
    }
}

/// Inclusive date range. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Every date.
    pub fn all() -> Self {
        Self::default()
    }

    /// Inclusive range from `from` to `to`.
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// Everything up to and including `to`.
    pub fn until(to: NaiveDate) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }

    /// Whether `date` falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}
