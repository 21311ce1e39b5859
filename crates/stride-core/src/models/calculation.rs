use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::configuration::{Configuration, ConfigurationId};
use super::load_record::{EnhancedFields, UserId};

/// Why a calculation fell back to the standard method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Enhanced method enabled but no configuration assigned.
    NoConfiguration,
    /// The configuration lookup itself failed.
    ConfigurationUnavailable,
    /// The input could not be aggregated with the enhanced method.
    CalculationFailure,
}

impl FallbackReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoConfiguration => "no_configuration",
            Self::ConfigurationUnavailable => "configuration_unavailable",
            Self::CalculationFailure => "calculation_failure",
        }
    }
}

/// Calculation method resolved once per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CalculationMethod {
    /// Decay-weighted chronic average with the given parameters.
    Enhanced(Configuration),
    /// Plain 28-day chronic mean.
    Standard,
    /// Standard numbers produced because the enhanced path was unavailable.
    Fallback(FallbackReason),
}

impl CalculationMethod {
    pub fn kind(&self) -> MethodKind {
        match self {
            Self::Enhanced(_) => MethodKind::Enhanced,
            Self::Standard => MethodKind::Standard,
            Self::Fallback(_) => MethodKind::Fallback,
        }
    }

    pub fn configuration_id(&self) -> Option<ConfigurationId> {
        match self {
            Self::Enhanced(config) => Some(config.id),
            _ => None,
        }
    }

    /// Human-readable tag, e.g. `fallback:no_configuration`.
    pub fn label(&self) -> String {
        match self {
            Self::Enhanced(config) => format!("enhanced:{}", config.id),
            Self::Standard => "standard".to_string(),
            Self::Fallback(reason) => format!("fallback:{}", reason.as_str()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Flat method tag persisted with write-back fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Enhanced,
    Standard,
    Fallback,
}

impl MethodKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enhanced => "enhanced",
            Self::Standard => "standard",
            Self::Fallback => "fallback",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "enhanced" => Some(Self::Enhanced),
            "standard" => Some(Self::Standard),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }
}

/// Uniform output of a single-date calculation, whichever method produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub user_id: UserId,
    pub reference_date: NaiveDate,
    pub acute: f64,
    pub chronic: f64,
    pub ratio: f64,
    pub acute_stress: Option<f64>,
    pub chronic_stress: Option<f64>,
    pub stress_ratio: Option<f64>,
    /// `None` when no stress data exists in the windows.
    pub divergence: Option<f64>,
    pub method: CalculationMethod,
}

impl CalculationResult {
    /// Shape written back to the activity store.
    pub fn to_enhanced_fields(&self) -> EnhancedFields {
        EnhancedFields {
            chronic_load: self.chronic,
            chronic_stress: self.chronic_stress,
            acwr_ratio: self.ratio,
            stress_ratio: self.stress_ratio,
            divergence: self.divergence,
            calculation_method: self.method.kind(),
            configuration_id: self.method.configuration_id(),
        }
    }
}
