//! Divergence summaries over stored write-back fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stride_core::models::LoadRecord;
use stride_decay::canonical_divergence;

/// Divergence of one stored day, recomputed from its stored ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyDivergence {
    pub date: NaiveDate,
    pub acwr_ratio: f64,
    pub stress_ratio: f64,
    pub divergence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DivergenceReport {
    pub days: Vec<DailyDivergence>,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// External load running ahead of internal load.
    pub positive_days: usize,
    /// Internal load running ahead of external load.
    pub negative_days: usize,
}

impl DivergenceReport {
    /// Summarize records that carry both stored ratios. Others are skipped.
    pub fn from_records(records: &[LoadRecord]) -> Self {
        let days: Vec<DailyDivergence> = records
            .iter()
            .filter_map(|record| {
                let fields = record.enhanced.as_ref()?;
                let stress_ratio = fields.stress_ratio?;
                Some(DailyDivergence {
                    date: record.date,
                    acwr_ratio: fields.acwr_ratio,
                    stress_ratio,
                    divergence: canonical_divergence(fields.acwr_ratio, stress_ratio),
                })
            })
            .collect();

        if days.is_empty() {
            return Self::default();
        }

        let values = days.iter().map(|d| d.divergence);
        let sum: f64 = values.clone().sum();
        Self {
            mean: Some(sum / days.len() as f64),
            min: values.clone().reduce(f64::min),
            max: values.reduce(f64::max),
            positive_days: days.iter().filter(|d| d.divergence > 0.0).count(),
            negative_days: days.iter().filter(|d| d.divergence < 0.0).count(),
            days,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
