use chrono::NaiveDate;
use stride_core::models::{LoadMetric, LoadRecord};

use crate::window::trailing_values;

/// Weight of a record `age_days` old: `e^(-decay_rate · age)`.
pub fn decay_weight(age_days: u32, decay_rate: f64) -> f64 {
    (-decay_rate * f64::from(age_days)).exp()
}

/// Exponentially decay-weighted mean over the chronic window.
///
/// ```text
/// w(a)    = e^(-decay_rate · a),  0 ≤ a ≤ period_days - 1
/// chronic = Σ w(a)·load(a) / Σ w(a)
/// ```
///
/// Only days with a record contribute; missing days are not treated as zero.
/// An empty window yields `0.0`.
pub fn chronic_average_decayed(
    records: &[LoadRecord],
    reference_date: NaiveDate,
    period_days: u32,
    decay_rate: f64,
    metric: LoadMetric,
) -> f64 {
    let (weighted, total_weight) = trailing_values(records, reference_date, period_days, metric)
        .fold((0.0, 0.0), |(weighted, total), (age, value)| {
            let w = decay_weight(age as u32, decay_rate);
            (weighted + w * value, total + w)
        });

    if total_weight == 0.0 {
        0.0
    } else {
        weighted / total_weight
    }
}

/// Sum of weights of a fully populated window. Useful to judge how much the
/// oldest days still count for a given rate.
pub fn effective_window_weight(period_days: u32, decay_rate: f64) -> f64 {
    (0..period_days).map(|age| decay_weight(age, decay_rate)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_at_age_zero_is_one() {
        assert_eq!(decay_weight(0, 0.2), 1.0);
    }

    #[test]
    fn zero_rate_window_weight_equals_period() {
        assert!((effective_window_weight(28, 0.0) - 28.0).abs() < 1e-12);
    }
}
