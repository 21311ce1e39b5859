use chrono::NaiveDate;
use stride_core::models::{LoadMetric, LoadRecord};

/// Age of `date` in whole days relative to `reference_date`. Negative for
/// future dates.
pub(crate) fn age_days(reference_date: NaiveDate, date: NaiveDate) -> i64 {
    (reference_date - date).num_days()
}

/// Values of `metric` for records aged `0..window_days` days.
pub(crate) fn trailing_values(
    records: &[LoadRecord],
    reference_date: NaiveDate,
    window_days: u32,
    metric: LoadMetric,
) -> impl Iterator<Item = (i64, f64)> + '_ {
    records.iter().filter_map(move |record| {
        let age = age_days(reference_date, record.date);
        if age < 0 || age >= i64::from(window_days) {
            return None;
        }
        metric.value(record).map(|value| (age, value))
    })
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Arithmetic mean of `metric` over the trailing `window_days`, inclusive of
/// `reference_date`. An empty window yields `0.0`.
pub fn acute_average(
    records: &[LoadRecord],
    reference_date: NaiveDate,
    window_days: u32,
    metric: LoadMetric,
) -> f64 {
    mean(trailing_values(records, reference_date, window_days, metric).map(|(_, v)| v))
}

/// Plain arithmetic mean over the chronic window (standard method).
///
/// Kept separate from the decayed average so the standard numbers can be
/// audited without reasoning about weights.
pub fn chronic_average_standard(
    records: &[LoadRecord],
    reference_date: NaiveDate,
    period_days: u32,
    metric: LoadMetric,
) -> f64 {
    mean(trailing_values(records, reference_date, period_days, metric).map(|(_, v)| v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    #[test]
    fn future_records_are_ignored() {
        let records = vec![LoadRecord::new(1, day(10), 5.0), LoadRecord::new(1, day(11), 500.0)];
        assert_eq!(acute_average(&records, day(10), 7, LoadMetric::Load), 5.0);
    }

    #[test]
    fn window_excludes_day_at_window_length() {
        // Age 7 is outside a 7-day window.
        let records = vec![LoadRecord::new(1, day(3), 100.0), LoadRecord::new(1, day(10), 10.0)];
        assert_eq!(acute_average(&records, day(10), 7, LoadMetric::Load), 10.0);
    }
}
