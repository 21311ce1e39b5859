//! Input checks for the enhanced path and cleanup for the standard one.

use std::collections::HashSet;

use stride_core::errors::{StrideError, StrideResult};
use stride_core::models::LoadRecord;

fn valid_value(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Reject non-finite or negative loads and duplicate dates.
pub fn validate_records(records: &[LoadRecord]) -> StrideResult<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !valid_value(record.acute_load) {
            return Err(StrideError::CalculationFailure {
                reason: format!("invalid acute_load {} on {}", record.acute_load, record.date),
            });
        }
        if let Some(stress) = record.acute_stress {
            if !valid_value(stress) {
                return Err(StrideError::CalculationFailure {
                    reason: format!("invalid acute_stress {stress} on {}", record.date),
                });
            }
        }
        if !seen.insert(record.date) {
            return Err(StrideError::CalculationFailure {
                reason: format!("duplicate record for {}", record.date),
            });
        }
    }
    Ok(())
}

/// Drop records with unusable load, clear unusable stress values, and keep
/// only the first record per date.
pub fn sanitize_records(records: &[LoadRecord]) -> Vec<LoadRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .filter(|r| valid_value(r.acute_load) && seen.insert(r.date))
        .map(|r| {
            let mut clean = r.clone();
            clean.acute_stress = r.acute_stress.filter(|s| valid_value(*s));
            clean
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn record(day: u32, load: f64) -> LoadRecord {
        LoadRecord::new(1, NaiveDate::from_ymd_opt(2024, 5, day).unwrap(), load)
    }

    #[test]
    fn rejects_nan_negative_and_duplicates() {
        assert!(validate_records(&[record(1, f64::NAN)]).is_err());
        assert!(validate_records(&[record(1, -1.0)]).is_err());
        assert!(validate_records(&[record(1, f64::INFINITY)]).is_err());
        assert!(validate_records(&[record(1, 1.0), record(1, 2.0)]).is_err());
        assert!(validate_records(&[record(1, 1.0).with_stress(f64::NAN)]).is_err());
        assert!(validate_records(&[record(1, 0.0), record(2, 3.0)]).is_ok());
    }

    #[test]
    fn sanitize_keeps_first_valid_per_date() {
        let clean = sanitize_records(&[
            record(1, f64::NAN),
            record(1, 4.0),
            record(1, 5.0),
            record(2, 6.0).with_stress(-2.0),
        ]);
        assert_eq!(clean.len(), 2);
        assert_eq!(clean[0].acute_load, 4.0);
        assert_eq!(clean[1].acute_stress, None);
    }
}
