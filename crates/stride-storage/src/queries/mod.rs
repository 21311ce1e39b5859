//! SQL for each table family, plus shared column codecs.

pub mod assignment_ops;
pub mod checkpoint_ops;
pub mod config_ops;
pub mod job_ops;
pub mod load_record_ops;
pub mod maintenance;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use stride_core::errors::StrideResult;

use crate::to_storage_err;

/// Fixed-width RFC 3339 so lexical order equals chronological order.
pub(crate) fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_ts(raw: &str) -> StrideResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| to_storage_err(format!("bad timestamp {raw:?}: {e}")))
}

pub(crate) fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn decode_date(raw: &str) -> StrideResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| to_storage_err(format!("bad date {raw:?}: {e}")))
}
