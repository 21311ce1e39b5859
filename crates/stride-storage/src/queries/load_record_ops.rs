//! Activity load records: range reads, write-back of derived fields, seeding.

use chrono::NaiveDate;
use rusqlite::{params, Connection};

use stride_core::errors::StrideResult;
use stride_core::models::{DateRange, EnhancedFields, LoadRecord, UserId};

use super::{decode_date, encode_date};
use crate::to_storage_err;

/// Records for a user within `range`, ascending by date.
pub fn read_records(conn: &Connection, user_id: UserId, range: DateRange) -> StrideResult<Vec<LoadRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT date, acute_load, acute_stress, enhanced FROM load_records
             WHERE user_id = ?1
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
             ORDER BY date",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(
            params![user_id, range.from.map(encode_date), range.to.map(encode_date)],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut records = Vec::new();
    for row in rows {
        let (date, acute_load, acute_stress, enhanced) =
            row.map_err(|e| to_storage_err(e.to_string()))?;
        let enhanced = enhanced
            .map(|json| serde_json::from_str::<EnhancedFields>(&json))
            .transpose()?;
        records.push(LoadRecord {
            user_id,
            date: decode_date(&date)?,
            acute_load,
            acute_stress,
            enhanced,
        });
    }
    Ok(records)
}

/// Overwrite the derived fields of one record. `None` clears them.
pub fn write_enhanced_fields(
    conn: &Connection,
    user_id: UserId,
    date: NaiveDate,
    fields: Option<&EnhancedFields>,
) -> StrideResult<()> {
    let json = fields.map(serde_json::to_string).transpose()?;
    let updated = conn
        .execute(
            "UPDATE load_records SET enhanced = ?3 WHERE user_id = ?1 AND date = ?2",
            params![user_id, encode_date(date), json],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if updated == 0 {
        return Err(to_storage_err(format!(
            "no load record for user {user_id} on {date}"
        )));
    }
    Ok(())
}

/// Distinct users with at least one record, ascending.
pub fn user_ids(conn: &Connection) -> StrideResult<Vec<UserId>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT user_id FROM load_records ORDER BY user_id")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<UserId>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Insert or replace records in one transaction. Returns the count written.
pub fn upsert_records(conn: &Connection, records: &[LoadRecord]) -> StrideResult<usize> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("upsert_records begin: {e}")))?;
    {
        let mut stmt = tx
            .prepare_cached(
                "INSERT OR REPLACE INTO load_records
                    (user_id, date, acute_load, acute_stress, enhanced)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        for record in records {
            let enhanced = record.enhanced.as_ref().map(serde_json::to_string).transpose()?;
            stmt.execute(params![
                record.user_id,
                encode_date(record.date),
                record.acute_load,
                record.acute_stress,
                enhanced,
            ])
            .map_err(|e| to_storage_err(format!("upsert_records: {e}")))?;
        }
    }
    tx.commit()
        .map_err(|e| to_storage_err(format!("upsert_records commit: {e}")))?;
    Ok(records.len())
}

/// Number of records stored for `user_id`.
pub fn count_records(conn: &Connection, user_id: UserId) -> StrideResult<usize> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM load_records WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as usize)
}
