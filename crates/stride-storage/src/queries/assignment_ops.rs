//! Append-only assignment history. Rows are never updated or deleted.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use stride_core::errors::StrideResult;
use stride_core::models::{AssignmentAction, AssignmentEvent, AssignmentFilter, NewAssignment, UserId};

use super::{decode_ts, encode_ts};
use crate::to_storage_err;

const COLUMNS: &str = "id, user_id, configuration_id, action, admin_id, reason, at";

type RawAssignment = (i64, i64, i64, String, i64, String, String);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawAssignment> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_event(raw: RawAssignment) -> StrideResult<AssignmentEvent> {
    let (id, user_id, configuration_id, action, admin_id, reason, at) = raw;
    let action = AssignmentAction::parse(&action)
        .ok_or_else(|| to_storage_err(format!("unknown assignment action {action:?}")))?;
    Ok(AssignmentEvent {
        id,
        user_id,
        configuration_id,
        action,
        admin_id,
        reason,
        at: decode_ts(&at)?,
    })
}

/// Append an assignment event; returns its row id.
pub fn append_assignment(conn: &Connection, assignment: &NewAssignment) -> StrideResult<i64> {
    conn.execute(
        "INSERT INTO configuration_assignments
            (user_id, configuration_id, action, admin_id, reason, at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            assignment.user_id,
            assignment.configuration_id,
            assignment.action.as_str(),
            assignment.admin_id,
            assignment.reason,
            encode_ts(&Utc::now()),
        ],
    )
    .map_err(|e| to_storage_err(format!("append_assignment: {e}")))?;
    Ok(conn.last_insert_rowid())
}

/// Newest history row for the user. Ids are monotonic, so id order is time order.
pub fn latest_assignment(conn: &Connection, user_id: UserId) -> StrideResult<Option<AssignmentEvent>> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM configuration_assignments
                 WHERE user_id = ?1 ORDER BY id DESC LIMIT 1"
            ),
            params![user_id],
            read_row,
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    raw.map(into_event).transpose()
}

/// Matching rows, newest first.
pub fn assignment_history(
    conn: &Connection,
    filter: &AssignmentFilter,
) -> StrideResult<Vec<AssignmentEvent>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM configuration_assignments
             WHERE (?1 IS NULL OR user_id = ?1)
               AND (?2 IS NULL OR configuration_id = ?2)
               AND (?3 IS NULL OR admin_id = ?3)
             ORDER BY id DESC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(
            params![filter.user_id, filter.configuration_id, filter.admin_id],
            read_row,
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut events = Vec::new();
    for raw in rows {
        events.push(into_event(raw.map_err(|e| to_storage_err(e.to_string()))?)?);
    }
    Ok(events)
}
