//! Configuration insert, lookup, listing, activation.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use stride_core::errors::{ConfigurationError, StrideResult};
use stride_core::models::{Configuration, ConfigurationId, NewConfiguration};

use super::{decode_ts, encode_ts};
use crate::to_storage_err;

const COLUMNS: &str =
    "id, name, chronic_period_days, decay_rate, is_active, notes, created_by, created_at, supersedes";

struct ConfigurationRow {
    id: i64,
    name: String,
    chronic_period_days: u32,
    decay_rate: f64,
    is_active: bool,
    notes: Option<String>,
    created_by: Option<i64>,
    created_at: String,
    supersedes: Option<i64>,
}

impl ConfigurationRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            chronic_period_days: row.get(2)?,
            decay_rate: row.get(3)?,
            is_active: row.get(4)?,
            notes: row.get(5)?,
            created_by: row.get(6)?,
            created_at: row.get(7)?,
            supersedes: row.get(8)?,
        })
    }

    fn into_configuration(self) -> StrideResult<Configuration> {
        Ok(Configuration {
            id: self.id,
            name: self.name,
            chronic_period_days: self.chronic_period_days,
            decay_rate: self.decay_rate,
            is_active: self.is_active,
            notes: self.notes,
            created_by: self.created_by,
            created_at: decode_ts(&self.created_at)?,
            supersedes: self.supersedes,
        })
    }
}

/// Insert a validated configuration; returns its id.
pub fn insert_configuration(
    conn: &Connection,
    config: &NewConfiguration,
) -> StrideResult<ConfigurationId> {
    conn.execute(
        "INSERT INTO configurations
            (name, chronic_period_days, decay_rate, is_active, notes, created_by, created_at, supersedes)
         VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?7)",
        params![
            config.name,
            config.chronic_period_days,
            config.decay_rate,
            config.notes,
            config.created_by,
            encode_ts(&Utc::now()),
            config.supersedes,
        ],
    )
    .map_err(|e| to_storage_err(format!("insert_configuration: {e}")))?;
    Ok(conn.last_insert_rowid())
}

/// A configuration by id.
pub fn get_configuration(
    conn: &Connection,
    id: ConfigurationId,
) -> StrideResult<Option<Configuration>> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM configurations WHERE id = ?1"),
            params![id],
            ConfigurationRow::read,
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    row.map(ConfigurationRow::into_configuration).transpose()
}

/// All configurations ordered by id.
pub fn list_configurations(
    conn: &Connection,
    include_inactive: bool,
) -> StrideResult<Vec<Configuration>> {
    let sql = if include_inactive {
        format!("SELECT {COLUMNS} FROM configurations ORDER BY id")
    } else {
        format!("SELECT {COLUMNS} FROM configurations WHERE is_active = 1 ORDER BY id")
    };
    let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], ConfigurationRow::read)
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut configs = Vec::new();
    for row in rows {
        let row = row.map_err(|e| to_storage_err(e.to_string()))?;
        configs.push(row.into_configuration()?);
    }
    Ok(configs)
}

/// Flip a configuration's active flag.
pub fn set_configuration_active(
    conn: &Connection,
    id: ConfigurationId,
    active: bool,
) -> StrideResult<()> {
    let updated = conn
        .execute(
            "UPDATE configurations SET is_active = ?2 WHERE id = ?1",
            params![id, active],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if updated == 0 {
        return Err(ConfigurationError::NotFound { id }.into());
    }
    Ok(())
}

/// Id of a running migration whose target is `id`.
pub fn running_migration_for_configuration(
    conn: &Connection,
    id: ConfigurationId,
) -> StrideResult<Option<String>> {
    conn.query_row(
        "SELECT migration_id FROM migration_jobs
         WHERE target_configuration_id = ?1 AND status = 'running'
         LIMIT 1",
        params![id],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}
