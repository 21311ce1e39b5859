//! Migration job persistence. The running-job index surfaces as
//! `ConcurrencyConflict` rather than a raw constraint error.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use stride_core::errors::{MigrationError, StrideError, StrideResult};
use stride_core::models::{JobFailure, JobFilter, MigrationJob, MigrationStatus, UserId};

use super::{decode_date, decode_ts, encode_date, encode_ts};
use crate::to_storage_err;

const COLUMNS: &str = "migration_id, user_id, target_configuration_id, status, batch_size,
    current_batch, total_batches, processed_count, success_count, failure_count,
    failure_batch, failure_reason, created_at, updated_at,
    total_records, range_end, last_migrated_date";

struct JobRow {
    migration_id: String,
    user_id: i64,
    target_configuration_id: i64,
    status: String,
    batch_size: i64,
    current_batch: u32,
    total_batches: u32,
    processed_count: i64,
    success_count: i64,
    failure_count: i64,
    failure_batch: Option<u32>,
    failure_reason: Option<String>,
    created_at: String,
    updated_at: String,
    total_records: i64,
    range_end: Option<String>,
    last_migrated_date: Option<String>,
}

impl JobRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            migration_id: row.get(0)?,
            user_id: row.get(1)?,
            target_configuration_id: row.get(2)?,
            status: row.get(3)?,
            batch_size: row.get(4)?,
            current_batch: row.get(5)?,
            total_batches: row.get(6)?,
            processed_count: row.get(7)?,
            success_count: row.get(8)?,
            failure_count: row.get(9)?,
            failure_batch: row.get(10)?,
            failure_reason: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
            total_records: row.get(14)?,
            range_end: row.get(15)?,
            last_migrated_date: row.get(16)?,
        })
    }

    fn into_job(self) -> StrideResult<MigrationJob> {
        let status = MigrationStatus::parse(&self.status)
            .ok_or_else(|| to_storage_err(format!("unknown job status {:?}", self.status)))?;
        let failure = match (self.failure_batch, self.failure_reason) {
            (Some(batch_index), Some(reason)) => Some(JobFailure { batch_index, reason }),
            _ => None,
        };
        Ok(MigrationJob {
            migration_id: self.migration_id,
            user_id: self.user_id,
            target_configuration_id: self.target_configuration_id,
            status,
            batch_size: self.batch_size as usize,
            current_batch: self.current_batch,
            total_batches: self.total_batches,
            total_records: self.total_records as u64,
            range_end: self.range_end.as_deref().map(decode_date).transpose()?,
            last_migrated_date: self.last_migrated_date.as_deref().map(decode_date).transpose()?,
            processed_count: self.processed_count as u64,
            success_count: self.success_count as u64,
            failure_count: self.failure_count as u64,
            failure,
            created_at: decode_ts(&self.created_at)?,
            updated_at: decode_ts(&self.updated_at)?,
        })
    }
}

/// Translate a unique-index violation into the domain conflict.
fn job_write_err(conn: &Connection, job: &MigrationJob, err: rusqlite::Error) -> StrideError {
    if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        if let Ok(Some(running)) = running_job_for_user(conn, job.user_id) {
            if running.migration_id != job.migration_id {
                return MigrationError::ConcurrencyConflict {
                    user_id: job.user_id,
                    running_migration_id: running.migration_id,
                }
                .into();
            }
        }
    }
    to_storage_err(err.to_string())
}

/// Insert a new job row.
pub fn insert_job(conn: &Connection, job: &MigrationJob) -> StrideResult<()> {
    conn.execute(
        "INSERT INTO migration_jobs (
            migration_id, user_id, target_configuration_id, status, batch_size,
            current_batch, total_batches, processed_count, success_count, failure_count,
            failure_batch, failure_reason, created_at, updated_at,
            total_records, range_end, last_migrated_date
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            job.migration_id,
            job.user_id,
            job.target_configuration_id,
            job.status.as_str(),
            job.batch_size as i64,
            job.current_batch,
            job.total_batches,
            job.processed_count as i64,
            job.success_count as i64,
            job.failure_count as i64,
            job.failure.as_ref().map(|f| f.batch_index),
            job.failure.as_ref().map(|f| f.reason.as_str()),
            encode_ts(&job.created_at),
            encode_ts(&job.updated_at),
            job.total_records as i64,
            job.range_end.map(encode_date),
            job.last_migrated_date.map(encode_date),
        ],
    )
    .map_err(|e| job_write_err(conn, job, e))?;
    Ok(())
}

/// Persist a job's progress, status and failure.
pub fn update_job(conn: &Connection, job: &MigrationJob) -> StrideResult<()> {
    let updated = conn
        .execute(
            "UPDATE migration_jobs SET
                status = ?2, current_batch = ?3, total_batches = ?4,
                processed_count = ?5, success_count = ?6, failure_count = ?7,
                failure_batch = ?8, failure_reason = ?9, updated_at = ?10,
                last_migrated_date = ?11
             WHERE migration_id = ?1",
            params![
                job.migration_id,
                job.status.as_str(),
                job.current_batch,
                job.total_batches,
                job.processed_count as i64,
                job.success_count as i64,
                job.failure_count as i64,
                job.failure.as_ref().map(|f| f.batch_index),
                job.failure.as_ref().map(|f| f.reason.as_str()),
                encode_ts(&job.updated_at),
                job.last_migrated_date.map(encode_date),
            ],
        )
        .map_err(|e| job_write_err(conn, job, e))?;
    if updated == 0 {
        return Err(MigrationError::JobNotFound {
            migration_id: job.migration_id.clone(),
        }
        .into());
    }
    Ok(())
}

/// A job by migration id.
pub fn get_job(conn: &Connection, migration_id: &str) -> StrideResult<Option<MigrationJob>> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM migration_jobs WHERE migration_id = ?1"),
            params![migration_id],
            JobRow::read,
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    row.map(JobRow::into_job).transpose()
}

/// Jobs matching the filter, oldest first.
pub fn list_jobs(conn: &Connection, filter: &JobFilter) -> StrideResult<Vec<MigrationJob>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM migration_jobs
             WHERE (?1 IS NULL OR user_id = ?1)
               AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at, migration_id"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(
            params![filter.user_id, filter.status.map(MigrationStatus::as_str)],
            JobRow::read,
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut jobs = Vec::new();
    for row in rows {
        jobs.push(row.map_err(|e| to_storage_err(e.to_string()))?.into_job()?);
    }
    Ok(jobs)
}

/// The user's running job, if one exists.
pub fn running_job_for_user(conn: &Connection, user_id: UserId) -> StrideResult<Option<MigrationJob>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM migration_jobs
                 WHERE user_id = ?1 AND status = 'running'"
            ),
            params![user_id],
            JobRow::read,
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    row.map(JobRow::into_job).transpose()
}
