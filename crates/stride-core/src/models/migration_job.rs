use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::configuration::ConfigurationId;
use super::load_record::UserId;
use crate::errors::MigrationError;

/// Lifecycle of a migration job.
///
/// ```text
/// Pending → Running → Completed ─┐
///                   → Failed ────┴→ RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    Pending,
    Running,
    Completed,
    Failed,
    RolledBack,
}

impl MigrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "rolled_back" => Some(Self::RolledBack),
            _ => None,
        }
    }

    /// Completed, failed and rolled-back jobs never change status again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::RolledBack)
    }

    /// Whether the lifecycle allows moving to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Failed, Self::RolledBack)
                | (Self::Completed, Self::RolledBack)
        )
    }
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and why a job stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub batch_index: u32,
    pub reason: String,
}

/// Per-user recomputation of historical records onto a target configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationJob {
    pub migration_id: String,
    pub user_id: UserId,
    pub target_configuration_id: ConfigurationId,
    pub status: MigrationStatus,
    pub batch_size: usize,
    /// Index of the next batch to process.
    pub current_batch: u32,
    pub total_batches: u32,
    /// Records in scope when the job started.
    #[serde(default)]
    pub total_records: u64,
    /// Date of the newest record in scope when the job started. Records
    /// dated later are outside this migration.
    #[serde(default)]
    pub range_end: Option<NaiveDate>,
    /// Date of the last committed record. The next batch starts after it.
    #[serde(default)]
    pub last_migrated_date: Option<NaiveDate>,
    pub processed_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub failure: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MigrationJob {
    /// A fresh `Pending` job covering `total_records` records.
    pub fn new(
        user_id: UserId,
        target_configuration_id: ConfigurationId,
        batch_size: usize,
        total_records: usize,
    ) -> Self {
        let now = super::stored_now();
        let total_batches = total_records.div_ceil(batch_size.max(1)) as u32;
        Self {
            migration_id: uuid::Uuid::new_v4().to_string(),
            user_id,
            target_configuration_id,
            status: MigrationStatus::Pending,
            batch_size,
            current_batch: 0,
            total_batches,
            total_records: total_records as u64,
            range_end: None,
            last_migrated_date: None,
            processed_count: 0,
            success_count: 0,
            failure_count: 0,
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bound the job to records dated on or before `range_end`.
    pub fn with_range_end(mut self, range_end: Option<NaiveDate>) -> Self {
        self.range_end = range_end;
        self
    }

    /// Whether a record dated `date` belongs to this job and is not yet
    /// committed.
    pub fn is_unmigrated(&self, date: NaiveDate) -> bool {
        self.last_migrated_date.map_or(true, |cursor| date > cursor)
            && self.range_end.map_or(true, |end| date <= end)
    }

    /// Records the job still expects to process.
    pub fn remaining_records(&self) -> u64 {
        self.total_records.saturating_sub(self.processed_count)
    }

    /// Size the next batch must have.
    pub fn expected_batch_len(&self) -> usize {
        (self.batch_size as u64).min(self.remaining_records()) as usize
    }

    /// Move to `next`, rejecting edges the lifecycle does not allow.
    pub fn transition(&mut self, next: MigrationStatus) -> Result<(), MigrationError> {
        if !self.status.can_transition_to(next) {
            return Err(MigrationError::InvalidTransition {
                migration_id: self.migration_id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = super::stored_now();
        Ok(())
    }

    /// Transition to `Failed`, recording the batch and reason.
    pub fn fail(&mut self, batch_index: u32, reason: impl Into<String>) -> Result<(), MigrationError> {
        self.transition(MigrationStatus::Failed)?;
        self.failure = Some(JobFailure {
            batch_index,
            reason: reason.into(),
        });
        Ok(())
    }

    /// True while batches remain to be processed.
    pub fn has_remaining_batches(&self) -> bool {
        self.current_batch < self.total_batches
    }

    /// Fraction of batches committed (1.0 for an empty job).
    pub fn progress(&self) -> f64 {
        if self.total_batches == 0 {
            return 1.0;
        }
        f64::from(self.current_batch) / f64::from(self.total_batches)
    }

    /// Fraction of processed records that fell back.
    pub fn failure_rate(&self) -> f64 {
        if self.processed_count == 0 {
            return 0.0;
        }
        self.failure_count as f64 / self.processed_count as f64
    }
}

/// Job listing filter; unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFilter {
    pub user_id: Option<UserId>,
    pub status: Option<MigrationStatus>,
}
