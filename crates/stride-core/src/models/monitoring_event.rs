use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl EventLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

/// Event type used for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Log,
    MigrationStarted,
    BatchCommitted,
    BatchFailed,
    MigrationCompleted,
    MigrationFailed,
    MigrationCancelled,
    MigrationResumed,
    RollbackExecuted,
    RollbackAborted,
    Alert,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::MigrationStarted => "migration_started",
            Self::BatchCommitted => "batch_committed",
            Self::BatchFailed => "batch_failed",
            Self::MigrationCompleted => "migration_completed",
            Self::MigrationFailed => "migration_failed",
            Self::MigrationCancelled => "migration_cancelled",
            Self::MigrationResumed => "migration_resumed",
            Self::RollbackExecuted => "rollback_executed",
            Self::RollbackAborted => "rollback_aborted",
            Self::Alert => "alert",
        }
    }
}

/// One entry of the monitoring ring buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringEvent {
    /// Monotonic sequence number, unique per sink.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub migration_id: Option<String>,
    pub kind: EventKind,
    pub level: EventLevel,
    pub message: String,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn event_level(self) -> EventLevel {
        match self {
            Self::Info => EventLevel::Info,
            Self::Warning => EventLevel::Warning,
            Self::Critical => EventLevel::Critical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Operator-facing alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub severity: AlertSeverity,
    pub alert_type: String,
    pub message: String,
    pub migration_id: Option<String>,
}
