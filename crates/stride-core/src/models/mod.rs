mod assignment;
mod calculation;
mod checkpoint;
mod configuration;
mod load_record;
mod migration_job;
mod monitoring_event;
mod rollback;
mod validation_result;

pub use assignment::{AssignmentAction, AssignmentEvent, AssignmentFilter, NewAssignment};
pub use calculation::{CalculationMethod, CalculationResult, FallbackReason, MethodKind};
pub use checkpoint::{Checkpoint, CheckpointState, RestoreEntry};
pub use configuration::{
    validate_chronic_period_days, validate_decay_rate, Configuration, ConfigurationId,
    NewConfiguration,
};
pub use load_record::{DateRange, EnhancedFields, LoadMetric, LoadRecord, UserId};
pub use migration_job::{JobFailure, JobFilter, MigrationJob, MigrationStatus};
pub use monitoring_event::{Alert, AlertSeverity, EventKind, EventLevel, MonitoringEvent};
pub use rollback::{RiskLevel, RollbackOperation, RollbackPlan, RollbackResult, RollbackScope};
pub use validation_result::{ValidationLevel, ValidationResult};

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the microsecond precision timestamps are stored with, so
/// a value compares equal after a storage round trip.
pub fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
