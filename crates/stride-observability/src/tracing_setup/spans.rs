//! Span constructors for long-running operations.

/// Span covering one migration run.
#[macro_export]
macro_rules! migration_span {
    ($migration_id:expr, $user_id:expr) => {
        tracing::info_span!("stride.migration", migration_id = %$migration_id, user_id = $user_id)
    };
}

/// Span covering one batch of a migration.
#[macro_export]
macro_rules! batch_span {
    ($migration_id:expr, $batch_index:expr) => {
        tracing::debug_span!("stride.batch", migration_id = %$migration_id, batch_index = $batch_index)
    };
}

/// Span covering a rollback execution.
#[macro_export]
macro_rules! rollback_span {
    ($scope:expr, $ops:expr) => {
        tracing::info_span!("stride.rollback", scope = ?$scope, ops = $ops)
    };
}

/// Span covering one calculation.
#[macro_export]
macro_rules! calculation_span {
    ($user_id:expr, $reference_date:expr) => {
        tracing::debug_span!("stride.calculation", user_id = $user_id, reference_date = %$reference_date)
    };
}
