//! Structured log events for key system operations.
//!
//! Each function emits a `tracing` event with an `event` field naming it.

use stride_core::models::{Alert, AlertSeverity, EventLevel, MonitoringEvent};

/// Mirror a monitoring event at its own level.
pub fn monitoring_event(event: &MonitoringEvent) {
    let migration_id = event.migration_id.as_deref().unwrap_or("-");
    macro_rules! emit {
        ($macro:ident) => {
            tracing::$macro!(
                event = event.kind.as_str(),
                sequence = event.sequence,
                migration_id = %migration_id,
                details = %event.details,
                "{}",
                event.message
            )
        };
    }
    match event.level {
        EventLevel::Debug => emit!(debug),
        EventLevel::Info => emit!(info),
        EventLevel::Warning => emit!(warn),
        EventLevel::Error | EventLevel::Critical => emit!(error),
    }
}

pub fn alert_raised(alert: &Alert) {
    match alert.severity {
        AlertSeverity::Info => tracing::info!(
            event = "alert_raised",
            alert_type = %alert.alert_type,
            severity = alert.severity.as_str(),
            "alert raised"
        ),
        AlertSeverity::Warning => tracing::warn!(
            event = "alert_raised",
            alert_type = %alert.alert_type,
            severity = alert.severity.as_str(),
            "alert raised"
        ),
        AlertSeverity::Critical => tracing::error!(
            event = "alert_raised",
            alert_type = %alert.alert_type,
            severity = alert.severity.as_str(),
            "alert raised"
        ),
    }
}

pub fn configuration_created(id: i64, chronic_period_days: u32, decay_rate: f64) {
    tracing::info!(
        event = "configuration_created",
        configuration_id = id,
        chronic_period_days = chronic_period_days,
        decay_rate = decay_rate,
        "configuration created"
    );
}

pub fn configuration_rejected(field: &str, value: &str) {
    tracing::warn!(
        event = "configuration_rejected",
        field = %field,
        value = %value,
        "configuration rejected"
    );
}

pub fn configuration_assigned(user_id: i64, configuration_id: i64, admin_id: i64) {
    tracing::info!(
        event = "configuration_assigned",
        user_id = user_id,
        configuration_id = configuration_id,
        admin_id = admin_id,
        "configuration assigned"
    );
}

pub fn configuration_unassigned(user_id: i64, configuration_id: i64, admin_id: i64) {
    tracing::info!(
        event = "configuration_unassigned",
        user_id = user_id,
        configuration_id = configuration_id,
        admin_id = admin_id,
        "configuration unassigned"
    );
}

pub fn configuration_revised(previous_id: i64, new_id: i64, admin_id: i64) {
    tracing::info!(
        event = "configuration_revised",
        previous_id = previous_id,
        configuration_id = new_id,
        admin_id = admin_id,
        "configuration revised"
    );
}

pub fn configuration_deactivated(id: i64) {
    tracing::info!(
        event = "configuration_deactivated",
        configuration_id = id,
        "configuration deactivated"
    );
}

/// The enhanced method was unavailable and standard numbers were produced.
pub fn calculation_fallback(user_id: i64, reason: &str, cause: &str) {
    tracing::warn!(
        event = "calculation_fallback",
        user_id = user_id,
        reason = %reason,
        cause = %cause,
        "calculation fell back to standard method"
    );
}
