//! [`MonitoringSink`]: the shared event log for migrations and rollbacks.
//!
//! One instance is created by the runtime and passed by `Arc` to every
//! engine. All state sits behind a single mutex; recording is O(1).

use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use stride_core::config::monitoring_config::MonitoringConfig;
use stride_core::constants::MAX_MONITORING_CAPACITY;
use stride_core::errors::StrideResult;
use stride_core::models::{Alert, AlertSeverity, EventKind, EventLevel, MonitoringEvent};

use crate::alerting::{BatchOutcome, FailureRateTracker};
use crate::ring::RingBuffer;
use crate::statistics::{Counters, MonitoringStatistics};
use crate::tracing_setup::events;

/// Alert type raised when a job's windowed failure rate crosses the threshold.
pub const FAILURE_RATE_ALERT: &str = "failure_rate_exceeded";

#[derive(Debug)]
struct SinkState {
    events: RingBuffer<MonitoringEvent>,
    alerts: RingBuffer<Alert>,
    next_sequence: u64,
    dropped: u64,
    counters: Counters,
    failure_rates: FailureRateTracker,
}

#[derive(Debug)]
pub struct MonitoringSink {
    state: Mutex<SinkState>,
}

impl MonitoringSink {
    /// Sink sized and thresholded from `config`.
    pub fn new(config: &MonitoringConfig) -> Self {
        let capacity = config.capacity.clamp(1, MAX_MONITORING_CAPACITY);
        Self {
            state: Mutex::new(SinkState {
                events: RingBuffer::new(capacity),
                alerts: RingBuffer::new(capacity),
                next_sequence: 0,
                dropped: 0,
                counters: Counters::default(),
                failure_rates: FailureRateTracker::new(
                    config.failure_window_batches,
                    config.failure_rate_threshold,
                ),
            }),
        }
    }

    /// Default thresholds with a custom retention capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(&MonitoringConfig {
            capacity,
            ..MonitoringConfig::default()
        })
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        // A panic mid-record leaves the ring structurally valid.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Generic log entry.
    pub fn log(
        &self,
        migration_id: Option<&str>,
        level: EventLevel,
        message: impl Into<String>,
        details: Value,
    ) -> u64 {
        self.record(EventKind::Log, migration_id, level, message, details)
    }

    /// Append a typed event and mirror it to `tracing`. Returns its sequence number.
    pub fn record(
        &self,
        kind: EventKind,
        migration_id: Option<&str>,
        level: EventLevel,
        message: impl Into<String>,
        details: Value,
    ) -> u64 {
        let mut state = self.lock();
        Self::push_event(&mut state, kind, migration_id, level, message.into(), details)
    }

    fn push_event(
        state: &mut SinkState,
        kind: EventKind,
        migration_id: Option<&str>,
        level: EventLevel,
        message: String,
        details: Value,
    ) -> u64 {
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let event = MonitoringEvent {
            sequence,
            timestamp: Utc::now(),
            migration_id: migration_id.map(str::to_string),
            kind,
            level,
            message,
            details,
        };
        events::monitoring_event(&event);
        state.counters.count(kind, level);
        if state.events.push(event).is_some() {
            state.dropped += 1;
        }
        sequence
    }

    /// Raise an operator alert not tied to a migration.
    pub fn alert(
        &self,
        severity: AlertSeverity,
        alert_type: &str,
        message: impl Into<String>,
    ) -> Alert {
        self.alert_for(None, severity, alert_type, message, Value::Null)
    }

    /// Raise an alert, stored both in the alert list and as an `Alert` event.
    pub fn alert_for(
        &self,
        migration_id: Option<&str>,
        severity: AlertSeverity,
        alert_type: &str,
        message: impl Into<String>,
        details: Value,
    ) -> Alert {
        let mut state = self.lock();
        Self::push_alert(&mut state, migration_id, severity, alert_type, message.into(), details)
    }

    fn push_alert(
        state: &mut SinkState,
        migration_id: Option<&str>,
        severity: AlertSeverity,
        alert_type: &str,
        message: String,
        details: Value,
    ) -> Alert {
        let details = json!({
            "severity": severity.as_str(),
            "alert_type": alert_type,
            "details": details,
        });
        let sequence = Self::push_event(
            state,
            EventKind::Alert,
            migration_id,
            severity.event_level(),
            message.clone(),
            details,
        );
        let alert = Alert {
            sequence,
            timestamp: Utc::now(),
            severity,
            alert_type: alert_type.to_string(),
            message,
            migration_id: migration_id.map(str::to_string),
        };
        events::alert_raised(&alert);
        state.alerts.push(alert.clone());
        alert
    }

    /// Record a committed batch and raise a warning when the windowed
    /// failure rate first exceeds the configured threshold.
    pub fn record_batch_outcome(
        &self,
        migration_id: &str,
        batch_index: u32,
        processed: u64,
        failed: u64,
    ) -> Option<Alert> {
        let mut state = self.lock();
        Self::push_event(
            &mut state,
            EventKind::BatchCommitted,
            Some(migration_id),
            EventLevel::Info,
            format!("batch {batch_index} committed"),
            json!({ "batch_index": batch_index, "processed": processed, "failed": failed }),
        );

        let rate = state
            .failure_rates
            .record(migration_id, BatchOutcome { processed, failed })?;
        let threshold = state.failure_rates.threshold();
        Some(Self::push_alert(
            &mut state,
            Some(migration_id),
            AlertSeverity::Warning,
            FAILURE_RATE_ALERT,
            format!(
                "migration {migration_id} failure rate {:.1}% exceeds {:.1}%",
                rate * 100.0,
                threshold * 100.0
            ),
            json!({ "rate": rate, "threshold": threshold, "batch_index": batch_index }),
        ))
    }

    /// Discard failure-rate state once a migration is terminal.
    pub fn forget_migration(&self, migration_id: &str) {
        self.lock().failure_rates.forget(migration_id);
    }

    /// Windowed failure rate of a migration.
    pub fn failure_rate(&self, migration_id: &str) -> f64 {
        self.lock().failure_rates.rate(migration_id)
    }

    /// Retained events from the last `hours` hours, oldest first.
    pub fn recent(&self, hours: i64) -> Vec<MonitoringEvent> {
        let cutoff = Utc::now() - Duration::hours(hours);
        self.lock()
            .events
            .iter()
            .filter(|e| e.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> Vec<MonitoringEvent> {
        self.lock().events.iter().cloned().collect()
    }

    /// Retained events of one migration, oldest first.
    pub fn events_for(&self, migration_id: &str) -> Vec<MonitoringEvent> {
        self.lock()
            .events
            .iter()
            .filter(|e| e.migration_id.as_deref() == Some(migration_id))
            .cloned()
            .collect()
    }

    /// Retained alerts, oldest first.
    pub fn alerts(&self) -> Vec<Alert> {
        self.lock().alerts.iter().cloned().collect()
    }

    /// Events evicted by the ring buffer so far.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    /// Maximum number of retained events.
    pub fn capacity(&self) -> usize {
        self.lock().events.capacity()
    }

    /// Counters over everything recorded, including evicted events.
    pub fn statistics(&self) -> MonitoringStatistics {
        let state = self.lock();
        state.counters.snapshot(state.events.len(), state.dropped)
    }

    /// Retained events, alerts, and statistics as pretty JSON.
    pub fn export(&self) -> StrideResult<String> {
        let state = self.lock();
        let events: Vec<&MonitoringEvent> = state.events.iter().collect();
        let alerts: Vec<&Alert> = state.alerts.iter().collect();
        let payload = json!({
            "exported_at": Utc::now(),
            "statistics": state.counters.snapshot(state.events.len(), state.dropped),
            "events": events,
            "alerts": alerts,
        });
        Ok(serde_json::to_string_pretty(&payload)?)
    }
}

impl Default for MonitoringSink {
    fn default() -> Self {
        Self::new(&MonitoringConfig::default())
    }
}
