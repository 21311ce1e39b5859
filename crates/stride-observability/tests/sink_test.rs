use proptest::prelude::*;
use serde_json::{json, Value};
use stride_core::config::monitoring_config::MonitoringConfig;
use stride_core::models::{AlertSeverity, EventKind, EventLevel};
use stride_observability::sink::FAILURE_RATE_ALERT;
use stride_observability::MonitoringSink;

#[test]
fn ring_retains_only_newest_events() {
    let sink = MonitoringSink::with_capacity(5);
    for i in 0..12 {
        sink.log(None, EventLevel::Info, format!("event {i}"), Value::Null);
    }

    let events = sink.events();
    assert_eq!(events.len(), 5);
    assert_eq!(events[0].message, "event 7");
    assert_eq!(events[4].message, "event 11");
    assert_eq!(sink.dropped(), 7);

    let stats = sink.statistics();
    assert_eq!(stats.total_events, 12);
    assert_eq!(stats.retained_events, 5);
    assert_eq!(stats.dropped_events, 7);
}

#[test]
fn capacity_is_capped() {
    let sink = MonitoringSink::with_capacity(usize::MAX);
    assert_eq!(sink.capacity(), stride_core::constants::MAX_MONITORING_CAPACITY);
}

#[test]
fn failure_rate_alert_fires_above_threshold() {
    let sink = MonitoringSink::default();
    assert!(sink.record_batch_outcome("m-1", 0, 100, 2).is_none());
    assert!(sink.record_batch_outcome("m-1", 1, 100, 3).is_none());

    let alert = sink.record_batch_outcome("m-1", 2, 100, 20).unwrap();
    assert_eq!(alert.severity, AlertSeverity::Warning);
    assert_eq!(alert.alert_type, FAILURE_RATE_ALERT);
    assert_eq!(alert.migration_id.as_deref(), Some("m-1"));
    assert!((sink.failure_rate("m-1") - 25.0 / 300.0).abs() < 1e-12);

    // Already breached: no duplicate alert.
    assert!(sink.record_batch_outcome("m-1", 3, 100, 20).is_none());
    assert_eq!(sink.alerts().len(), 1);
}

#[test]
fn failure_rate_uses_trailing_window() {
    let sink = MonitoringSink::new(&MonitoringConfig {
        failure_window_batches: 3,
        ..MonitoringConfig::default()
    });
    sink.record_batch_outcome("m", 0, 10, 10);
    for batch in 1..=3 {
        sink.record_batch_outcome("m", batch, 10, 0);
    }
    assert_eq!(sink.failure_rate("m"), 0.0);
    sink.forget_migration("m");
    assert_eq!(sink.failure_rate("m"), 0.0);
}

#[test]
fn events_are_queryable_by_migration() {
    let sink = MonitoringSink::default();
    sink.record(EventKind::MigrationStarted, Some("a"), EventLevel::Info, "started", Value::Null);
    sink.record(EventKind::MigrationStarted, Some("b"), EventLevel::Info, "started", Value::Null);
    sink.record(EventKind::MigrationCompleted, Some("a"), EventLevel::Info, "done", Value::Null);

    let for_a = sink.events_for("a");
    assert_eq!(for_a.len(), 2);
    assert!(for_a.windows(2).all(|w| w[0].sequence < w[1].sequence));
    assert_eq!(sink.recent(1).len(), 3);
    assert!(sink.recent(-1).is_empty());
}

#[test]
fn statistics_count_kinds_levels_and_success_rate() {
    let sink = MonitoringSink::default();
    assert_eq!(sink.statistics().success_rate, 1.0);

    for _ in 0..3 {
        sink.record(EventKind::MigrationCompleted, Some("x"), EventLevel::Info, "ok", Value::Null);
    }
    sink.record(EventKind::MigrationFailed, Some("y"), EventLevel::Error, "bad", Value::Null);
    sink.alert(AlertSeverity::Critical, "checksum_mismatch", "tampered");

    let stats = sink.statistics();
    assert_eq!(stats.by_kind["migration_completed"], 3);
    assert_eq!(stats.by_kind["alert"], 1);
    assert_eq!(stats.by_level["critical"], 1);
    assert_eq!(stats.by_level["error"], 1);
    assert_eq!(stats.alerts, 1);
    assert!((stats.success_rate - 0.75).abs() < 1e-12);
}

#[test]
fn alerts_are_also_events() {
    let sink = MonitoringSink::default();
    let alert = sink.alert_for(
        Some("m"),
        AlertSeverity::Critical,
        "checksum_mismatch",
        "checkpoint tampered",
        json!({ "checkpoint_id": "c-1" }),
    );
    let events = sink.events_for("m");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Alert);
    assert_eq!(events[0].level, EventLevel::Critical);
    assert_eq!(events[0].sequence, alert.sequence);
    assert_eq!(events[0].details["alert_type"], "checksum_mismatch");
}

#[test]
fn export_is_valid_json() {
    let sink = MonitoringSink::with_capacity(2);
    sink.log(Some("m"), EventLevel::Warning, "slow batch", json!({ "elapsed_ms": 40 }));
    sink.alert(AlertSeverity::Info, "note", "hello");

    let exported: Value = serde_json::from_str(&sink.export().unwrap()).unwrap();
    assert_eq!(exported["events"].as_array().unwrap().len(), 2);
    assert_eq!(exported["alerts"].as_array().unwrap().len(), 1);
    assert_eq!(exported["statistics"]["total_events"], 2);
}

proptest! {
    #[test]
    fn retention_never_exceeds_capacity(capacity in 1usize..50, pushes in 0usize..200) {
        let sink = MonitoringSink::with_capacity(capacity);
        for i in 0..pushes {
            sink.log(None, EventLevel::Debug, format!("{i}"), Value::Null);
        }
        let events = sink.events();
        prop_assert_eq!(events.len(), pushes.min(capacity));
        prop_assert_eq!(sink.dropped() as usize, pushes.saturating_sub(capacity));
        if let Some(last) = events.last() {
            prop_assert_eq!(last.sequence as usize, pushes - 1);
        }
    }
}
