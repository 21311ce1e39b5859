//! Aggregate counters reported by [`MonitoringSink::statistics`].
//!
//! [`MonitoringSink::statistics`]: crate::MonitoringSink::statistics

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stride_core::models::{EventKind, EventLevel};

/// Counts since the sink was created; not limited to the retained window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringStatistics {
    pub total_events: u64,
    pub retained_events: usize,
    pub dropped_events: u64,
    pub by_kind: BTreeMap<String, u64>,
    pub by_level: BTreeMap<String, u64>,
    pub alerts: u64,
    pub migrations_completed: u64,
    pub migrations_failed: u64,
    /// Completed / (completed + failed); 1.0 before any migration finishes.
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Counters {
    pub total: u64,
    pub by_kind: BTreeMap<EventKind, u64>,
    pub by_level: BTreeMap<EventLevel, u64>,
}

impl Counters {
    /// Count one event.
    pub fn count(&mut self, kind: EventKind, level: EventLevel) {
        self.total += 1;
        *self.by_kind.entry(kind).or_default() += 1;
        *self.by_level.entry(level).or_default() += 1;
    }

    fn kind(&self, kind: EventKind) -> u64 {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Counters as a reportable snapshot.
    pub fn snapshot(&self, retained_events: usize, dropped_events: u64) -> MonitoringStatistics {
        let completed = self.kind(EventKind::MigrationCompleted);
        let failed = self.kind(EventKind::MigrationFailed) + self.kind(EventKind::MigrationCancelled);
        let success_rate = if completed + failed == 0 {
            1.0
        } else {
            completed as f64 / (completed + failed) as f64
        };
        MonitoringStatistics {
            total_events: self.total,
            retained_events,
            dropped_events,
            by_kind: self
                .by_kind
                .iter()
                .map(|(k, v)| (k.as_str().to_string(), *v))
                .collect(),
            by_level: self
                .by_level
                .iter()
                .map(|(l, v)| (l.as_str().to_string(), *v))
                .collect(),
            alerts: self.kind(EventKind::Alert),
            migrations_completed: completed,
            migrations_failed: failed,
            success_rate,
        }
    }
}
