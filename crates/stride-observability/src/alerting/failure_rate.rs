//! Per-migration failure rate across the last N batches.

use std::collections::{HashMap, HashSet, VecDeque};

/// Counts from one committed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub processed: u64,
    pub failed: u64,
}

#[derive(Debug, Clone)]
pub struct FailureRateTracker {
    window_batches: usize,
    threshold: f64,
    windows: HashMap<String, VecDeque<BatchOutcome>>,
    /// Migrations currently above threshold. An alert fires only on the
    /// transition into this set.
    breached: HashSet<String>,
}

impl FailureRateTracker {
    /// Tracker over the last `window_batches` batches.
    pub fn new(window_batches: usize, threshold: f64) -> Self {
        Self {
            window_batches: window_batches.max(1),
            threshold,
            windows: HashMap::new(),
            breached: HashSet::new(),
        }
    }

    /// Failure rate above which an alert fires.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Record a batch. Returns the windowed failure rate when it has just
    /// crossed above the threshold.
    pub fn record(&mut self, migration_id: &str, outcome: BatchOutcome) -> Option<f64> {
        let window = self.windows.entry(migration_id.to_string()).or_default();
        window.push_back(outcome);
        while window.len() > self.window_batches {
            window.pop_front();
        }

        let rate = window_rate(window);
        if rate > self.threshold {
            if self.breached.insert(migration_id.to_string()) {
                return Some(rate);
            }
        } else {
            self.breached.remove(migration_id);
        }
        None
    }

    /// Windowed failure rate, 0.0 for an unknown migration.
    pub fn rate(&self, migration_id: &str) -> f64 {
        self.windows.get(migration_id).map_or(0.0, window_rate)
    }

    /// Drop state for a finished migration.
    pub fn forget(&mut self, migration_id: &str) {
        self.windows.remove(migration_id);
        self.breached.remove(migration_id);
    }
}

fn window_rate(window: &VecDeque<BatchOutcome>) -> f64 {
    let (processed, failed) = window
        .iter()
        .fold((0u64, 0u64), |(p, f), o| (p + o.processed, f + o.failed));
    if processed == 0 {
        0.0
    } else {
        failed as f64 / processed as f64
    }
}
