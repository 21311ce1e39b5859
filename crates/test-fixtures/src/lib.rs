//! Golden datasets for the stride workspace.
//!
//! Fixtures live under `golden/` in this crate. Loaders panic on missing or
//! malformed files; they are only meant to be called from tests.

use chrono::{Duration, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use stride_core::models::{LoadRecord, UserId};

fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("golden")
}

/// Root of the cargo workspace this crate belongs to.
pub fn workspace_root() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop();
    path.pop();
    path
}

/// Load and deserialize a JSON fixture relative to `golden/`.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

/// Parse a fixture file as untyped JSON.
pub fn load_fixture_value(relative_path: &str) -> serde_json::Value {
    load_fixture(relative_path)
}

/// Whether a fixture file is present.
pub fn fixture_exists(relative_path: &str) -> bool {
    fixtures_root().join(relative_path).exists()
}

/// Absolute path of a fixture under the fixtures directory.
pub fn fixture_path(relative_path: &str) -> PathBuf {
    fixtures_root().join(relative_path)
}

/// All JSON files in a fixture subdirectory, sorted by path.
pub fn list_fixtures(subdir: &str) -> Vec<PathBuf> {
    let dir = fixtures_root().join(subdir);
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .unwrap_or_else(|e| panic!("Failed to read directory {}: {}", dir.display(), e))
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            path.extension().is_some_and(|ext| ext == "json").then_some(path)
        })
        .collect();
    files.sort();
    files
}

#[derive(Debug, Clone, Deserialize)]
pub struct DivergenceCase {
    pub external: f64,
    pub internal: f64,
    pub expected: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DivergenceLiterals {
    pub description: String,
    pub tolerance: f64,
    pub cases: Vec<DivergenceCase>,
}

/// Divergence cases with hand-computed expectations.
pub fn divergence_literals() -> DivergenceLiterals {
    load_fixture("divergence/literals.json")
}

/// One decay-weighted mean; `records` are `(age_days, load)` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct DecayCase {
    pub name: String,
    pub chronic_period_days: u32,
    pub decay_rate: f64,
    pub records: Vec<(u32, f64)>,
    pub expected: f64,
}

impl DecayCase {
    /// Materialize the case as records for `user_id`, aged back from `reference_date`.
    pub fn load_records(&self, user_id: UserId, reference_date: NaiveDate) -> Vec<LoadRecord> {
        let mut records: Vec<LoadRecord> = self
            .records
            .iter()
            .map(|&(age, load)| {
                LoadRecord::new(user_id, reference_date - Duration::days(i64::from(age)), load)
            })
            .collect();
        records.sort_by_key(|r| r.date);
        records
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecaySet {
    pub description: String,
    pub tolerance: f64,
    pub cases: Vec<DecayCase>,
}

/// Decay aggregation cases with expected chronic values.
pub fn decay_cases() -> DecaySet {
    load_fixture("decay/weighted_mean.json")
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoundsCase {
    pub chronic_period_days: u32,
    pub decay_rate: f64,
    pub valid: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoundsSet {
    pub description: String,
    pub cases: Vec<BoundsCase>,
}

/// Accepted and rejected configuration parameter pairs.
pub fn configuration_bounds() -> BoundsSet {
    load_fixture("configuration/bounds.json")
}

/// A user's daily history plus the configuration to migrate it to.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingScenario {
    pub description: String,
    pub user_id: UserId,
    pub start_date: NaiveDate,
    pub chronic_period_days: u32,
    pub decay_rate: f64,
    pub batch_size: usize,
    /// `(external, internal)` per consecutive day.
    pub loads: Vec<(f64, f64)>,
}

impl TrainingScenario {
    pub fn date(&self, index: usize) -> NaiveDate {
        self.start_date + Duration::days(index as i64)
    }

    pub fn last_date(&self) -> NaiveDate {
        self.date(self.loads.len().saturating_sub(1))
    }

    /// The scenario as load records for its user.
    pub fn load_records(&self) -> Vec<LoadRecord> {
        self.loads
            .iter()
            .enumerate()
            .map(|(i, &(external, internal))| {
                LoadRecord::new(self.user_id, self.date(i), external).with_stress(internal)
            })
            .collect()
    }
}

/// A multi-week training history for end-to-end tests.
pub fn training_scenario() -> TrainingScenario {
    load_fixture("scenarios/training_block.json")
}
