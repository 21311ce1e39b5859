//! Batch validation at the three [`ValidationLevel`]s.

use std::collections::HashSet;

use chrono::NaiveDate;

use stride_core::models::{CalculationResult, LoadRecord, UserId, ValidationLevel, ValidationResult};

/// Recomputes one date independently of the proposed batch.
pub type Recompute<'a> = &'a dyn Fn(NaiveDate) -> CalculationResult;

/// A batch of recomputed results awaiting write-back.
pub struct BatchProposal<'a> {
    pub migration_id: &'a str,
    pub user_id: UserId,
    pub batch_index: u32,
    /// The stored records the batch was computed for, ordered by date.
    pub inputs: &'a [LoadRecord],
    /// One result per input, same order.
    pub updates: &'a [CalculationResult],
    /// Record counts the job expects for this batch.
    pub counts: BatchCounts,
    /// Seed for the `Strict` sample, normally the checkpoint id.
    pub sample_seed: &'a str,
    /// Required for `Strict`; ignored otherwise.
    pub recompute: Option<Recompute<'a>>,
}

/// Expected and observed record counts for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCounts {
    /// Records this batch must contain.
    pub expected_len: usize,
    /// Unmigrated records the job expects in scope, this batch included.
    pub expected_remaining: usize,
    /// Unmigrated records actually found in scope.
    pub found_remaining: usize,
}

/// Sampling and comparison settings for `Strict`.
#[derive(Debug, Clone, Copy)]
pub struct StrictSettings {
    pub sample_size: usize,
    pub tolerance: f64,
}

/// Run every check up to `level` against a proposed batch.
pub fn validate_batch(
    proposal: &BatchProposal<'_>,
    level: ValidationLevel,
    strict: StrictSettings,
) -> ValidationResult {
    let mut result = ValidationResult::new(level);
    check_basic(proposal, &mut result);
    if level >= ValidationLevel::Standard {
        check_standard(proposal, &mut result);
    }
    if level >= ValidationLevel::Strict {
        check_strict(proposal, strict, &mut result);
    }
    result
}

fn check_basic(proposal: &BatchProposal<'_>, result: &mut ValidationResult) {
    let mut seen = HashSet::with_capacity(proposal.updates.len());
    for update in proposal.updates {
        let date = update.reference_date;
        if update.user_id != proposal.user_id {
            result.error(format!(
                "{date}: result belongs to user {}, expected {}",
                update.user_id, proposal.user_id
            ));
        }
        if !seen.insert(date) {
            result.error(format!("{date}: duplicate result"));
        }

        for (name, value) in [("acute", update.acute), ("chronic", update.chronic), ("ratio", update.ratio)] {
            if !value.is_finite() {
                result.error(format!("{date}: {name} is not finite ({value})"));
            } else if value < 0.0 {
                result.error(format!("{date}: {name} is negative ({value})"));
            }
        }
        for (name, value) in [
            ("acute_stress", update.acute_stress),
            ("chronic_stress", update.chronic_stress),
            ("stress_ratio", update.stress_ratio),
            ("divergence", update.divergence),
        ] {
            match value {
                Some(v) if !v.is_finite() => result.error(format!("{date}: {name} is not finite ({v})")),
                Some(v) if v < 0.0 && name != "divergence" => {
                    result.error(format!("{date}: {name} is negative ({v})"))
                }
                _ => {}
            }
        }

        let stress_fields = [update.acute_stress, update.chronic_stress, update.stress_ratio];
        let present = stress_fields.iter().filter(|v| v.is_some()).count();
        if present != 0 && present != stress_fields.len() {
            result.error(format!("{date}: stress fields partially present"));
        }
        if update.divergence.is_some() != update.stress_ratio.is_some() {
            result.error(format!("{date}: divergence must accompany stress_ratio"));
        }

        if update.method.is_fallback() {
            result.warn(format!("{date}: fell back to {}", update.method.label()));
        }
    }
    result.checked = proposal.updates.len();
}

fn check_standard(proposal: &BatchProposal<'_>, result: &mut ValidationResult) {
    let counts = proposal.counts;
    if counts.found_remaining != counts.expected_remaining {
        result.error(format!(
            "{} unmigrated records in scope, expected {}; records changed during the migration",
            counts.found_remaining, counts.expected_remaining
        ));
    }
    if proposal.inputs.len() != counts.expected_len {
        result.error(format!(
            "batch {} has {} records, expected {}",
            proposal.batch_index,
            proposal.inputs.len(),
            counts.expected_len
        ));
    }
    if proposal.updates.len() != proposal.inputs.len() {
        result.error(format!(
            "batch {} has {} results for {} records",
            proposal.batch_index,
            proposal.updates.len(),
            proposal.inputs.len()
        ));
        return;
    }
    for (input, update) in proposal.inputs.iter().zip(proposal.updates) {
        if input.date != update.reference_date {
            result.error(format!(
                "result for {} does not match record dated {}",
                update.reference_date, input.date
            ));
        }
    }
}

fn check_strict(proposal: &BatchProposal<'_>, strict: StrictSettings, result: &mut ValidationResult) {
    let Some(recompute) = proposal.recompute else {
        result.error("strict validation requires an independent recomputation");
        return;
    };
    for index in sample_indices(proposal.sample_seed, proposal.updates.len(), strict.sample_size) {
        let proposed = &proposal.updates[index];
        let expected = recompute(proposed.reference_date);
        compare(proposed, &expected, strict.tolerance, result);
    }
}

fn compare(
    proposed: &CalculationResult,
    expected: &CalculationResult,
    tolerance: f64,
    result: &mut ValidationResult,
) {
    let date = proposed.reference_date;
    if proposed.method.kind() != expected.method.kind() {
        result.error(format!(
            "{date}: method {} differs from recomputed {}",
            proposed.method.label(),
            expected.method.label()
        ));
    }
    let pairs = [
        ("acute", Some(proposed.acute), Some(expected.acute)),
        ("chronic", Some(proposed.chronic), Some(expected.chronic)),
        ("ratio", Some(proposed.ratio), Some(expected.ratio)),
        ("chronic_stress", proposed.chronic_stress, expected.chronic_stress),
        ("stress_ratio", proposed.stress_ratio, expected.stress_ratio),
        ("divergence", proposed.divergence, expected.divergence),
    ];
    for (name, got, want) in pairs {
        match (got, want) {
            (Some(g), Some(w)) if (g - w).abs() <= tolerance => {}
            (None, None) => {}
            (g, w) => result.error(format!("{date}: {name} {g:?} differs from recomputed {w:?}")),
        }
    }
}

/// Deterministic sample of `size` indices out of `len`, ascending.
///
/// Each index is ranked by the BLAKE3 digest of the seed and the index, so
/// the same seed always selects the same records.
pub fn sample_indices(seed: &str, len: usize, size: usize) -> Vec<usize> {
    if size >= len {
        return (0..len).collect();
    }
    let mut ranked: Vec<([u8; 32], usize)> = (0..len)
        .map(|i| {
            let mut hasher = blake3::Hasher::new();
            hasher.update(seed.as_bytes());
            hasher.update(&(i as u64).to_le_bytes());
            (*hasher.finalize().as_bytes(), i)
        })
        .collect();
    ranked.sort_unstable();
    let mut picked: Vec<usize> = ranked.into_iter().take(size).map(|(_, i)| i).collect();
    picked.sort_unstable();
    picked
}
