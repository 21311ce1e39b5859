//! Method dispatch and single-date ACWR calculation.

mod input;

use std::sync::Arc;

use chrono::NaiveDate;

use stride_core::config::CalculationConfig;
use stride_core::errors::{StrideError, StrideResult};
use stride_core::models::{
    CalculationMethod, CalculationResult, Configuration, FallbackReason, LoadMetric, LoadRecord,
    UserId,
};
use stride_core::traits::IFeatureGate;
use stride_decay::{canonical_divergence, ChronicMode, DecayAggregator};
use stride_observability::calculation_span;
use stride_observability::tracing_setup::events;

use crate::configuration::ConfigurationStore;

pub use input::{sanitize_records, validate_records};

/// Produces a [`CalculationResult`] for one user at one date.
///
/// Stateless apart from its collaborators; safe to share across threads.
pub struct CalculationOrchestrator {
    configurations: Arc<ConfigurationStore>,
    gate: Arc<dyn IFeatureGate>,
    aggregator: DecayAggregator,
    config: CalculationConfig,
}

impl CalculationOrchestrator {
    /// Orchestrator resolving configurations from `configurations`, gated by `gate`.
    pub fn new(
        configurations: Arc<ConfigurationStore>,
        gate: Arc<dyn IFeatureGate>,
        config: CalculationConfig,
    ) -> Self {
        Self {
            configurations,
            gate,
            aggregator: DecayAggregator::with_acute_window(config.acute_window_days),
            config,
        }
    }

    /// Days of history before a reference date that can affect its result
    /// under `configuration`, including the standard fallback window.
    pub fn lookback_days(&self, configuration: &Configuration) -> u32 {
        configuration
            .chronic_period_days
            .max(self.config.standard_chronic_period_days)
            .max(self.config.acute_window_days)
    }

    /// Decide which formula applies to `user_id` right now.
    pub fn resolve_method(&self, user_id: UserId) -> CalculationMethod {
        if !self.gate.enabled(&self.config.enhanced_feature, user_id) {
            return CalculationMethod::Standard;
        }
        match self.configurations.get_active_for_user(user_id) {
            Ok(Some(config)) => CalculationMethod::Enhanced(config),
            Ok(None) => {
                events::calculation_fallback(
                    user_id,
                    FallbackReason::NoConfiguration.as_str(),
                    "no configuration assigned",
                );
                CalculationMethod::Fallback(FallbackReason::NoConfiguration)
            }
            Err(e) => {
                events::calculation_fallback(
                    user_id,
                    FallbackReason::ConfigurationUnavailable.as_str(),
                    &e.to_string(),
                );
                CalculationMethod::Fallback(FallbackReason::ConfigurationUnavailable)
            }
        }
    }

    /// Calculate with the method resolved for `user_id`. Never fails: an
    /// unusable enhanced path yields standard numbers tagged `Fallback`.
    pub fn calculate(
        &self,
        user_id: UserId,
        records: &[LoadRecord],
        reference_date: NaiveDate,
    ) -> CalculationResult {
        let _span = calculation_span!(user_id, reference_date).entered();
        match self.resolve_method(user_id) {
            CalculationMethod::Enhanced(config) => {
                self.calculate_enhanced(user_id, records, reference_date, &config)
            }
            method => self.standard(user_id, records, reference_date, method),
        }
    }

    /// Decay-weighted calculation with `configuration`, bypassing the gate.
    /// Falls back to the standard method on malformed input.
    pub fn calculate_enhanced(
        &self,
        user_id: UserId,
        records: &[LoadRecord],
        reference_date: NaiveDate,
        configuration: &Configuration,
    ) -> CalculationResult {
        match self.try_enhanced(user_id, records, reference_date, configuration) {
            Ok(result) => result,
            Err(e) => {
                events::calculation_fallback(
                    user_id,
                    FallbackReason::CalculationFailure.as_str(),
                    &e.to_string(),
                );
                self.standard(
                    user_id,
                    records,
                    reference_date,
                    CalculationMethod::Fallback(FallbackReason::CalculationFailure),
                )
            }
        }
    }

    fn try_enhanced(
        &self,
        user_id: UserId,
        records: &[LoadRecord],
        reference_date: NaiveDate,
        configuration: &Configuration,
    ) -> StrideResult<CalculationResult> {
        validate_records(records)?;
        let result = self.compute(
            user_id,
            records,
            reference_date,
            ChronicMode::from_configuration(configuration),
            CalculationMethod::Enhanced(configuration.clone()),
        );
        let outputs = [Some(result.acute), Some(result.chronic), Some(result.ratio), result.divergence];
        if outputs.into_iter().flatten().any(|v| !v.is_finite()) {
            return Err(StrideError::CalculationFailure {
                reason: "non-finite aggregate".to_string(),
            });
        }
        Ok(result)
    }

    /// Plain-mean chronic window over sanitized input.
    fn standard(
        &self,
        user_id: UserId,
        records: &[LoadRecord],
        reference_date: NaiveDate,
        method: CalculationMethod,
    ) -> CalculationResult {
        let clean = sanitize_records(records);
        self.compute(
            user_id,
            &clean,
            reference_date,
            ChronicMode::Standard {
                period_days: self.config.standard_chronic_period_days,
            },
            method,
        )
    }

    fn compute(
        &self,
        user_id: UserId,
        records: &[LoadRecord],
        reference_date: NaiveDate,
        mode: ChronicMode,
        method: CalculationMethod,
    ) -> CalculationResult {
        let load = self.aggregator.snapshot(records, reference_date, mode, LoadMetric::Load);
        let stress = self.aggregator.snapshot(records, reference_date, mode, LoadMetric::Stress);

        let (acute_stress, chronic_stress, stress_ratio, divergence) = if stress.samples > 0 {
            (
                Some(stress.acute),
                Some(stress.chronic),
                Some(stress.ratio),
                Some(canonical_divergence(load.ratio, stress.ratio)),
            )
        } else {
            (None, None, None, None)
        };

        CalculationResult {
            user_id,
            reference_date,
            acute: load.acute,
            chronic: load.chronic,
            ratio: load.ratio,
            acute_stress,
            chronic_stress,
            stress_ratio,
            divergence,
            method,
        }
    }
}
