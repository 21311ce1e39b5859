/// Signed, normalized difference between two ratios.
///
/// ```text
/// divergence = (external - internal) / ((external + internal) / 2)
/// ```
///
/// Positive when `external > internal`. Both zero yields `0.0`, as does any
/// input that would make the result non-finite.
///
/// This is the only place the arithmetic lives; every caller that needs a
/// divergence value goes through here.
pub fn canonical_divergence(external_ratio: f64, internal_ratio: f64) -> f64 {
    if external_ratio == 0.0 && internal_ratio == 0.0 {
        return 0.0;
    }
    let mean = (external_ratio + internal_ratio) / 2.0;
    if mean == 0.0 {
        return 0.0;
    }
    let value = (external_ratio - internal_ratio) / mean;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
