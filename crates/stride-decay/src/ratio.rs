/// `acute / chronic`, or `0.0` when chronic is zero or the quotient is not finite.
pub fn ratio(acute: f64, chronic: f64) -> f64 {
    if chronic == 0.0 {
        return 0.0;
    }
    let value = acute / chronic;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
