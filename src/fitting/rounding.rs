//! Significant-figure rounding of measured values
//!
//! An uncertainty is reported with one significant digit and its value is
//! rounded to the same decimal place: `2.995188 ± 0.038118` becomes
//! `3.00 ± 0.04`. Ties round to even.

/// Decimal place of the first significant digit of `error`
///
/// Positive for fractions (`0.038 → 2`), negative for large numbers
/// (`230 → -2`).
fn leading_place(error: f64) -> i32 {
    -(error.abs().log10().floor() as i32)
}

fn round_at(value: f64, place: i32) -> f64 {
    if place >= 0 {
        let scale = 10f64.powi(place);
        (value * scale).round_ties_even() / scale
    } else {
        let scale = 10f64.powi(-place);
        (value / scale).round_ties_even() * scale
    }
}

/// Round `error` to one significant digit and `value` to the same place
///
/// The place always comes from the unrounded error, so a carry into the next
/// decade keeps the finer place for the value: `1.2345 ± 0.096` becomes
/// `1.23 ± 0.1`. An error that is zero or not finite leaves both numbers
/// unchanged.
pub fn round_result(value: f64, error: f64) -> (f64, f64) {
    if error == 0.0 || !error.is_finite() {
        return (value, error);
    }

    let place = leading_place(error);
    (round_at(value, place), round_at(error.abs(), place))
}

/// Apply [`round_result`] element-wise
///
/// If every error is zero the inputs are returned as they are.
pub fn round_results(values: &[f64], errors: &[f64]) -> (Vec<f64>, Vec<f64>) {
    if errors.iter().all(|&e| e == 0.0) {
        return (values.to_vec(), errors.to_vec());
    }
    values
        .iter()
        .zip(errors.iter())
        .map(|(&v, &e)| round_result(v, e))
        .unzip()
}
