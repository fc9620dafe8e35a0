//! Straight-line fit with uncertainties on both axes
//!
//! Orthogonal distance regression for `y = m·x + b`. For a straight line the
//! optimal correction of each point has a closed form, which leaves the
//! effective-variance objective
//!
//! ```text
//! S(m, b) = Σ (y_i − m·x_i − b)² / (σ_y,i² + m²·σ_x,i²)
//! ```
//!
//! minimized over `(m, b)` alone by the shared Levenberg-Marquardt solver.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::config::RegressionConfig;
use crate::error::{FringeError, Result};
use crate::fitting::least_squares::{LeastSquaresProblem, LevenbergMarquardt};
use crate::fitting::rounding::round_result;

struct EffectiveVarianceLine<'a> {
    x: &'a [f64],
    sx: &'a [f64],
    y: &'a [f64],
    sy: &'a [f64],
}

impl EffectiveVarianceLine<'_> {
    fn variance(&self, i: usize, slope: f64) -> f64 {
        self.sy[i] * self.sy[i] + slope * slope * self.sx[i] * self.sx[i]
    }
}

impl LeastSquaresProblem for EffectiveVarianceLine<'_> {
    fn num_params(&self) -> usize {
        2
    }

    fn num_residuals(&self) -> usize {
        self.x.len()
    }

    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let (m, b) = (params[0], params[1]);
        DVector::from_fn(self.x.len(), |i, _| {
            (self.y[i] - m * self.x[i] - b) / self.variance(i, m).sqrt()
        })
    }

    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        let (m, b) = (params[0], params[1]);
        let mut jac = DMatrix::zeros(self.x.len(), 2);
        for i in 0..self.x.len() {
            let w = self.variance(i, m);
            let sw = w.sqrt();
            let e = self.y[i] - m * self.x[i] - b;
            jac[(i, 0)] = -self.x[i] / sw - e * m * self.sx[i] * self.sx[i] / (w * sw);
            jac[(i, 1)] = -1.0 / sw;
        }
        jac
    }
}

/// Fitted line, rounded for display and raw for computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub slope_err: f64,
    pub intercept: f64,
    pub intercept_err: f64,
    pub slope_raw: f64,
    pub slope_err_raw: f64,
    pub intercept_raw: f64,
    pub intercept_err_raw: f64,
}

impl RegressionResult {
    fn from_raw(slope: f64, slope_err: f64, intercept: f64, intercept_err: f64) -> Self {
        let (slope_rounded, slope_err_rounded) = round_result(slope, slope_err);
        let (intercept_rounded, intercept_err_rounded) = round_result(intercept, intercept_err);
        Self {
            slope: slope_rounded,
            slope_err: slope_err_rounded,
            intercept: intercept_rounded,
            intercept_err: intercept_err_rounded,
            slope_raw: slope,
            slope_err_raw: slope_err,
            intercept_raw: intercept,
            intercept_err_raw: intercept_err,
        }
    }

    /// Line value at `step`, from the unrounded parameters
    pub fn evaluate(&self, step: f64) -> f64 {
        self.slope_raw * step + self.intercept_raw
    }

    pub fn trend_line(&self, steps: &[f64]) -> Vec<f64> {
        steps.iter().map(|&s| self.evaluate(s)).collect()
    }
}

/// Fit `value = slope·step + intercept` with uncertainties on both axes
///
/// # Errors
/// - `FringeError::Config` for mismatched lengths, fewer than two points,
///   non-finite inputs, negative step uncertainties or value uncertainties
///   that are not strictly positive.
/// - `FringeError::Convergence` if the solver fails.
pub fn linear_estimation(
    steps: &[f64],
    step_errs: &[f64],
    values: &[f64],
    value_errs: &[f64],
    config: &RegressionConfig,
) -> Result<RegressionResult> {
    let n = steps.len();
    if step_errs.len() != n || values.len() != n || value_errs.len() != n {
        return Err(FringeError::Config(format!(
            "regression inputs differ in length: {} steps, {} step errors, {} values, {} value errors",
            n,
            step_errs.len(),
            values.len(),
            value_errs.len()
        )));
    }
    if n < 2 {
        return Err(FringeError::Config(format!(
            "regression needs at least 2 points, got {}",
            n
        )));
    }
    if steps
        .iter()
        .chain(step_errs)
        .chain(values)
        .chain(value_errs)
        .any(|v| !v.is_finite())
    {
        return Err(FringeError::Config(
            "regression inputs must be finite".to_string(),
        ));
    }
    if let Some(e) = step_errs.iter().find(|&&e| e < 0.0) {
        return Err(FringeError::Config(format!(
            "step uncertainty must not be negative, got {}",
            e
        )));
    }
    if let Some(e) = value_errs.iter().find(|&&e| e <= 0.0) {
        return Err(FringeError::Config(format!(
            "value uncertainty must be positive, got {}",
            e
        )));
    }

    let problem = EffectiveVarianceLine {
        x: steps,
        sx: step_errs,
        y: values,
        sy: value_errs,
    };
    let outcome = LevenbergMarquardt::new(&config.solver)
        .minimize(&problem, &[config.initial_slope, config.initial_intercept])
        .map_err(|e| match e {
            FringeError::Convergence(msg) => {
                FringeError::Convergence(format!("linear regression: {}", msg))
            }
            other => other,
        })?;

    let result = RegressionResult::from_raw(
        outcome.params[0],
        outcome.std_errors[0],
        outcome.params[1],
        outcome.std_errors[1],
    );
    log::debug!(
        "Regression over {} points: slope = {} ± {}, intercept = {} ± {}",
        n,
        result.slope,
        result.slope_err,
        result.intercept,
        result.intercept_err
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn perturbed_line() -> (Vec<f64>, Vec<f64>) {
        let ex = [0.05, -0.08, 0.02, 0.1, -0.04, 0.06, -0.1, 0.03, -0.02, 0.07];
        let ey = [0.2, -0.3, 0.1, -0.15, 0.25, -0.05, 0.3, -0.2, 0.1, -0.1];
        let x = (0..10).map(|i| i as f64 + ex[i]).collect();
        let y = (0..10).map(|i| 3.0 * i as f64 + 1.0 + ey[i]).collect();
        (x, y)
    }

    #[test]
    fn test_recovers_line_with_errors_on_both_axes() {
        let (x, y) = perturbed_line();
        let result =
            linear_estimation(&x, &[0.1; 10], &y, &[0.3; 10], &RegressionConfig::default())
                .unwrap();

        assert_relative_eq!(result.slope_raw, 2.995188, epsilon = 1e-5);
        assert_relative_eq!(result.intercept_raw, 1.009695, epsilon = 1e-5);
        assert_relative_eq!(result.slope_err_raw, 0.038119, epsilon = 1e-5);
        assert_relative_eq!(result.intercept_err_raw, 0.203846, epsilon = 1e-5);

        assert_relative_eq!(result.slope, 3.0, max_relative = 1e-12);
        assert_relative_eq!(result.slope_err, 0.04, max_relative = 1e-12);
        assert_relative_eq!(result.intercept, 1.0, max_relative = 1e-12);
        assert_relative_eq!(result.intercept_err, 0.2, max_relative = 1e-12);
    }

    #[test]
    fn test_unequal_uncertainties() {
        let result = linear_estimation(
            &[1.0, 2.0, 3.0],
            &[1.36, 0.7, 0.5],
            &[100.0, 103.0, 104.0],
            &[0.6, 0.5, 0.7],
            &RegressionConfig::default(),
        )
        .unwrap();
        assert_relative_eq!(result.slope_raw, 1.854925, epsilon = 1e-5);
        assert_relative_eq!(result.intercept_raw, 98.718639, epsilon = 1e-4);
        assert_relative_eq!(result.slope_err_raw, 0.668447, epsilon = 1e-5);
        assert_relative_eq!(result.intercept_err_raw, 1.688662, epsilon = 1e-5);
    }

    #[test]
    fn test_two_points_report_unscaled_errors() {
        let result = linear_estimation(
            &[1.0, 2.0],
            &[0.1, 0.1],
            &[4.0, 7.0],
            &[0.2, 0.2],
            &RegressionConfig::default(),
        )
        .unwrap();
        assert_relative_eq!(result.slope_raw, 3.0, epsilon = 1e-9);
        assert_relative_eq!(result.intercept_raw, 1.0, epsilon = 1e-9);
        assert_relative_eq!(result.slope_err_raw, 0.509902, epsilon = 1e-5);
        assert_relative_eq!(result.intercept_err_raw, 0.806226, epsilon = 1e-5);
    }

    #[test]
    fn test_trend_line_uses_raw_values() {
        let (x, y) = perturbed_line();
        let result =
            linear_estimation(&x, &[0.1; 10], &y, &[0.3; 10], &RegressionConfig::default())
                .unwrap();
        let line = result.trend_line(&[0.0, 10.0]);
        assert_eq!(line[0], result.intercept_raw);
        assert_eq!(line[1], 10.0 * result.slope_raw + result.intercept_raw);
        assert_ne!(line[1], 10.0 * result.slope + result.intercept);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = linear_estimation(
            &[1.0, 2.0, 3.0],
            &[0.1, 0.1],
            &[1.0, 2.0, 3.0],
            &[0.1, 0.1, 0.1],
            &RegressionConfig::default(),
        );
        assert!(matches!(result, Err(FringeError::Config(_))));
    }

    #[test]
    fn test_single_point_rejected() {
        let result =
            linear_estimation(&[1.0], &[0.1], &[1.0], &[0.1], &RegressionConfig::default());
        assert!(matches!(result, Err(FringeError::Config(_))));
    }

    #[test]
    fn test_zero_value_uncertainty_rejected() {
        let result = linear_estimation(
            &[1.0, 2.0],
            &[0.0, 0.0],
            &[1.0, 2.0],
            &[0.1, 0.0],
            &RegressionConfig::default(),
        );
        assert!(matches!(result, Err(FringeError::Config(_))));
    }

    #[test]
    fn test_negative_step_uncertainty_rejected() {
        let result = linear_estimation(
            &[1.0, 2.0],
            &[-0.1, 0.1],
            &[1.0, 2.0],
            &[0.1, 0.1],
            &RegressionConfig::default(),
        );
        assert!(matches!(result, Err(FringeError::Config(_))));
    }
}
