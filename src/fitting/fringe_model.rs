//! Five-parameter fringe model and its least-squares fit
//!
//! The profile is the sum of two cosine-modulated Gaussian envelopes:
//!
//! ```text
//! f(x) = ½·B·g_B·(1 + cos(kc·x)) + ½·C·g_C·(1 − cos(kc·x))
//! g_B  = exp(−(km·x)²/2)
//! g_C  = exp(−(D·x)²/2)
//! ```
//!
//! which is the same as `½(B·g_B + C·g_C) + ½(B·g_B − C·g_C)·cos(kc·x)`.
//! `km` sets the width of the bright-fringe envelope and `D` the width of the
//! dark-fringe envelope; only their magnitudes are physical.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::config::{FitConfig, SolverConfig};
use crate::error::{FringeError, Result};
use crate::fitting::least_squares::{LeastSquaresProblem, LevenbergMarquardt, Termination};
use crate::signal_processing::bandpass::FilteredSignal;
use crate::signal_processing::spectrum::WavenumberEstimate;

/// Model parameters, also used for their standard errors
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FringeParams {
    /// Bright-envelope amplitude
    pub b: f64,
    /// Dark-envelope amplitude
    pub c: f64,
    /// Dark-envelope wavenumber
    pub d: f64,
    /// Envelope wavenumber
    pub km: f64,
    /// Carrier wavenumber
    pub kc: f64,
}

impl FringeParams {
    pub fn to_array(self) -> [f64; 5] {
        [self.b, self.c, self.d, self.km, self.kc]
    }

    pub fn from_slice(values: &[f64]) -> Self {
        Self {
            b: values[0],
            c: values[1],
            d: values[2],
            km: values[3],
            kc: values[4],
        }
    }
}

/// Evaluate the model at `x`
pub fn fringe_intensity(x: f64, p: &FringeParams) -> f64 {
    let g_b = (-0.5 * (p.km * x).powi(2)).exp();
    let g_c = (-0.5 * (p.d * x).powi(2)).exp();
    let cs = (p.kc * x).cos();
    0.5 * p.b * g_b * (1.0 + cs) + 0.5 * p.c * g_c * (1.0 - cs)
}

/// Partial derivatives of the model at `x`, in parameter order `(B, C, D, km, kc)`
fn fringe_gradient(x: f64, p: &FringeParams) -> [f64; 5] {
    let x2 = x * x;
    let g_b = (-0.5 * p.km * p.km * x2).exp();
    let g_c = (-0.5 * p.d * p.d * x2).exp();
    let (sn, cs) = (p.kc * x).sin_cos();

    [
        0.5 * g_b * (1.0 + cs),
        0.5 * g_c * (1.0 - cs),
        -0.5 * p.c * g_c * (1.0 - cs) * p.d * x2,
        -0.5 * p.b * g_b * (1.0 + cs) * p.km * x2,
        -0.5 * (p.b * g_b - p.c * g_c) * sn * x,
    ]
}

struct FringeProblem<'a> {
    x: &'a [f64],
    y: &'a [f64],
}

impl LeastSquaresProblem for FringeProblem<'_> {
    fn num_params(&self) -> usize {
        5
    }

    fn num_residuals(&self) -> usize {
        self.x.len()
    }

    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let p = FringeParams::from_slice(params.as_slice());
        DVector::from_iterator(
            self.x.len(),
            self.x
                .iter()
                .zip(self.y.iter())
                .map(|(&x, &y)| fringe_intensity(x, &p) - y),
        )
    }

    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        let p = FringeParams::from_slice(params.as_slice());
        let mut jac = DMatrix::zeros(self.x.len(), 5);
        for (i, &x) in self.x.iter().enumerate() {
            for (j, d) in fringe_gradient(x, &p).into_iter().enumerate() {
                jac[(i, j)] = d;
            }
        }
        jac
    }
}

/// Fitted model with standard errors and diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct FitResult {
    pub params: FringeParams,
    pub std_errors: FringeParams,
    pub sum_squared_residuals: f64,
    pub iterations: usize,
    pub degrees_of_freedom: usize,
    pub termination: Termination,
}

impl FitResult {
    /// `|km|` in rad/m
    pub fn envelope_wavenumber(&self) -> f64 {
        self.params.km.abs()
    }

    pub fn envelope_wavenumber_err(&self) -> f64 {
        self.std_errors.km
    }

    /// `|kc|` in rad/m
    pub fn carrier_wavenumber(&self) -> f64 {
        self.params.kc.abs()
    }

    pub fn carrier_wavenumber_err(&self) -> f64 {
        self.std_errors.kc
    }

    /// `|D|` in rad/m
    pub fn dark_width(&self) -> f64 {
        self.params.d.abs()
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        fringe_intensity(x, &self.params)
    }

    /// `observed - model` at each sample
    pub fn residuals(&self, x: &[f64], observed: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(observed.iter())
            .map(|(&x, &y)| y - self.evaluate(x))
            .collect()
    }
}

/// Initial guess `(A, A, m·km, km, kc)` derived from the spectral estimate
pub fn initial_guess(estimate: &WavenumberEstimate, config: &FitConfig) -> FringeParams {
    FringeParams {
        b: config.amplitude_guess,
        c: config.amplitude_guess,
        d: config.lower_width_multiplier * estimate.km,
        km: estimate.km,
        kc: estimate.kc,
    }
}

/// Fit the model to a band-pass reconstructed profile
pub fn fit_fringe(
    signal: &FilteredSignal,
    estimate: &WavenumberEstimate,
    config: &FitConfig,
) -> Result<FitResult> {
    let initial = initial_guess(estimate, config);
    log::debug!("Fit initial guess: {:?}", initial);
    fit_model(signal.x(), signal.intensity(), initial, &config.solver)
}

/// Fit the model to arbitrary samples starting from `initial`
///
/// # Errors
/// - `FringeError::Config` if the sample counts differ or there are fewer
///   samples than parameters.
/// - `FringeError::Convergence` if the solver fails; the initial guess is
///   never returned in its place.
pub fn fit_model(
    x: &[f64],
    y: &[f64],
    initial: FringeParams,
    solver: &SolverConfig,
) -> Result<FitResult> {
    if x.len() != y.len() {
        return Err(FringeError::Config(format!(
            "fit positions and intensities differ in length: {} vs {}",
            x.len(),
            y.len()
        )));
    }

    let problem = FringeProblem { x, y };
    let outcome = LevenbergMarquardt::new(solver)
        .minimize(&problem, &initial.to_array())
        .map_err(|e| match e {
            FringeError::Convergence(msg) => {
                FringeError::Convergence(format!("fringe model fit: {}", msg))
            }
            other => other,
        })?;

    let result = FitResult {
        params: FringeParams::from_slice(outcome.params.as_slice()),
        std_errors: FringeParams::from_slice(outcome.std_errors.as_slice()),
        sum_squared_residuals: outcome.cost,
        iterations: outcome.iterations,
        degrees_of_freedom: outcome.degrees_of_freedom,
        termination: outcome.termination,
    };
    log::debug!(
        "Fit: km = {:.3} ± {:.3}, kc = {:.3} ± {:.3} ({} iterations)",
        result.envelope_wavenumber(),
        result.envelope_wavenumber_err(),
        result.carrier_wavenumber(),
        result.carrier_wavenumber_err(),
        result.iterations
    );
    Ok(result)
}
