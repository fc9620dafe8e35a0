//! Nonlinear least squares shared by the fringe model fit and the trend
//! regression.
//!
//! Both callers describe their problem through [`LeastSquaresProblem`]
//! (residual vector plus Jacobian) and get back parameters with standard
//! errors, or a `Convergence` error. Nothing else in the crate iterates.
//!
//! The solver is a Levenberg-Marquardt iteration with Marquardt's diagonal
//! scaling, so parameters of very different magnitude (unit amplitudes next
//! to wavenumbers in the thousands) share one damping factor. Termination
//! follows MINPACK:
//!
//! - gradient: every Jacobian column is orthogonal to the residuals to `gtol`
//! - cost: an accepted step reduced the cost by a relative amount `<= ftol`
//! - step: a step (accepted or not) moved the parameters by `<= xtol` relative

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::config::SolverConfig;
use crate::constants::{DAMPING_STEP, MAX_DAMPING, MIN_DAMPING, MIN_DAMPING_DIAGONAL};
use crate::error::{FringeError, Result};

/// Residuals and Jacobian of a least-squares problem
pub trait LeastSquaresProblem {
    fn num_params(&self) -> usize;

    fn num_residuals(&self) -> usize;

    /// Residual vector at `params`
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;

    /// `∂r_i/∂p_j` at `params`, one row per residual
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64>;
}

/// Why the iteration stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    Gradient,
    CostReduction,
    StepSize,
}

/// Converged solution with its uncertainty estimate
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub params: DVector<f64>,
    pub std_errors: DVector<f64>,
    /// Parameter covariance scaled by the residual variance
    pub covariance: DMatrix<f64>,
    /// Sum of squared residuals at the solution
    pub cost: f64,
    pub iterations: usize,
    pub degrees_of_freedom: usize,
    pub termination: Termination,
}

pub struct LevenbergMarquardt {
    config: SolverConfig,
}

impl LevenbergMarquardt {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Minimize the sum of squared residuals starting from `initial`
    ///
    /// # Errors
    /// - `FringeError::Config` if `initial` has the wrong length, is not
    ///   finite, or there are fewer residuals than parameters.
    /// - `FringeError::Convergence` on non-finite residuals or Jacobian,
    ///   exhausted iteration budget, no downhill step, or a singular normal
    ///   matrix at the solution.
    pub fn minimize<P>(&self, problem: &P, initial: &[f64]) -> Result<FitOutcome>
    where
        P: LeastSquaresProblem + ?Sized,
    {
        let n_params = problem.num_params();
        let n_residuals = problem.num_residuals();
        if initial.len() != n_params {
            return Err(FringeError::Config(format!(
                "initial guess has {} values for {} parameters",
                initial.len(),
                n_params
            )));
        }
        if initial.iter().any(|v| !v.is_finite()) {
            return Err(FringeError::Config(format!(
                "initial guess is not finite: {:?}",
                initial
            )));
        }
        if n_residuals < n_params {
            return Err(FringeError::Config(format!(
                "{} residuals cannot determine {} parameters",
                n_residuals, n_params
            )));
        }

        let mut params = DVector::from_column_slice(initial);
        let mut residuals = problem.residuals(&params);
        if !all_finite(residuals.iter()) {
            return Err(FringeError::Convergence(
                "residuals not finite at the initial guess".to_string(),
            ));
        }
        let mut cost = residuals.norm_squared();
        let mut damping = self.config.initial_damping;

        for iteration in 1..=self.config.max_iterations {
            let jac = problem.jacobian(&params);
            if !all_finite(jac.iter()) {
                return Err(FringeError::Convergence(format!(
                    "Jacobian not finite at iteration {}",
                    iteration
                )));
            }
            let normal = jac.tr_mul(&jac);
            let gradient = jac.tr_mul(&residuals);

            if gradient_cosine(&jac, &residuals, &gradient) <= self.config.gtol {
                return self.finish(problem, params, cost, iteration, Termination::Gradient);
            }

            loop {
                let mut damped = normal.clone();
                for i in 0..n_params {
                    damped[(i, i)] += damping * normal[(i, i)].max(MIN_DAMPING_DIAGONAL);
                }

                let Some(chol) = damped.cholesky() else {
                    damping *= DAMPING_STEP;
                    if damping > MAX_DAMPING {
                        return Err(FringeError::Convergence(format!(
                            "damped normal matrix not positive definite at iteration {}",
                            iteration
                        )));
                    }
                    continue;
                };
                let step = chol.solve(&(-&gradient));
                let small_step = step.norm() <= self.config.xtol * (params.norm() + self.config.xtol);

                let trial = &params + &step;
                let trial_residuals = problem.residuals(&trial);
                let trial_cost = trial_residuals.norm_squared();

                if trial_cost.is_finite() && trial_cost < cost {
                    let reduction = (cost - trial_cost) / cost;
                    params = trial;
                    residuals = trial_residuals;
                    cost = trial_cost;
                    damping = (damping / DAMPING_STEP).max(MIN_DAMPING);

                    if reduction <= self.config.ftol {
                        return self.finish(
                            problem,
                            params,
                            cost,
                            iteration,
                            Termination::CostReduction,
                        );
                    }
                    if small_step {
                        return self.finish(problem, params, cost, iteration, Termination::StepSize);
                    }
                    break;
                }

                if small_step {
                    return self.finish(problem, params, cost, iteration, Termination::StepSize);
                }
                damping *= DAMPING_STEP;
                if damping > MAX_DAMPING {
                    return Err(FringeError::Convergence(format!(
                        "no downhill step from cost {:.6e} at iteration {}",
                        cost, iteration
                    )));
                }
            }

            log::trace!(
                "LM iteration {}: cost {:.6e}, damping {:.1e}",
                iteration,
                cost,
                damping
            );
        }

        Err(FringeError::Convergence(format!(
            "no convergence within {} iterations (cost {:.6e})",
            self.config.max_iterations, cost
        )))
    }

    fn finish<P>(
        &self,
        problem: &P,
        params: DVector<f64>,
        cost: f64,
        iterations: usize,
        termination: Termination,
    ) -> Result<FitOutcome>
    where
        P: LeastSquaresProblem + ?Sized,
    {
        let jac = problem.jacobian(&params);
        let normal = jac.tr_mul(&jac);
        let inverse = normal
            .clone()
            .cholesky()
            .map(|c| c.inverse())
            .or_else(|| normal.try_inverse())
            .ok_or_else(|| {
                FringeError::Convergence(
                    "normal matrix singular at the solution; parameters not identifiable"
                        .to_string(),
                )
            })?;

        let degrees_of_freedom = problem.num_residuals() - problem.num_params();
        // With no spare degrees of freedom the residual variance is undefined;
        // report the unscaled covariance.
        let residual_variance = if degrees_of_freedom > 0 {
            cost / degrees_of_freedom as f64
        } else {
            1.0
        };
        let covariance = inverse * residual_variance;

        let diagonal = covariance.diagonal();
        if !all_finite(diagonal.iter()) || diagonal.iter().any(|&v| v < 0.0) {
            return Err(FringeError::Convergence(
                "covariance diagonal not finite and non-negative".to_string(),
            ));
        }
        let std_errors = diagonal.map(f64::sqrt);

        log::debug!(
            "LM converged ({:?}) after {} iterations, cost {:.6e}",
            termination,
            iterations,
            cost
        );

        Ok(FitOutcome {
            params,
            std_errors,
            covariance,
            cost,
            iterations,
            degrees_of_freedom,
            termination,
        })
    }
}

fn all_finite<'a>(mut values: impl Iterator<Item = &'a f64>) -> bool {
    values.all(|v| v.is_finite())
}

/// Largest cosine between the residual vector and a Jacobian column
fn gradient_cosine(jac: &DMatrix<f64>, residuals: &DVector<f64>, gradient: &DVector<f64>) -> f64 {
    let residual_norm = residuals.norm();
    if residual_norm == 0.0 {
        return 0.0;
    }
    jac.column_iter()
        .zip(gradient.iter())
        .filter_map(|(column, g)| {
            let column_norm = column.norm();
            (column_norm > 0.0).then(|| g.abs() / (column_norm * residual_norm))
        })
        .fold(0.0, f64::max)
}
