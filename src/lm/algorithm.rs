//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! This module contains the iteration loop for nonlinear least-squares
//! minimization of `Σ rᵢ(p)²`, plus a bounded entry point that runs the same
//! loop in the internal coordinates of a [`Parameters`] collection.

use ndarray::{Array1, Array2};
use std::fmt;
use tracing::{debug, trace, warn};

use crate::error::{Result, SirFitError};
use crate::parameters::Parameters;
use crate::problem::{BoundedProblem, Problem};
use crate::utils::finite_difference::{central_jacobian, forward_jacobian};

use super::config::{DecompositionMethod, DiffMethod, LmConfig};
use super::convergence::ConvergenceStatus;
use super::step::LmStep;
use super::trust_region::TrustRegion;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of accepted steps
    pub iterations: usize,

    /// Number of residual evaluations, including those spent on finite differences
    pub func_evals: usize,

    /// Whether the optimization converged
    pub success: bool,

    /// Why the iteration stopped
    pub status: ConvergenceStatus,

    /// A message describing the result
    pub message: String,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {}", self.params)?;
        Ok(())
    }
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the maximum number of residual evaluations.
    pub fn with_max_func_evals(mut self, max_func_evals: usize) -> Self {
        self.config.max_func_evals = max_func_evals;
        self
    }

    /// Set the tolerance for relative cost reduction.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for relative parameter change.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for the gradient infinity norm.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set the damping limits.
    pub fn with_lambda_limits(mut self, min_lambda: f64, max_lambda: f64) -> Self {
        self.config.min_lambda = min_lambda;
        self.config.max_lambda = max_lambda;
        self
    }

    /// Set how the Jacobian is computed.
    pub fn with_differentiation_method(mut self, method: DiffMethod) -> Self {
        self.config.diff_method = method;
        self
    }

    /// Set the linear solver used for each step.
    pub fn with_decomposition_method(mut self, method: DecompositionMethod) -> Self {
        self.config.decomposition_method = method;
        self
    }

    /// Residual evaluations charged for one Jacobian.
    fn jacobian_cost<P: Problem>(&self, problem: &P) -> usize {
        let n = problem.parameter_count();
        match self.config.diff_method {
            DiffMethod::ForwardDifference => n,
            DiffMethod::CentralDifference => 2 * n,
            DiffMethod::Analytical if problem.has_custom_jacobian() => 0,
            DiffMethod::Analytical => 2 * n,
        }
    }

    fn jacobian<P: Problem>(
        &self,
        problem: &P,
        params: &Array1<f64>,
        residuals: &Array1<f64>,
    ) -> Result<Array2<f64>> {
        let jac = match self.config.diff_method {
            DiffMethod::ForwardDifference => {
                forward_jacobian(problem, params, residuals, self.config.diff_step)?
            }
            DiffMethod::CentralDifference => central_jacobian(problem, params, self.config.diff_step)?,
            DiffMethod::Analytical => problem.jacobian(params)?,
        };

        if jac.shape() != [residuals.len(), params.len()] {
            return Err(SirFitError::DimensionMismatch(format!(
                "Jacobian has shape {:?}, expected [{}, {}]",
                jac.shape(),
                residuals.len(),
                params.len()
            )));
        }
        Ok(jac)
    }

    /// Minimize the sum of squared residuals of a problem.
    ///
    /// A step is accepted only if it strictly lowers the cost, so the returned
    /// cost never exceeds the cost at the starting point. A trial point whose
    /// evaluation fails with a recoverable error counts as infinitely bad and
    /// is rejected.
    ///
    /// # Arguments
    ///
    /// * `problem` - The problem to solve
    /// * `initial_params` - Initial guess for the parameter values
    ///
    /// # Returns
    ///
    /// * `Ok(LmResult)` whenever the iteration ran, including when it stopped
    ///   without converging (`success == false`)
    /// * `Err(OptimizationFailure)` if the initial point cannot be evaluated
    pub fn minimize<P: Problem>(&self, problem: &P, initial_params: Array1<f64>) -> Result<LmResult> {
        self.config.validate()?;

        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(SirFitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let mut params = initial_params;
        let mut residuals = problem.eval(&params).map_err(|e| {
            SirFitError::OptimizationFailure(format!("initial point cannot be evaluated: {}", e))
        })?;
        if residuals.len() != problem.residual_count() {
            return Err(SirFitError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                problem.residual_count(),
                residuals.len()
            )));
        }
        let mut cost = sum_of_squares(&residuals);
        if !cost.is_finite() {
            return Err(SirFitError::OptimizationFailure(
                "initial residuals are not finite".to_string(),
            ));
        }
        let mut func_evals = 1;
        let mut iterations = 0;

        let criteria = self.config.criteria();
        let mut trust_region = TrustRegion::from_config(&self.config);
        let jac_cost = self.jacobian_cost(problem);
        let max_evals = self.config.max_func_evals;

        debug!(cost, n_params, residuals = residuals.len(), "starting Levenberg-Marquardt");

        let status = 'outer: loop {
            if cost == 0.0 {
                break ConvergenceStatus::FunctionValueConvergence;
            }
            if func_evals + jac_cost > max_evals {
                break ConvergenceStatus::MaxFunctionEvaluationsReached;
            }

            let jacobian = match self.jacobian(problem, &params, &residuals) {
                Ok(jac) => jac,
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "Jacobian evaluation failed");
                    break ConvergenceStatus::NumericalError;
                }
                Err(e) => return Err(e),
            };
            func_evals += jac_cost;

            let gradient = jacobian.t().dot(&residuals);
            let gradient_norm = gradient.iter().fold(0.0_f64, |acc, g| acc.max(g.abs()));
            debug!(
                iteration = iterations,
                cost,
                gradient_norm,
                lambda = trust_region.lambda,
                "Levenberg-Marquardt iteration"
            );
            if criteria.check_gradient(&gradient).is_converged() {
                break ConvergenceStatus::GradientConvergence;
            }

            // Raise the damping until a step lowers the cost.
            loop {
                if func_evals >= max_evals {
                    break 'outer ConvergenceStatus::MaxFunctionEvaluationsReached;
                }

                let step = match LmStep::calculate_step(
                    &jacobian,
                    &residuals,
                    trust_region.lambda,
                    self.config.decomposition_method,
                ) {
                    Ok(step) => step,
                    Err(SirFitError::LinearAlgebra(msg)) => {
                        trace!(lambda = trust_region.lambda, %msg, "step solve failed");
                        if !trust_region.reject() {
                            break 'outer ConvergenceStatus::DampingSaturated;
                        }
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                let trial = &params + &step.step;
                func_evals += 1;
                let trial_residuals = match problem.eval(&trial) {
                    Ok(r) => Some(r),
                    Err(e) if e.is_recoverable() => {
                        warn!(error = %e, lambda = trust_region.lambda, "trial point rejected");
                        None
                    }
                    Err(e) => return Err(e),
                };
                let trial_cost = trial_residuals
                    .as_ref()
                    .map(sum_of_squares)
                    .filter(|c| c.is_finite())
                    .unwrap_or(f64::INFINITY);

                if let (Some(new_residuals), true) = (trial_residuals, trial_cost < cost) {
                    let gain = TrustRegion::gain_ratio(cost, trial_cost, step.predicted_reduction);
                    trust_region.accept(gain);
                    iterations += 1;

                    let status = criteria.check(&params, &trial, cost, trial_cost, iterations);
                    trace!(
                        iteration = iterations,
                        cost = trial_cost,
                        gain,
                        lambda = trust_region.lambda,
                        "step accepted"
                    );

                    params = trial;
                    residuals = new_residuals;
                    cost = trial_cost;

                    if status.is_terminated() {
                        break 'outer status;
                    }
                    continue 'outer;
                }

                if criteria.check_rejected(&params, &trial).is_converged() {
                    break 'outer ConvergenceStatus::ParameterConvergence;
                }
                if !trust_region.reject() {
                    break 'outer ConvergenceStatus::DampingSaturated;
                }
            }
        };

        let success = status.is_converged();
        if success {
            debug!(cost, iterations, func_evals, %status, "Levenberg-Marquardt finished");
        } else {
            warn!(cost, iterations, func_evals, %status, "Levenberg-Marquardt did not converge");
        }

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            success,
            status,
            message: status.description().to_string(),
        })
    }

    /// Minimize over a parameter collection, honoring its bounds and `vary` flags.
    ///
    /// The problem's parameter vector is laid out in the collection's order.
    /// The returned `params` are external values for every parameter, fixed
    /// ones included, and always lie within their bounds.
    pub fn minimize_bounded<P: Problem + ?Sized>(
        &self,
        problem: &P,
        parameters: &Parameters,
    ) -> Result<LmResult> {
        let bounded = BoundedProblem::new(problem, parameters)?;
        let start = bounded.initial_internal()?;

        if start.is_empty() {
            // Nothing varies: report the cost at the given values.
            let params = parameters.values();
            let residuals = problem.eval(&params).map_err(|e| {
                SirFitError::OptimizationFailure(format!("initial point cannot be evaluated: {}", e))
            })?;
            let cost = sum_of_squares(&residuals);
            return Ok(LmResult {
                params,
                residuals,
                cost,
                iterations: 0,
                func_evals: 1,
                success: true,
                status: ConvergenceStatus::ParameterConvergence,
                message: "No varying parameters".to_string(),
            });
        }

        let result = self.minimize(&bounded, start)?;
        let params = bounded.to_external(&result.params)?;

        Ok(LmResult { params, ..result })
    }
}
