//! Configuration options for the Levenberg-Marquardt algorithm.

use serde::{Deserialize, Serialize};

use super::convergence::ConvergenceCriteria;
use crate::utils::finite_difference::DEFAULT_STEP;

/// Method for calculating the Jacobian matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffMethod {
    /// One extra evaluation per parameter
    ForwardDifference,

    /// Two extra evaluations per parameter, second-order accurate
    #[default]
    CentralDifference,

    /// Use the analytical Jacobian provided by the problem implementation
    Analytical,
}

/// Method for solving the damped linear system in each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecompositionMethod {
    /// Cholesky factorization of the damped normal equations
    Cholesky,

    /// QR factorization of the augmented system `[J; sqrt(λD)]`
    QR,

    /// Cholesky, falling back to QR when the matrix is not positive definite
    #[default]
    Auto,
}

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LmConfig {
    /// Maximum number of iterations (accepted Jacobian updates). Default: 200
    pub max_iterations: usize,

    /// Maximum number of residual evaluations, including finite differences. Default: 2000
    pub max_func_evals: usize,

    /// Tolerance for relative reduction of the cost. Default: 1e-10
    pub ftol: f64,

    /// Tolerance for relative change in parameter values. Default: 1e-10
    pub xtol: f64,

    /// Tolerance for the infinity norm of the gradient. Default: 1e-10
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Maximum value for lambda. Default: 1e12
    pub max_lambda: f64,

    /// Method to use for calculating the Jacobian. Default: CentralDifference
    pub diff_method: DiffMethod,

    /// Relative step for finite differences. Default: 1e-6
    pub diff_step: f64,

    /// Method to use for solving the linear system. Default: Auto
    pub decomposition_method: DecompositionMethod,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            max_func_evals: 2000,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
            diff_method: DiffMethod::default(),
            diff_step: DEFAULT_STEP,
            decomposition_method: DecompositionMethod::default(),
        }
    }
}

impl LmConfig {
    /// Termination tolerances as a standalone criteria object.
    pub fn criteria(&self) -> ConvergenceCriteria {
        ConvergenceCriteria::new(self.xtol, self.ftol, self.gtol, self.max_iterations)
    }

    /// Reject configurations the algorithm cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        let positive = [
            ("ftol", self.ftol),
            ("xtol", self.xtol),
            ("gtol", self.gtol),
            ("initial_lambda", self.initial_lambda),
            ("min_lambda", self.min_lambda),
            ("max_lambda", self.max_lambda),
            ("diff_step", self.diff_step),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value >= 0.0) {
                return Err(crate::error::SirFitError::InvalidInput(format!(
                    "optimizer {} must be finite and >= 0, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("initial_lambda", self.initial_lambda),
            ("min_lambda", self.min_lambda),
        ] {
            if value <= 0.0 {
                return Err(crate::error::SirFitError::InvalidInput(format!(
                    "optimizer {} must be > 0, got {}",
                    name, value
                )));
            }
        }
        if !(self.lambda_up_factor > 1.0 && self.lambda_down_factor > 0.0 && self.lambda_down_factor < 1.0) {
            return Err(crate::error::SirFitError::InvalidInput(format!(
                "optimizer lambda factors must satisfy up > 1 and 0 < down < 1, got up={} down={}",
                self.lambda_up_factor, self.lambda_down_factor
            )));
        }
        if self.min_lambda > self.max_lambda || self.diff_step == 0.0 || self.max_iterations == 0 {
            return Err(crate::error::SirFitError::InvalidInput(
                "optimizer requires min_lambda <= max_lambda, diff_step > 0 and max_iterations > 0"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
