//! Convergence criteria for the Levenberg-Marquardt algorithm.
//!
//! This module defines the criteria used to determine when an optimization
//! has converged to a solution or has to give up.

use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Possible convergence states for an optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// Converged due to a small relative parameter change.
    ParameterConvergence,

    /// Converged due to a small relative reduction of the cost.
    FunctionValueConvergence,

    /// Converged due to a small gradient.
    GradientConvergence,

    /// Terminated after reaching the maximum number of iterations.
    MaxIterationsReached,

    /// Terminated after exhausting the residual evaluation budget.
    MaxFunctionEvaluationsReached,

    /// Terminated because the damping parameter hit its upper limit without
    /// finding a step that lowers the cost.
    DampingSaturated,

    /// Terminated due to a numerical error.
    NumericalError,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has terminated (either converged or failed).
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::Running => "Optimization is still running",
            ConvergenceStatus::ParameterConvergence => "Converged: small parameter change",
            ConvergenceStatus::FunctionValueConvergence => "Converged: small function value change",
            ConvergenceStatus::GradientConvergence => "Converged: small gradient",
            ConvergenceStatus::MaxIterationsReached => "Terminated: maximum iterations reached",
            ConvergenceStatus::MaxFunctionEvaluationsReached => {
                "Terminated: maximum function evaluations reached"
            }
            ConvergenceStatus::DampingSaturated => {
                "Terminated: damping saturated without reducing the cost"
            }
            ConvergenceStatus::NumericalError => "Terminated: numerical error",
        }
    }
}

impl fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Criteria for determining when the optimization has converged.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceCriteria {
    /// Tolerance for relative change in parameter values.
    pub xtol: f64,

    /// Tolerance for relative reduction of the cost.
    pub ftol: f64,

    /// Tolerance for the infinity norm of the gradient.
    pub gtol: f64,

    /// Maximum number of iterations.
    pub max_iterations: usize,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            xtol: 1e-10,
            ftol: 1e-10,
            gtol: 1e-10,
            max_iterations: 200,
        }
    }
}

impl ConvergenceCriteria {
    /// Creates a new set of convergence criteria with the given tolerances.
    pub fn new(xtol: f64, ftol: f64, gtol: f64, max_iterations: usize) -> Self {
        Self {
            xtol,
            ftol,
            gtol,
            max_iterations,
        }
    }

    /// Largest relative change between two parameter vectors.
    ///
    /// Values below one in magnitude are compared absolutely.
    pub fn relative_change(params: &Array1<f64>, new_params: &Array1<f64>) -> f64 {
        new_params
            .iter()
            .zip(params.iter())
            .map(|(a, b)| (a - b).abs() / b.abs().max(1.0))
            .fold(0.0, f64::max)
    }

    /// Gradient test, applied after every Jacobian evaluation.
    pub fn check_gradient(&self, gradient: &Array1<f64>) -> ConvergenceStatus {
        let norm = gradient.iter().fold(0.0_f64, |acc, g| acc.max(g.abs()));
        if norm <= self.gtol {
            ConvergenceStatus::GradientConvergence
        } else {
            ConvergenceStatus::Running
        }
    }

    /// Tests applied after an accepted step.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values before the step
    /// * `new_params` - The parameter values after the step
    /// * `cost` - The cost before the step
    /// * `new_cost` - The cost after the step
    /// * `iterations` - The number of iterations so far
    pub fn check(
        &self,
        params: &Array1<f64>,
        new_params: &Array1<f64>,
        cost: f64,
        new_cost: f64,
        iterations: usize,
    ) -> ConvergenceStatus {
        if Self::relative_change(params, new_params) < self.xtol {
            return ConvergenceStatus::ParameterConvergence;
        }

        if (cost - new_cost).abs() <= self.ftol * cost.abs() {
            return ConvergenceStatus::FunctionValueConvergence;
        }

        if iterations >= self.max_iterations {
            return ConvergenceStatus::MaxIterationsReached;
        }

        ConvergenceStatus::Running
    }

    /// Test applied after a rejected step: a step too small to move the
    /// parameters means no further progress is possible.
    pub fn check_rejected(&self, params: &Array1<f64>, trial: &Array1<f64>) -> ConvergenceStatus {
        if Self::relative_change(params, trial) < self.xtol {
            ConvergenceStatus::ParameterConvergence
        } else {
            ConvergenceStatus::Running
        }
    }
}
