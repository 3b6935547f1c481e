//! Problem definition trait and the bounded-parameter adapter.
//!
//! A `Problem` is a vector-valued residual function of a parameter vector.
//! `BoundedProblem` wraps one so that the optimizer can search an unbounded
//! internal space while the wrapped problem only ever sees feasible values.

use ndarray::{Array1, Array2};

use crate::error::{Result, SirFitError};
use crate::parameters::Parameters;

/// Internal offset applied to starting values that sit on a bound.
///
/// Half a unit moves a start clamped onto `[min, ∞)` to about `min + 0.118`,
/// and one clamped onto a side of `[min, max]` about 6% of the width inward.
const EDGE_NUDGE: f64 = 0.5;

/// A trait representing a nonlinear least squares problem.
pub trait Problem {
    /// Evaluate the residuals at the given parameters.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values at which to evaluate the residuals
    ///
    /// # Returns
    ///
    /// * A vector of residuals, or an error if the evaluation fails
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Evaluate the Jacobian matrix at the given parameters.
    ///
    /// The default uses central finite differences. Problems with an analytical
    /// Jacobian override this together with `has_custom_jacobian`.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        crate::utils::finite_difference::central_jacobian(
            self,
            params,
            crate::utils::finite_difference::DEFAULT_STEP,
        )
    }

    /// Whether `jacobian` is analytical rather than the finite-difference default.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// Evaluate the sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}

/// Presents a problem over external parameters as a problem over the
/// optimizer's internal coordinates.
///
/// Only varying parameters appear in the internal vector. Each evaluation maps
/// the internal vector through the bounds transforms into a fresh external
/// vector, so the wrapped problem is never called outside the bounds.
pub struct BoundedProblem<'a, P: Problem + ?Sized> {
    problem: &'a P,
    parameters: &'a Parameters,
}

impl<'a, P: Problem + ?Sized> BoundedProblem<'a, P> {
    /// Wrap `problem`, whose parameter vector is laid out in `parameters` order.
    pub fn new(problem: &'a P, parameters: &'a Parameters) -> Result<Self> {
        if problem.parameter_count() != parameters.len() {
            return Err(SirFitError::DimensionMismatch(format!(
                "problem expects {} parameters, collection has {}",
                problem.parameter_count(),
                parameters.len()
            )));
        }
        Ok(Self {
            problem,
            parameters,
        })
    }

    /// External parameter vector for an internal point.
    pub fn to_external(&self, internal: &Array1<f64>) -> Result<Array1<f64>> {
        Ok(self.parameters.external_from_internal(&internal.to_vec())?)
    }

    /// Internal starting point taken from the current parameter values.
    ///
    /// The transform is flat at a bound, so a value sitting exactly on one is
    /// moved a small step inward.
    pub fn initial_internal(&self) -> Result<Array1<f64>> {
        let mut internal = self.parameters.varying_internal_values()?;
        for (x, param) in internal.iter_mut().zip(self.parameters.varying()) {
            let on_bound = (param.bounds().has_lower_bound() && param.value() == param.min())
                || (param.bounds().has_upper_bound() && param.value() == param.max());
            if on_bound {
                *x -= EDGE_NUDGE.copysign(*x);
            }
        }
        Ok(internal)
    }
}

impl<'a, P: Problem + ?Sized> Problem for BoundedProblem<'a, P> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let external = self.to_external(params)?;
        self.problem.eval(&external)
    }

    fn parameter_count(&self) -> usize {
        self.parameters.varying_count()
    }

    fn residual_count(&self) -> usize {
        self.problem.residual_count()
    }
}
