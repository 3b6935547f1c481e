//! Finite difference methods for numerical differentiation.
//!
//! The residuals of an integrated ODE carry solver noise of roughly the
//! integrator tolerance, so the perturbation is a relative step well above
//! machine epsilon rather than the textbook `sqrt(eps)`.

use crate::error::{Result, SirFitError};
use crate::problem::Problem;
use ndarray::{Array1, Array2};

/// Default relative step for finite differences.
pub const DEFAULT_STEP: f64 = 1e-6;

/// Perturbation used for parameter `x`: relative for large values, absolute near zero.
fn perturbation(x: f64, step: f64) -> f64 {
    step * x.abs().max(1.0)
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SirFitError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            expected, actual
        )));
    }
    Ok(())
}

/// Jacobian by forward differences, reusing the residuals already computed at `params`.
///
/// J[i,j] = ∂residual[i]/∂param[j]. Costs one evaluation per parameter.
pub fn forward_jacobian(
    problem: &dyn Problem,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    step: f64,
) -> Result<Array2<f64>> {
    let n_params = params.len();
    let n_residuals = residuals.len();
    check_len(problem.residual_count(), n_residuals)?;

    let mut jac = Array2::zeros((n_residuals, n_params));

    for j in 0..n_params {
        let h = perturbation(params[j], step);
        let mut perturbed = params.clone();
        perturbed[j] += h;

        let r_plus = problem.eval(&perturbed)?;
        check_len(n_residuals, r_plus.len())?;

        for i in 0..n_residuals {
            jac[[i, j]] = (r_plus[i] - residuals[i]) / h;
        }
    }

    Ok(jac)
}

/// Jacobian by central differences. Costs two evaluations per parameter.
pub fn central_jacobian(problem: &dyn Problem, params: &Array1<f64>, step: f64) -> Result<Array2<f64>> {
    let n_params = params.len();
    let n_residuals = problem.residual_count();

    let mut jac = Array2::zeros((n_residuals, n_params));

    for j in 0..n_params {
        let h = perturbation(params[j], step);

        let mut forward = params.clone();
        forward[j] += h;
        let mut backward = params.clone();
        backward[j] -= h;

        let r_plus = problem.eval(&forward)?;
        let r_minus = problem.eval(&backward)?;
        check_len(n_residuals, r_plus.len())?;
        check_len(n_residuals, r_minus.len())?;

        for i in 0..n_residuals {
            jac[[i, j]] = (r_plus[i] - r_minus[i]) / (2.0 * h);
        }
    }

    Ok(jac)
}
