//! Step calculation for the Levenberg-Marquardt algorithm.
//!
//! The step δ solves the Marquardt-scaled damped normal equations
//!
//! ```text
//! (JᵀJ + λ·D) δ = -Jᵀr,    D = diag(max(JᵀJ_ii, DIAG_FLOOR))
//! ```
//!
//! either by Cholesky factorization or, when the matrix is not numerically
//! positive definite, by QR on the equivalent augmented least-squares system
//! `[J; sqrt(λD)] δ ≈ [-r; 0]`.

use ndarray::{Array1, Array2};
use tracing::trace;

use super::config::DecompositionMethod;
use crate::error::{Result, SirFitError};

/// Smallest scaling entry, so a parameter the residuals ignore still gets damped.
const DIAG_FLOOR: f64 = 1e-12;

/// Result of a Levenberg-Marquardt step calculation.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The calculated step vector
    pub step: Array1<f64>,

    /// Reduction of the sum of squares predicted by the linearized model
    pub predicted_reduction: f64,

    /// The damping parameter used to calculate the step
    pub lambda: f64,
}

/// Handles step calculation for the Levenberg-Marquardt algorithm.
pub struct LmStep;

impl LmStep {
    /// Calculates the Levenberg-Marquardt step.
    ///
    /// # Arguments
    ///
    /// * `jacobian` - The Jacobian matrix at the current position
    /// * `residuals` - The residuals at the current position
    /// * `lambda` - The damping parameter
    /// * `method` - The method to use for the linear solve
    pub fn calculate_step(
        jacobian: &Array2<f64>,
        residuals: &Array1<f64>,
        lambda: f64,
        method: DecompositionMethod,
    ) -> Result<StepResult> {
        let j_t_j = jacobian.t().dot(jacobian);
        let j_t_r = jacobian.t().dot(residuals);
        let scale = Self::scaling(&j_t_j);

        let step = match method {
            DecompositionMethod::QR => Self::solve_qr(jacobian, residuals, &scale, lambda)?,
            DecompositionMethod::Cholesky | DecompositionMethod::Auto => {
                let mut damped = j_t_j.clone();
                for i in 0..damped.nrows() {
                    damped[[i, i]] += lambda * scale[i];
                }
                match Self::solve_cholesky(&damped, &-&j_t_r) {
                    Some(step) => step,
                    None if method == DecompositionMethod::Auto => {
                        trace!(lambda, "Cholesky failed, falling back to QR");
                        Self::solve_qr(jacobian, residuals, &scale, lambda)?
                    }
                    None => {
                        return Err(SirFitError::LinearAlgebra(
                            "damped normal matrix is not positive definite".to_string(),
                        ))
                    }
                }
            }
        };

        if step.iter().any(|v| !v.is_finite()) {
            return Err(SirFitError::LinearAlgebra(
                "step contains non-finite values".to_string(),
            ));
        }

        let predicted_reduction = Self::predicted_reduction(&j_t_j, &j_t_r, &step);

        Ok(StepResult {
            step,
            predicted_reduction,
            lambda,
        })
    }

    /// Marquardt scaling: the diagonal of JᵀJ with a floor.
    pub fn scaling(j_t_j: &Array2<f64>) -> Array1<f64> {
        j_t_j.diag().mapv(|d| d.max(DIAG_FLOOR))
    }

    /// Solves the symmetric system A * x = b by Cholesky factorization.
    ///
    /// Returns `None` when A is not numerically positive definite.
    pub fn solve_cholesky(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
        let n = a.nrows();
        let mut l = Array2::<f64>::zeros((n, n));

        for k in 0..n {
            let mut diag = a[[k, k]];
            for j in 0..k {
                diag -= l[[k, j]] * l[[k, j]];
            }
            if !(diag > 0.0) || !diag.is_finite() {
                return None;
            }
            let lkk = diag.sqrt();
            l[[k, k]] = lkk;

            for i in (k + 1)..n {
                let mut v = a[[i, k]];
                for j in 0..k {
                    v -= l[[i, j]] * l[[k, j]];
                }
                l[[i, k]] = v / lkk;
            }
        }

        // Forward substitution (L * y = b)
        let mut y = b.clone();
        for i in 0..n {
            for j in 0..i {
                y[i] -= l[[i, j]] * y[j];
            }
            y[i] /= l[[i, i]];
        }

        // Backward substitution (L^T * x = y)
        let mut x = Array1::zeros(n);
        for i in (0..n).rev() {
            x[i] = y[i];
            for j in (i + 1)..n {
                x[i] -= l[[j, i]] * x[j];
            }
            x[i] /= l[[i, i]];
        }

        Some(x)
    }

    /// Solves the augmented least-squares system `[J; sqrt(λD)] δ ≈ [-r; 0]`
    /// by modified Gram-Schmidt QR.
    pub fn solve_qr(
        jacobian: &Array2<f64>,
        residuals: &Array1<f64>,
        scale: &Array1<f64>,
        lambda: f64,
    ) -> Result<Array1<f64>> {
        let m = jacobian.nrows();
        let n = jacobian.ncols();
        let rows = m + n;

        let mut q = Array2::<f64>::zeros((rows, n));
        q.slice_mut(ndarray::s![..m, ..]).assign(jacobian);
        for i in 0..n {
            q[[m + i, i]] = (lambda * scale[i]).sqrt();
        }
        let mut rhs = Array1::<f64>::zeros(rows);
        for i in 0..m {
            rhs[i] = -residuals[i];
        }

        let mut r = Array2::<f64>::zeros((n, n));
        for j in 0..n {
            for k in 0..j {
                let dot = (0..rows).map(|i| q[[i, k]] * q[[i, j]]).sum::<f64>();
                r[[k, j]] = dot;
                for i in 0..rows {
                    q[[i, j]] -= dot * q[[i, k]];
                }
            }

            let norm = (0..rows).map(|i| q[[i, j]] * q[[i, j]]).sum::<f64>().sqrt();
            if norm <= f64::EPSILON {
                return Err(SirFitError::LinearAlgebra(format!(
                    "augmented system is rank deficient in column {}",
                    j
                )));
            }
            r[[j, j]] = norm;
            for i in 0..rows {
                q[[i, j]] /= norm;
            }
        }

        let qtb: Array1<f64> = (0..n)
            .map(|j| (0..rows).map(|i| q[[i, j]] * rhs[i]).sum::<f64>())
            .collect();

        // Back substitution (R * x = Qᵀb)
        let mut x = Array1::zeros(n);
        for j in (0..n).rev() {
            let mut v = qtb[j];
            for k in (j + 1)..n {
                v -= r[[j, k]] * x[k];
            }
            x[j] = v / r[[j, j]];
        }

        Ok(x)
    }

    /// Predicted reduction of Σr² under the linearized model:
    /// `‖r‖² - ‖r + Jδ‖² = -2δᵀJᵀr - δᵀJᵀJδ`.
    pub fn predicted_reduction(j_t_j: &Array2<f64>, j_t_r: &Array1<f64>, step: &Array1<f64>) -> f64 {
        -2.0 * step.dot(j_t_r) - step.dot(&j_t_j.dot(step))
    }
}
