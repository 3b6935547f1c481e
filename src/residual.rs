//! Residuals of the SIR model against an observed infectious series.

use ndarray::Array1;
use tracing::trace;

use crate::error::{Result, SirFitError};
use crate::integrate::{integrate, IntegratorConfig, TimeGrid, Trajectory};
use crate::model::{SirParams, SirState};
use crate::problem::Problem;

/// Number of fitted rates: `[beta, gamma]`.
pub const SIR_PARAM_COUNT: usize = 2;

/// Least-squares problem over `[beta, gamma]`.
///
/// Holds only immutable inputs; every evaluation integrates into fresh buffers,
/// so one instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct SirProblem {
    initial: SirState,
    population: f64,
    grid: TimeGrid,
    observed: Array1<f64>,
    integrator: IntegratorConfig,
}

impl SirProblem {
    /// Create a problem, checking that the inputs fit together.
    ///
    /// The observed series needs one finite value per grid point and the initial
    /// state has to sum to `population`.
    pub fn new(
        initial: SirState,
        population: f64,
        grid: TimeGrid,
        observed: Array1<f64>,
        integrator: IntegratorConfig,
    ) -> Result<Self> {
        initial.validate_initial(population)?;
        integrator.validate()?;

        if observed.len() != grid.len() {
            return Err(SirFitError::InvalidInput(format!(
                "observed series has {} values, time grid has {} points",
                observed.len(),
                grid.len()
            )));
        }
        if let Some(i) = observed.iter().position(|v| !v.is_finite()) {
            return Err(SirFitError::InvalidInput(format!(
                "observed value at index {} is not finite",
                i
            )));
        }

        Ok(Self {
            initial,
            population,
            grid,
            observed,
            integrator,
        })
    }

    pub fn initial(&self) -> &SirState {
        &self.initial
    }

    pub fn population(&self) -> f64 {
        self.population
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn observed(&self) -> &Array1<f64> {
        &self.observed
    }

    pub fn integrator(&self) -> &IntegratorConfig {
        &self.integrator
    }

    /// Integrate the model for one parameter set.
    pub fn trajectory(&self, params: &SirParams) -> Result<Trajectory> {
        integrate(
            &self.initial,
            &self.grid,
            self.population,
            params,
            &self.integrator,
        )
    }

    /// Residuals `I_model - observed` for one parameter set.
    pub fn residuals(&self, params: &SirParams) -> Result<Array1<f64>> {
        let trajectory = self.trajectory(params)?;
        Ok(trajectory.infectious() - &self.observed)
    }
}

impl Problem for SirProblem {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() != SIR_PARAM_COUNT {
            return Err(SirFitError::DimensionMismatch(format!(
                "Expected {} parameters [beta, gamma], got {}",
                SIR_PARAM_COUNT,
                params.len()
            )));
        }
        let rates = SirParams::new(params[0], params[1]);
        trace!(beta = rates.beta, gamma = rates.gamma, "evaluating SIR residuals");
        self.residuals(&rates)
    }

    fn parameter_count(&self) -> usize {
        SIR_PARAM_COUNT
    }

    fn residual_count(&self) -> usize {
        self.grid.len()
    }
}
