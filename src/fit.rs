//! Fit driver: from configuration and observed data to a finished report.

use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::FitConfig;
use crate::data::ObservedSeries;
use crate::error::Result;
use crate::integrate::Trajectory;
use crate::lm::{ConvergenceStatus, LevenbergMarquardt};
use crate::model::SirParams;
use crate::parameters::Parameters;
use crate::residual::SirProblem;

/// Outcome of one fit.
///
/// Produced once per run; `success == false` means the optimizer stopped
/// without converging and `params` are the best values it found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Fitted rates
    pub params: SirParams,

    /// Fitted rates with their bounds and `vary` flags
    pub parameters: Parameters,

    pub success: bool,
    pub status: ConvergenceStatus,
    pub message: String,
    pub iterations: usize,
    pub func_evals: usize,

    /// Final sum of squared residuals
    pub cost: f64,

    /// Model trajectory at the fitted rates
    pub trajectory: Trajectory,

    /// Fitted infectious curve, `trajectory.infectious()`
    pub fitted: Array1<f64>,

    /// `fitted - observed`
    pub residuals: Array1<f64>,

    pub observed: Array1<f64>,
}

impl FitReport {
    /// Basic reproduction number of the fitted rates.
    pub fn r0(&self) -> f64 {
        self.params.r0()
    }

    /// Root mean square of the residuals.
    pub fn rmse(&self) -> f64 {
        if self.residuals.is_empty() {
            return 0.0;
        }
        (self.cost / self.residuals.len() as f64).sqrt()
    }
}

impl fmt::Display for FitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SIR Fit Report:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Sum of squares: {:.6e}", self.cost)?;
        writeln!(f, "  RMSE: {:.6e}", self.rmse())?;
        writeln!(f, "  Parameters:")?;
        for p in self.parameters.iter() {
            let tag = if p.vary() { "" } else { " (fixed)" };
            writeln!(
                f,
                "    {:<6} = {:.6}  [{}, {}]{}",
                p.name(),
                p.value(),
                p.min(),
                p.max(),
                tag
            )?;
        }
        writeln!(f, "  R0 (beta/gamma): {:.4}", self.r0())?;
        if let Some(last) = self.trajectory.last() {
            writeln!(f, "  Final state: {}", last)?;
        }
        Ok(())
    }
}

/// Fits `beta` and `gamma` to an observed infectious series.
#[derive(Debug, Clone)]
pub struct SirFit {
    config: FitConfig,
}

impl SirFit {
    /// Create a driver, validating the configuration.
    pub fn new(config: FitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// The least-squares problem for `observed` under this configuration.
    pub fn problem(&self, observed: &ObservedSeries) -> Result<SirProblem> {
        let grid = self.config.grid()?;
        observed.check_grid(&grid)?;
        SirProblem::new(
            self.config.initial_state(),
            self.config.population,
            grid,
            observed.cases().clone(),
            self.config.integrator.clone(),
        )
    }

    /// Run the fit.
    pub fn run(&self, observed: &ObservedSeries) -> Result<FitReport> {
        let problem = self.problem(observed)?;
        let mut parameters = self.config.parameters()?;

        info!(
            population = self.config.population,
            weeks = self.config.period,
            beta0 = parameters.value_of("beta")?,
            gamma0 = parameters.value_of("gamma")?,
            "starting SIR fit"
        );

        let optimizer = LevenbergMarquardt::with_config(self.config.optimizer.clone());
        let result = optimizer.minimize_bounded(&problem, &parameters)?;

        parameters.set_values(&result.params.to_vec())?;
        let params = SirParams::new(parameters.value_of("beta")?, parameters.value_of("gamma")?);

        let trajectory = problem.trajectory(&params)?;
        let fitted = trajectory.infectious();
        let residuals = &fitted - problem.observed();

        if result.success {
            info!(
                beta = params.beta,
                gamma = params.gamma,
                cost = result.cost,
                iterations = result.iterations,
                "SIR fit converged"
            );
        } else {
            warn!(
                beta = params.beta,
                gamma = params.gamma,
                cost = result.cost,
                status = %result.status,
                "SIR fit did not converge"
            );
        }

        Ok(FitReport {
            params,
            parameters,
            success: result.success,
            status: result.status,
            message: result.message,
            iterations: result.iterations,
            func_evals: result.func_evals,
            cost: result.cost,
            trajectory,
            fitted,
            residuals,
            observed: problem.observed().clone(),
        })
    }
}

/// Validate `config`, then fit it to `observed`.
pub fn fit(config: FitConfig, observed: &ObservedSeries) -> Result<FitReport> {
    SirFit::new(config)?.run(observed)
}
