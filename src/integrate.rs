//! Adaptive time integration of the SIR model over a fixed output grid.
//!
//! The stepper is an explicit Dormand–Prince 5(4) pair with an embedded error
//! estimate and FSAL stage reuse. Internal steps are chosen by the error
//! controller, and any step that would cross the next grid point is clipped to
//! land on it exactly, so only the requested grid points are reported and no
//! interpolation is involved.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Result, SirFitError};
use crate::model::{OdeSystem, SirModel, SirParams, SirState};

/// Configuration for the adaptive integrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegratorConfig {
    /// Relative tolerance. Default: 1e-8
    pub rtol: f64,

    /// Absolute tolerance. Default: 1e-8
    pub atol: f64,

    /// Initial step size. Zero selects one from the grid span. Default: 0.0
    pub initial_step: f64,

    /// Smallest step the controller may propose before giving up. Default: 1e-12
    pub min_step: f64,

    /// Largest internal step. Default: infinity, written as null in JSON
    #[serde(with = "open_limit")]
    pub max_step: f64,

    /// Maximum number of attempted steps per integration. Default: 100_000
    pub max_steps: usize,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-8,
            initial_step: 0.0,
            min_step: 1e-12,
            max_step: f64::INFINITY,
            max_steps: 100_000,
        }
    }
}

impl IntegratorConfig {
    /// Set the relative and absolute tolerances.
    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    /// Set the maximum number of attempted steps.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the initial step size.
    pub fn with_initial_step(mut self, h0: f64) -> Self {
        self.initial_step = h0;
        self
    }

    /// Set the bounds on the internal step size.
    pub fn with_step_bounds(mut self, min_step: f64, max_step: f64) -> Self {
        self.min_step = min_step;
        self.max_step = max_step;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.rtol.is_finite() || self.rtol <= 0.0 {
            return Err(SirFitError::InvalidInput(format!(
                "integrator rtol must be finite and > 0, got {}",
                self.rtol
            )));
        }
        if !self.atol.is_finite() || self.atol <= 0.0 {
            return Err(SirFitError::InvalidInput(format!(
                "integrator atol must be finite and > 0, got {}",
                self.atol
            )));
        }
        if !(self.min_step > 0.0) || self.max_step < self.min_step {
            return Err(SirFitError::InvalidInput(format!(
                "integrator step bounds must satisfy 0 < min_step <= max_step, got [{}, {}]",
                self.min_step, self.max_step
            )));
        }
        if self.initial_step < 0.0 || !self.initial_step.is_finite() {
            return Err(SirFitError::InvalidInput(format!(
                "integrator initial_step must be finite and >= 0, got {}",
                self.initial_step
            )));
        }
        if self.max_steps == 0 {
            return Err(SirFitError::InvalidInput(
                "integrator max_steps must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    fn first_step(&self, span: f64) -> f64 {
        let h = if self.initial_step > 0.0 {
            self.initial_step
        } else {
            span * 1e-3
        };
        h.max(self.min_step).min(self.max_step).min(span)
    }
}

// JSON has no infinity, so an unlimited step is written as null.
mod open_limit {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// Ordered output times, strictly increasing, with at least two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct TimeGrid {
    points: Vec<f64>,
}

impl TimeGrid {
    /// Build a grid from explicit time points.
    pub fn new(points: Vec<f64>) -> Result<Self> {
        if points.len() < 2 {
            return Err(SirFitError::InvalidInput(format!(
                "time grid has {} point(s), expected at least 2",
                points.len()
            )));
        }
        if let Some(i) = points.iter().position(|t| !t.is_finite()) {
            return Err(SirFitError::InvalidInput(format!(
                "time grid point {} is not finite ({})",
                i, points[i]
            )));
        }
        if let Some(i) = points.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SirFitError::InvalidInput(format!(
                "time grid must be strictly increasing, but t[{}] = {} >= t[{}] = {}",
                i,
                points[i],
                i + 1,
                points[i + 1]
            )));
        }
        Ok(Self { points })
    }

    /// Integer weeks `0, 1, ..., period - 1`.
    pub fn weeks(period: usize) -> Result<Self> {
        Self::new((0..period).map(|w| w as f64).collect())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> f64 {
        self.points[0]
    }

    pub fn end(&self) -> f64 {
        self.points[self.points.len() - 1]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.points
    }

    pub fn to_array(&self) -> Array1<f64> {
        Array1::from_vec(self.points.clone())
    }
}

impl TryFrom<Vec<f64>> for TimeGrid {
    type Error = SirFitError;

    fn try_from(points: Vec<f64>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<TimeGrid> for Vec<f64> {
    fn from(grid: TimeGrid) -> Self {
        grid.points
    }
}

/// Work counters for one integration call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationStats {
    pub rhs_evals: usize,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
}

/// Full SIR state at every grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub times: Vec<f64>,
    pub states: Vec<SirState>,
    #[serde(skip)]
    pub stats: IntegrationStats,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn susceptible(&self) -> Array1<f64> {
        self.states.iter().map(|s| s.susceptible).collect()
    }

    /// The observable compartment.
    pub fn infectious(&self) -> Array1<f64> {
        self.states.iter().map(|s| s.infectious).collect()
    }

    pub fn recovered(&self) -> Array1<f64> {
        self.states.iter().map(|s| s.recovered).collect()
    }

    /// `S + I + R` at every grid point.
    pub fn totals(&self) -> Array1<f64> {
        self.states.iter().map(SirState::total).collect()
    }

    pub fn last(&self) -> Option<&SirState> {
        self.states.last()
    }
}

// Dormand–Prince 5(4) tableau
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th-order weights, used to advance the solution
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Difference between the 5th and embedded 4th order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Integrate an arbitrary system over `grid`, returning one state per grid point.
///
/// The first returned state is `y0` itself. Fails with `IntegrationFailure`
/// when the step budget runs out, the controller needs a step below
/// `min_step`, or the state stops being finite.
pub fn integrate_system<S: OdeSystem>(
    system: &S,
    y0: &[f64],
    grid: &TimeGrid,
    config: &IntegratorConfig,
) -> Result<(Vec<Vec<f64>>, IntegrationStats)> {
    config.validate()?;
    let n = S::DIM;
    if y0.len() != n {
        return Err(SirFitError::DimensionMismatch(format!(
            "initial state has {} components, system has {}",
            y0.len(),
            n
        )));
    }
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(SirFitError::InvalidInput(format!(
            "initial state must be finite, got {:?}",
            y0
        )));
    }

    let mut stats = IntegrationStats::default();
    let mut output = Vec::with_capacity(grid.len());
    output.push(y0.to_vec());

    let mut t = grid.start();
    let mut y = y0.to_vec();
    let mut h = config.first_step(grid.end() - grid.start());

    let mut k1 = vec![0.0; n];
    let mut k2 = vec![0.0; n];
    let mut k3 = vec![0.0; n];
    let mut k4 = vec![0.0; n];
    let mut k5 = vec![0.0; n];
    let mut k6 = vec![0.0; n];
    let mut k7 = vec![0.0; n];
    let mut y_tmp = vec![0.0; n];
    let mut y_new = vec![0.0; n];

    system.rhs(t, &y, &mut k1);
    stats.rhs_evals += 1;

    let mut attempts = 0usize;
    for &target in &grid.as_slice()[1..] {
        while t < target {
            if attempts >= config.max_steps {
                return Err(SirFitError::IntegrationFailure(format!(
                    "exceeded max_steps={} at t={:.6e} before reaching t={:.6e}",
                    config.max_steps, t, target
                )));
            }
            attempts += 1;

            let remaining = target - t;
            let clipped = h >= remaining;
            let h_step = if clipped { remaining } else { h };

            for i in 0..n {
                y_tmp[i] = y[i] + h_step * A21 * k1[i];
            }
            system.rhs(t + C2 * h_step, &y_tmp, &mut k2);

            for i in 0..n {
                y_tmp[i] = y[i] + h_step * (A31 * k1[i] + A32 * k2[i]);
            }
            system.rhs(t + C3 * h_step, &y_tmp, &mut k3);

            for i in 0..n {
                y_tmp[i] = y[i] + h_step * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]);
            }
            system.rhs(t + C4 * h_step, &y_tmp, &mut k4);

            for i in 0..n {
                y_tmp[i] =
                    y[i] + h_step * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
            }
            system.rhs(t + C5 * h_step, &y_tmp, &mut k5);

            for i in 0..n {
                y_tmp[i] = y[i]
                    + h_step
                        * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
            }
            system.rhs(t + h_step, &y_tmp, &mut k6);

            for i in 0..n {
                y_new[i] = y[i]
                    + h_step * (B1 * k1[i] + B3 * k3[i] + B4 * k4[i] + B5 * k5[i] + B6 * k6[i]);
            }

            // FSAL: k7 is k1 of the next step when this one is accepted
            system.rhs(t + h_step, &y_new, &mut k7);
            stats.rhs_evals += 6;

            let mut err_norm = 0.0;
            for i in 0..n {
                let ei = h_step
                    * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i]
                        + E7 * k7[i]);
                let sc = config.atol + config.rtol * y[i].abs().max(y_new[i].abs());
                err_norm += (ei / sc) * (ei / sc);
            }
            err_norm = (err_norm / n as f64).sqrt();

            let accepted = err_norm.is_finite() && err_norm <= 1.0;
            let factor = if !err_norm.is_finite() {
                MIN_FACTOR
            } else if err_norm == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * err_norm.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };

            if accepted {
                if y_new.iter().any(|v| !v.is_finite()) {
                    return Err(SirFitError::IntegrationFailure(format!(
                        "state became non-finite at t={:.6e}",
                        t + h_step
                    )));
                }
                // Land exactly on the grid point when the step was clipped to it
                t = if clipped { target } else { t + h_step };
                y.copy_from_slice(&y_new);
                k1.copy_from_slice(&k7);
                stats.accepted_steps += 1;

                let proposed = h_step * factor;
                h = if clipped { h.max(proposed) } else { proposed };
            } else {
                stats.rejected_steps += 1;
                h = h_step * factor.min(1.0);
                if h < config.min_step {
                    return Err(SirFitError::IntegrationFailure(format!(
                        "step size {:.3e} fell below min_step={:.3e} at t={:.6e}",
                        h, config.min_step, t
                    )));
                }
            }
            h = h.min(config.max_step);
        }
        output.push(y.clone());
    }

    trace!(
        accepted = stats.accepted_steps,
        rejected = stats.rejected_steps,
        rhs_evals = stats.rhs_evals,
        "integration finished"
    );

    Ok((output, stats))
}

/// Integrate the SIR model from `initial` over `grid` for one parameter set.
pub fn integrate(
    initial: &SirState,
    grid: &TimeGrid,
    population: f64,
    params: &SirParams,
    config: &IntegratorConfig,
) -> Result<Trajectory> {
    let model = SirModel::new(population, *params);
    let (raw, stats) = integrate_system(&model, &initial.to_array(), grid, config)?;

    let states = raw
        .iter()
        .map(|y| SirState::new(y[0], y[1], y[2]))
        .collect();

    Ok(Trajectory {
        times: grid.as_slice().to_vec(),
        states,
        stats,
    })
}
