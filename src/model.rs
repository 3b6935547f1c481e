//! The SIR compartmental model.
//!
//! The right-hand side is a pure function of `(state, t, population, params)`.
//! Nothing here holds configuration between calls, so the same function can be
//! evaluated for any candidate parameter set the optimizer proposes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SirFitError};

/// Relative slack allowed when checking that an initial state sums to the population.
pub const CONSERVATION_TOLERANCE: f64 = 1e-9;

/// Number of compartments in the SIR model.
pub const SIR_DIM: usize = 3;

/// Compartment counts at a single point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SirState {
    pub susceptible: f64,
    pub infectious: f64,
    pub recovered: f64,
}

impl SirState {
    pub fn new(susceptible: f64, infectious: f64, recovered: f64) -> Self {
        Self {
            susceptible,
            infectious,
            recovered,
        }
    }

    /// Total population represented by this state.
    pub fn total(&self) -> f64 {
        self.susceptible + self.infectious + self.recovered
    }

    pub fn is_finite(&self) -> bool {
        self.susceptible.is_finite() && self.infectious.is_finite() && self.recovered.is_finite()
    }

    pub fn to_array(&self) -> [f64; SIR_DIM] {
        [self.susceptible, self.infectious, self.recovered]
    }

    pub fn from_array(y: &[f64; SIR_DIM]) -> Self {
        Self::new(y[0], y[1], y[2])
    }

    /// Check that this is a usable initial state for a population of `population`.
    ///
    /// Compartments must be finite and non-negative and must add up to the
    /// population. Only initial states are checked; integrated states may
    /// overshoot below zero.
    pub fn validate_initial(&self, population: f64) -> Result<()> {
        if !(population.is_finite() && population > 0.0) {
            return Err(SirFitError::InvalidInput(format!(
                "population must be finite and > 0, got {}",
                population
            )));
        }
        for (name, value) in [
            ("susceptible", self.susceptible),
            ("infectious", self.infectious),
            ("recovered", self.recovered),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SirFitError::InvalidInput(format!(
                    "initial {} must be finite and >= 0, got {}",
                    name, value
                )));
            }
        }
        let total = self.total();
        if (total - population).abs() > CONSERVATION_TOLERANCE * population {
            return Err(SirFitError::InvalidInput(format!(
                "initial state sums to {}, expected population {}",
                total, population
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SirState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "S={:.4}, I={:.4}, R={:.4}",
            self.susceptible, self.infectious, self.recovered
        )
    }
}

/// Transmission and recovery rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SirParams {
    /// Per-contact transmission rate.
    pub beta: f64,
    /// Recovery rate (inverse of the mean infectious duration).
    pub gamma: f64,
}

impl SirParams {
    pub fn new(beta: f64, gamma: f64) -> Self {
        Self { beta, gamma }
    }

    /// Basic reproduction number `beta / gamma`.
    pub fn r0(&self) -> f64 {
        self.beta / self.gamma
    }
}

/// Time derivative of the SIR state.
///
/// `_t` is part of the integration interface only; the model is autonomous.
/// No guard is applied for `population <= 0` or negative compartments, those
/// values flow through the arithmetic unchanged.
#[inline]
pub fn sir_derivative(state: &SirState, _t: f64, population: f64, params: &SirParams) -> SirState {
    let infection = params.beta * state.infectious * state.susceptible / population;
    let recovery = params.gamma * state.infectious;
    SirState {
        susceptible: -infection,
        infectious: infection - recovery,
        recovered: recovery,
    }
}

/// Right-hand side of an ODE system `dy/dt = f(t, y)` of fixed dimension.
pub trait OdeSystem {
    /// Number of state variables.
    const DIM: usize;

    /// Evaluate `f(t, y)` into `dydt`. Both slices have length `DIM`.
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]);
}

/// The SIR model bound to a population and one parameter set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SirModel {
    pub population: f64,
    pub params: SirParams,
}

impl SirModel {
    pub fn new(population: f64, params: SirParams) -> Self {
        Self { population, params }
    }
}

impl OdeSystem for SirModel {
    const DIM: usize = SIR_DIM;

    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) {
        let state = SirState::new(y[0], y[1], y[2]);
        let d = sir_derivative(&state, t, self.population, &self.params);
        dydt[0] = d.susceptible;
        dydt[1] = d.infectious;
        dydt[2] = d.recovered;
    }
}
