//! Serde-loadable configuration for a complete fit.
//!
//! Every field has a default, so a JSON document only needs to name what it
//! changes. The defaults describe a single-season weekly fit for a population
//! of 4,480,486 seeded with one infectious case.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SirFitError};
use crate::integrate::{IntegratorConfig, TimeGrid};
use crate::lm::LmConfig;
use crate::model::SirState;
use crate::parameters::{Parameter, Parameters};

/// Starting value, bounds and `vary` flag for one rate.
///
/// `min` and `max` are optional in JSON; `null` or an absent `max` means no
/// upper bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateConfig {
    pub value: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub vary: bool,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            value: 0.0,
            min: Some(0.0),
            max: None,
            vary: true,
        }
    }
}

impl RateConfig {
    /// A varying rate starting at `value` with bounds `[0, ∞)`.
    pub fn new(value: f64) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    /// Set the bounds.
    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Hold the rate fixed at its value.
    pub fn fixed(mut self) -> Self {
        self.vary = false;
        self
    }

    fn lower(&self) -> f64 {
        self.min.unwrap_or(f64::NEG_INFINITY)
    }

    fn upper(&self) -> f64 {
        self.max.unwrap_or(f64::INFINITY)
    }

    /// Build the named parameter. A value outside the bounds is clamped onto them.
    pub fn to_parameter(&self, name: &str) -> Result<Parameter> {
        let mut param = Parameter::with_bounds(name, self.value, self.lower(), self.upper())?;
        param.set_vary(self.vary);
        Ok(param)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !self.value.is_finite() {
            return Err(SirFitError::InvalidInput(format!(
                "{} starting value must be finite, got {}",
                name, self.value
            )));
        }
        if self.min.map_or(false, f64::is_nan) || self.max.map_or(false, f64::is_nan) {
            return Err(SirFitError::InvalidInput(format!("{} bounds must not be NaN", name)));
        }
        if self.lower() > self.upper() {
            return Err(SirFitError::InvalidInput(format!(
                "{} bounds are inverted: min {} > max {}",
                name,
                self.lower(),
                self.upper()
            )));
        }
        Ok(())
    }
}

/// Everything needed to run one fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitConfig {
    /// Total population N. Default: 4_480_486
    pub population: f64,

    /// Initial infectious count I0. Default: 1
    pub initial_infectious: f64,

    /// Initial recovered count R0. Default: 0
    pub initial_recovered: f64,

    /// Initial susceptible count. Default: `population - I0 - R0`
    pub initial_susceptible: Option<f64>,

    /// Number of weekly grid points. Default: 52
    pub period: usize,

    /// Transmission rate. Default: 1.5 with bounds `[0, ∞)`
    pub beta: RateConfig,

    /// Recovery rate. Default: 0.5 with bounds `[0, ∞)`
    pub gamma: RateConfig,

    pub integrator: IntegratorConfig,

    pub optimizer: LmConfig,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            population: 4_480_486.0,
            initial_infectious: 1.0,
            initial_recovered: 0.0,
            initial_susceptible: None,
            period: 52,
            beta: RateConfig::new(1.5),
            gamma: RateConfig::new(0.5),
            integrator: IntegratorConfig::default(),
            optimizer: LmConfig::default(),
        }
    }
}

impl FitConfig {
    /// Configuration for a population of `population` over `period` weeks, other fields default.
    pub fn new(population: f64, period: usize) -> Self {
        Self {
            population,
            period,
            ..Self::default()
        }
    }

    /// Set the initial infectious and recovered counts.
    pub fn with_initial(mut self, infectious: f64, recovered: f64) -> Self {
        self.initial_infectious = infectious;
        self.initial_recovered = recovered;
        self
    }

    /// Set the starting values of beta and gamma, keeping their bounds.
    pub fn with_start(mut self, beta: f64, gamma: f64) -> Self {
        self.beta.value = beta;
        self.gamma.value = gamma;
        self
    }

    pub fn with_integrator(mut self, integrator: IntegratorConfig) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn with_optimizer(mut self, optimizer: LmConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Initial state `(S0, I0, R0)`.
    pub fn initial_state(&self) -> SirState {
        let susceptible = self
            .initial_susceptible
            .unwrap_or(self.population - self.initial_infectious - self.initial_recovered);
        SirState::new(susceptible, self.initial_infectious, self.initial_recovered)
    }

    /// Weekly grid `0..period-1`.
    pub fn grid(&self) -> Result<TimeGrid> {
        TimeGrid::weeks(self.period)
    }

    /// The fitted parameters `beta` and `gamma`, in that order.
    pub fn parameters(&self) -> Result<Parameters> {
        let mut params = Parameters::new();
        params.add(self.beta.to_parameter("beta")?)?;
        params.add(self.gamma.to_parameter("gamma")?)?;
        Ok(params)
    }

    /// Run every input check that does not need the observed data.
    pub fn validate(&self) -> Result<()> {
        if self.period < 2 {
            return Err(SirFitError::InvalidInput(format!(
                "period must be >= 2, got {}",
                self.period
            )));
        }
        self.initial_state().validate_initial(self.population)?;
        self.beta.validate("beta")?;
        self.gamma.validate("gamma")?;
        self.integrator.validate()?;
        self.optimizer.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FitConfig::default();
        assert!(config.validate().is_ok());

        let state = config.initial_state();
        assert_eq!(state.susceptible, 4_480_485.0);
        assert_eq!(state.total(), config.population);

        let params = config.parameters().unwrap();
        assert_eq!(params.names(), vec!["beta", "gamma"]);
        assert_eq!(params.get("beta").unwrap().min(), 0.0);
        assert_eq!(params.get("gamma").unwrap().max(), f64::INFINITY);
    }

    #[test]
    fn test_from_json_partial() {
        let config = FitConfig::from_json(
            r#"{
                "population": 1000,
                "period": 10,
                "gamma": {"value": 0.3, "vary": false},
                "optimizer": {"max_iterations": 50}
            }"#,
        )
        .unwrap();

        assert_eq!(config.population, 1000.0);
        assert_eq!(config.period, 10);
        assert_eq!(config.beta.value, 1.5);
        assert!(!config.gamma.vary);
        assert_eq!(config.gamma.min, Some(0.0));
        assert_eq!(config.optimizer.max_iterations, 50);
        assert!(config.validate().is_ok());

        let params = config.parameters().unwrap();
        assert_eq!(params.varying_count(), 1);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(FitConfig::from_json(r#"{"populaton": 1000}"#).is_err());
        assert!(FitConfig::from_json(r#"{"beta": {"value": 1.0, "lo": 0}}"#).is_err());
    }

    #[test]
    fn test_validation_errors() {
        let bad = [
            FitConfig::new(0.0, 10),
            FitConfig::new(1000.0, 1),
            FitConfig::new(1000.0, 10).with_initial(-1.0, 0.0),
            FitConfig {
                initial_susceptible: Some(10.0),
                ..FitConfig::new(1000.0, 10)
            },
            FitConfig {
                beta: RateConfig::new(1.0).with_bounds(Some(2.0), Some(1.0)),
                ..FitConfig::new(1000.0, 10)
            },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(SirFitError::InvalidInput(_))),
                "{:?}",
                config
            );
        }
    }

    #[test]
    fn test_out_of_bounds_start_clamped() {
        let config = FitConfig::new(1000.0, 10).with_start(-1.0, -0.5);
        assert!(config.validate().is_ok());
        let params = config.parameters().unwrap();
        assert_eq!(params.value_of("beta").unwrap(), 0.0);
        assert_eq!(params.value_of("gamma").unwrap(), 0.0);
    }

    #[test]
    fn test_nested_configs_are_validated() {
        let config = FitConfig::new(1000.0, 10)
            .with_integrator(IntegratorConfig::default().with_tolerances(1e-10, 1e-10))
            .with_optimizer(LmConfig {
                max_iterations: 20,
                ..LmConfig::default()
            });
        assert!(config.validate().is_ok());
        assert_eq!(config.integrator.rtol, 1e-10);
        assert_eq!(config.optimizer.max_iterations, 20);

        let bad_integrator = FitConfig::new(1000.0, 10)
            .with_integrator(IntegratorConfig::default().with_max_steps(0));
        assert!(matches!(bad_integrator.validate(), Err(SirFitError::InvalidInput(_))));

        let bad_optimizer = FitConfig::new(1000.0, 10).with_optimizer(LmConfig {
            initial_lambda: 0.0,
            ..LmConfig::default()
        });
        assert!(matches!(bad_optimizer.validate(), Err(SirFitError::InvalidInput(_))));
    }

    #[test]
    fn test_load_json() {
        let path = std::env::temp_dir().join("sirfit_config_test.json");
        fs::write(&path, r#"{"population": 500, "period": 4}"#).unwrap();
        let config = FitConfig::load_json(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(config.population, 500.0);

        assert!(matches!(
            FitConfig::load_json("/nonexistent/sirfit.json"),
            Err(SirFitError::Io(_))
        ));
    }
}
