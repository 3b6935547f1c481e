//! Damping control for the Levenberg-Marquardt algorithm.
//!
//! The damping parameter λ plays the role of an inverse trust-region radius:
//! it shrinks after steps whose actual reduction agrees with the linear model
//! and grows after rejected steps.

use super::config::LmConfig;

/// Damping controller for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone)]
pub struct TrustRegion {
    /// Current value of the damping parameter
    pub lambda: f64,

    /// Minimum allowed value for the damping parameter
    pub lambda_min: f64,

    /// Maximum allowed value for the damping parameter
    pub lambda_max: f64,

    /// Factor to increase lambda by when a step is rejected
    pub lambda_increase_factor: f64,

    /// Factor to decrease lambda by after a good step
    pub lambda_decrease_factor: f64,

    /// Gain ratio above which lambda is decreased
    pub good_gain_ratio: f64,

    /// Gain ratio below which an accepted step still increases lambda
    pub poor_gain_ratio: f64,
}

impl Default for TrustRegion {
    fn default() -> Self {
        Self::from_config(&LmConfig::default())
    }
}

impl TrustRegion {
    /// Controller seeded from the optimizer configuration.
    pub fn from_config(config: &LmConfig) -> Self {
        Self {
            lambda: config.initial_lambda.clamp(config.min_lambda, config.max_lambda),
            lambda_min: config.min_lambda,
            lambda_max: config.max_lambda,
            lambda_increase_factor: config.lambda_up_factor,
            lambda_decrease_factor: config.lambda_down_factor,
            good_gain_ratio: 0.75,
            poor_gain_ratio: 0.25,
        }
    }

    /// Adjust lambda after a step that lowered the cost.
    pub fn accept(&mut self, gain_ratio: f64) {
        if gain_ratio > self.good_gain_ratio {
            self.lambda = (self.lambda * self.lambda_decrease_factor).max(self.lambda_min);
        } else if gain_ratio < self.poor_gain_ratio {
            self.lambda = (self.lambda * self.lambda_increase_factor).min(self.lambda_max);
        }
    }

    /// Increase lambda after a rejected step.
    ///
    /// Returns false if lambda cannot grow any further, in which case no
    /// amount of further damping can produce a different step.
    pub fn reject(&mut self) -> bool {
        if self.is_saturated() {
            return false;
        }
        let raised = (self.lambda * self.lambda_increase_factor).min(self.lambda_max);
        if raised <= self.lambda {
            return false;
        }
        self.lambda = raised;
        true
    }

    /// Whether lambda sits at its upper limit.
    pub fn is_saturated(&self) -> bool {
        self.lambda >= self.lambda_max
    }

    /// Calculates the gain ratio between actual and predicted reduction.
    ///
    /// # Arguments
    ///
    /// * `current_cost` - The current cost function value
    /// * `new_cost` - The new cost function value after the step
    /// * `predicted_reduction` - The predicted reduction in cost
    pub fn gain_ratio(current_cost: f64, new_cost: f64, predicted_reduction: f64) -> f64 {
        let actual_reduction = current_cost - new_cost;

        if predicted_reduction.abs() <= f64::MIN_POSITIVE {
            if actual_reduction > 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            actual_reduction / predicted_reduction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lambda_updates() {
        let mut tr = TrustRegion::default();
        let start = tr.lambda;

        tr.accept(0.9);
        assert_relative_eq!(tr.lambda, start * 0.1);

        tr.accept(0.5);
        assert_relative_eq!(tr.lambda, start * 0.1);

        tr.accept(0.1);
        assert_relative_eq!(tr.lambda, start);

        assert!(tr.reject());
        assert_relative_eq!(tr.lambda, start * 10.0);
    }

    #[test]
    fn test_saturation() {
        let config = LmConfig {
            initial_lambda: 1.0,
            max_lambda: 100.0,
            ..LmConfig::default()
        };
        let mut tr = TrustRegion::from_config(&config);
        assert!(tr.reject());
        assert!(tr.reject());
        assert!(tr.is_saturated());
        assert!(!tr.reject());
    }

    #[test]
    fn test_zero_lambda_cannot_grow() {
        let mut tr = TrustRegion::default();
        tr.lambda = 0.0;
        assert!(!tr.reject());
        assert_eq!(tr.lambda, 0.0);
    }

    #[test]
    fn test_lower_limit() {
        let config = LmConfig {
            initial_lambda: 1e-3,
            min_lambda: 1e-4,
            ..LmConfig::default()
        };
        let mut tr = TrustRegion::from_config(&config);
        for _ in 0..5 {
            tr.accept(1.0);
        }
        assert_relative_eq!(tr.lambda, 1e-4);
    }

    #[test]
    fn test_gain_ratio() {
        assert_relative_eq!(TrustRegion::gain_ratio(10.0, 6.0, 4.0), 1.0);
        assert_relative_eq!(TrustRegion::gain_ratio(10.0, 9.0, 4.0), 0.25);
        assert_relative_eq!(TrustRegion::gain_ratio(10.0, 9.0, 0.0), 1.0);
        assert_relative_eq!(TrustRegion::gain_ratio(10.0, 11.0, 0.0), 0.0);
    }
}
