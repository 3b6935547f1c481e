//! Parameters collection
//!
//! Insertion order is significant: it defines the position of each parameter
//! in the full parameter vector handed to a `Problem`, and the position of each
//! varying parameter in the optimizer's internal vector.

use crate::parameters::parameter::{Parameter, ParameterError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// An ordered collection of named parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    params: Vec<Parameter>,
}

impl Parameters {
    /// Create a new empty parameters collection
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter, rejecting duplicate names.
    pub fn add(&mut self, param: Parameter) -> Result<(), ParameterError> {
        if self.contains(param.name()) {
            return Err(ParameterError::DuplicateParameter {
                name: param.name().to_string(),
            });
        }
        self.params.push(param);
        Ok(())
    }

    /// Add an unbounded parameter.
    pub fn add_param(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
        self.add(Parameter::new(name, value))
    }

    /// Add a bounded parameter.
    ///
    /// # Examples
    ///
    /// ```
    /// use sirfit_rs::parameters::Parameters;
    ///
    /// let mut params = Parameters::new();
    /// params.add_param_with_bounds("beta", 1.5, 0.0, f64::INFINITY).unwrap();
    /// params.add_param_with_bounds("gamma", 0.5, 0.0, f64::INFINITY).unwrap();
    /// assert_eq!(params.names(), vec!["beta", "gamma"]);
    /// ```
    pub fn add_param_with_bounds(
        &mut self,
        name: &str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), ParameterError> {
        self.add(Parameter::with_bounds(name, value, min, max)?)
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.iter_mut().find(|p| p.name() == name)
    }

    /// Value of a named parameter, or an error naming the missing parameter.
    pub fn value_of(&self, name: &str) -> Result<f64, ParameterError> {
        self.get(name)
            .map(Parameter::value)
            .ok_or_else(|| ParameterError::ParameterNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(Parameter::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// All current values, in insertion order.
    pub fn values(&self) -> Array1<f64> {
        self.params.iter().map(Parameter::value).collect()
    }

    pub fn varying(&self) -> Vec<&Parameter> {
        self.params.iter().filter(|p| p.vary()).collect()
    }

    pub fn varying_count(&self) -> usize {
        self.params.iter().filter(|p| p.vary()).count()
    }

    /// Internal coordinates of the varying parameters, in insertion order.
    pub fn varying_internal_values(&self) -> Result<Array1<f64>, ParameterError> {
        self.params
            .iter()
            .filter(|p| p.vary())
            .map(Parameter::to_internal)
            .collect::<Result<Vec<_>, _>>()
            .map(Array1::from_vec)
    }

    /// Full external parameter vector for the given internal coordinates.
    ///
    /// Fixed parameters keep their current value. The collection itself is not
    /// modified, so this can be called for every trial point.
    pub fn external_from_internal(&self, internal: &[f64]) -> Result<Array1<f64>, ParameterError> {
        let expected = self.varying_count();
        if internal.len() != expected {
            return Err(ParameterError::LengthMismatch {
                expected,
                actual: internal.len(),
            });
        }

        let mut next = internal.iter();
        Ok(self
            .params
            .iter()
            .map(|p| {
                if p.vary() {
                    next.next().map_or(p.value(), |&x| p.from_internal(x))
                } else {
                    p.value()
                }
            })
            .collect())
    }

    /// Update the varying parameters from internal coordinates.
    pub fn update_from_internal(&mut self, internal: &[f64]) -> Result<(), ParameterError> {
        let external = self.external_from_internal(internal)?;
        for (param, value) in self.params.iter_mut().zip(external.iter()) {
            if param.vary() {
                param.set_value(*value)?;
            }
        }
        Ok(())
    }

    /// Set every parameter's value from a full external vector in insertion order.
    pub fn set_values(&mut self, values: &[f64]) -> Result<(), ParameterError> {
        if values.len() != self.params.len() {
            return Err(ParameterError::LengthMismatch {
                expected: self.params.len(),
                actual: values.len(),
            });
        }
        for (param, value) in self.params.iter_mut().zip(values) {
            param.set_value(*value)?;
        }
        Ok(())
    }

    /// Reset all parameters to their initial values
    pub fn reset(&mut self) {
        for param in self.params.iter_mut() {
            param.reset();
        }
    }
}
