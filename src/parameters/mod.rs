//! # Parameter System
//!
//! Named parameters with bounds and `vary` flags, similar to lmfit-py.
//!
//! - [`Parameter`]: a value with bounds and a varying flag
//! - [`Parameters`]: an ordered collection; order defines vector positions
//! - [`Bounds`] and [`BoundsTransform`]: keep every trial value inside the box
//!
//! ```rust
//! use sirfit_rs::parameters::Parameters;
//!
//! let mut params = Parameters::new();
//! params.add_param_with_bounds("beta", 1.5, 0.0, f64::INFINITY).unwrap();
//! params.add_param_with_bounds("gamma", 0.5, 0.0, f64::INFINITY).unwrap();
//!
//! // Fix gamma; only beta is searched
//! params.get_mut("gamma").unwrap().set_vary(false);
//! assert_eq!(params.varying_count(), 1);
//! ```

pub mod bounds;
pub mod parameter;
pub mod parameters;

pub use bounds::{Bounds, BoundsError, BoundsTransform};
pub use parameter::{Parameter, ParameterError};
pub use parameters::Parameters;
