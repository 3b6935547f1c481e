//! # sirfit-rs
//!
//! `sirfit-rs` fits a Susceptible-Infectious-Recovered (SIR) epidemic model to
//! weekly case counts. The transmission rate `beta` and recovery rate `gamma`
//! are estimated by bounded Levenberg-Marquardt least squares, with the model
//! integrated by an adaptive Dormand–Prince 5(4) stepper at every trial point.
//!
//! The library provides:
//! - The SIR right-hand side and an adaptive integrator over a fixed time grid
//! - A Levenberg-Marquardt optimizer with lmfit-style parameter bounds
//! - A fit driver that returns the fitted rates, the trajectory and residuals
//! - CSV input bound by column name and JSON/CSV report export
//!
//! ## Basic Usage
//!
//! ```no_run
//! use sirfit_rs::{fit, ColumnSpec, FitConfig, ObservedSeries};
//!
//! let observed = ObservedSeries::from_csv_path("flu.csv", &ColumnSpec::default())?;
//! let config = FitConfig::new(4_480_486.0, observed.len()).with_start(1.5, 0.5);
//!
//! let report = fit(config, &observed)?;
//! println!("{}", report);
//! report.write_trajectory_csv("fit.csv")?;
//! # Ok::<(), sirfit_rs::SirFitError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod fit;
pub mod integrate;
pub mod lm;
pub mod model;
pub mod parameters;
pub mod problem;
pub mod report;
pub mod residual;
pub mod utils;

// Re-exports for convenience
pub use config::{FitConfig, RateConfig};
pub use data::{ColumnSpec, ObservedSeries};
pub use error::{Result, SirFitError};
pub use fit::{fit, FitReport, SirFit};
pub use integrate::{integrate, IntegratorConfig, TimeGrid, Trajectory};
pub use lm::{ConvergenceStatus, LevenbergMarquardt, LmConfig, LmResult};
pub use model::{sir_derivative, SirModel, SirParams, SirState};
pub use parameters::{Bounds, Parameter, Parameters};
pub use problem::{BoundedProblem, Problem};
pub use report::TrajectoryRow;
pub use residual::SirProblem;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
