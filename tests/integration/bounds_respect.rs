//! The optimizer only ever evaluates the model inside the parameter bounds.

use std::cell::RefCell;

use ndarray::Array1;
use sirfit_rs::lm::{DiffMethod, LevenbergMarquardt};
use sirfit_rs::{
    integrate, FitConfig, IntegratorConfig, Problem, Result, SirParams, SirProblem, SirState,
    TimeGrid,
};

/// Wraps a problem and records every parameter vector it is evaluated at.
struct Recording<P> {
    inner: P,
    seen: RefCell<Vec<Array1<f64>>>,
}

impl<P: Problem> Recording<P> {
    fn new(inner: P) -> Self {
        Self {
            inner,
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl<P: Problem> Problem for Recording<P> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.seen.borrow_mut().push(params.clone());
        self.inner.eval(params)
    }

    fn parameter_count(&self) -> usize {
        self.inner.parameter_count()
    }

    fn residual_count(&self) -> usize {
        self.inner.residual_count()
    }
}

fn sir_problem() -> SirProblem {
    let grid = TimeGrid::weeks(10).unwrap();
    let initial = SirState::new(999.0, 1.0, 0.0);
    let observed = integrate(
        &initial,
        &grid,
        1000.0,
        &SirParams::new(1.0, 0.3),
        &IntegratorConfig::default(),
    )
    .unwrap()
    .infectious();
    SirProblem::new(initial, 1000.0, grid, observed, IntegratorConfig::default()).unwrap()
}

fn assert_all_non_negative(seen: &[Array1<f64>]) {
    assert!(!seen.is_empty());
    for p in seen {
        assert!(p[0] >= 0.0, "beta evaluated at {}", p[0]);
        assert!(p[1] >= 0.0, "gamma evaluated at {}", p[1]);
    }
}

#[test]
fn test_no_negative_rates_from_regular_start() {
    let problem = Recording::new(sir_problem());
    let params = FitConfig::new(1000.0, 10).with_start(1.5, 0.5).parameters().unwrap();

    for method in [DiffMethod::CentralDifference, DiffMethod::ForwardDifference] {
        problem.seen.borrow_mut().clear();
        LevenbergMarquardt::new()
            .with_differentiation_method(method)
            .minimize_bounded(&problem, &params)
            .unwrap();
        assert_all_non_negative(&problem.seen.borrow());
    }
}

#[test]
fn test_no_negative_rates_from_negative_start() {
    let problem = Recording::new(sir_problem());
    let params = FitConfig::new(1000.0, 10).with_start(-2.0, -0.5).parameters().unwrap();

    let result = LevenbergMarquardt::new().minimize_bounded(&problem, &params).unwrap();

    assert_all_non_negative(&problem.seen.borrow());
    assert!(result.params.iter().all(|v| *v >= 0.0));
}

#[test]
fn test_upper_bound_respected() {
    let problem = Recording::new(sir_problem());
    let mut config = FitConfig::new(1000.0, 10).with_start(0.5, 0.5);
    config.beta.max = Some(0.8);
    let params = config.parameters().unwrap();

    let result = LevenbergMarquardt::new().minimize_bounded(&problem, &params).unwrap();

    for p in problem.seen.borrow().iter() {
        assert!(p[0] <= 0.8 && p[0] >= 0.0);
    }
    assert!(result.params[0] <= 0.8);
}
