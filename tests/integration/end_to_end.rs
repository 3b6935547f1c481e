//! Fits against synthetic data generated with known rates.

use approx::assert_relative_eq;
use sirfit_rs::{
    fit, integrate, ConvergenceStatus, FitConfig, IntegratorConfig, ObservedSeries, SirFit,
    SirParams, SirState, TimeGrid,
};

fn synthetic(population: f64, infectious: f64, weeks: usize, beta: f64, gamma: f64) -> ObservedSeries {
    let trajectory = integrate(
        &SirState::new(population - infectious, infectious, 0.0),
        &TimeGrid::weeks(weeks).unwrap(),
        population,
        &SirParams::new(beta, gamma),
        &IntegratorConfig::default(),
    )
    .unwrap();
    ObservedSeries::from_cases(trajectory.infectious()).unwrap()
}

#[test]
fn test_recovers_known_rates() {
    let observed = synthetic(1000.0, 1.0, 10, 1.0, 0.3);
    let config = FitConfig::new(1000.0, 10)
        .with_initial(1.0, 0.0)
        .with_start(1.5, 0.5);

    let report = fit(config, &observed).unwrap();

    assert!(report.success, "{}", report);
    assert!(report.status.is_converged());
    assert_relative_eq!(report.params.beta, 1.0, max_relative = 0.01);
    assert_relative_eq!(report.params.gamma, 0.3, max_relative = 0.01);
    assert!(report.cost < 1e-3, "SSR = {}", report.cost);

    assert_eq!(report.fitted.len(), 10);
    assert_eq!(report.trajectory.len(), 10);
    assert_eq!(report.observed, *observed.cases());
    for i in 0..10 {
        assert_relative_eq!(
            report.residuals[i],
            report.fitted[i] - report.observed[i],
            epsilon = 1e-12
        );
    }
}

#[test]
fn test_recovers_rates_from_clamped_start() {
    // Both starting values are clamped onto the lower bound of zero.
    let observed = synthetic(1000.0, 1.0, 10, 1.0, 0.3);
    let config = FitConfig::new(1000.0, 10).with_start(-2.0, -1.0);

    let report = fit(config, &observed).unwrap();

    assert!(report.success, "{}", report);
    assert_relative_eq!(report.params.beta, 1.0, max_relative = 0.01);
    assert_relative_eq!(report.params.gamma, 0.3, max_relative = 0.01);
    assert!(report.cost < 1e-3, "SSR = {}", report.cost);
}

#[test]
fn test_fit_is_deterministic() {
    let observed = synthetic(1000.0, 1.0, 10, 1.0, 0.3);
    let config = FitConfig::new(1000.0, 10).with_start(1.5, 0.5);

    let a = fit(config.clone(), &observed).unwrap();
    let b = fit(config, &observed).unwrap();

    assert_eq!(a.params, b.params);
    assert_eq!(a.iterations, b.iterations);
    assert_eq!(a.func_evals, b.func_evals);
}

#[test]
fn test_longer_season_larger_population() {
    let observed = synthetic(100_000.0, 10.0, 30, 0.9, 0.45);
    let config = FitConfig::new(100_000.0, 30)
        .with_initial(10.0, 0.0)
        .with_start(1.2, 0.6);

    let report = fit(config, &observed).unwrap();

    assert!(report.success, "{}", report);
    assert_relative_eq!(report.params.beta, 0.9, max_relative = 0.01);
    assert_relative_eq!(report.params.gamma, 0.45, max_relative = 0.01);
}

#[test]
fn test_iteration_budget_reports_failure() {
    let observed = synthetic(1000.0, 1.0, 10, 1.0, 0.3);
    let mut config = FitConfig::new(1000.0, 10).with_start(1.5, 0.5);
    config.optimizer.max_iterations = 1;

    let report = SirFit::new(config).unwrap().run(&observed).unwrap();

    assert!(!report.success);
    assert_eq!(report.status, ConvergenceStatus::MaxIterationsReached);
    assert_eq!(report.iterations, 1);
    // The best point found is still reported with a consistent trajectory.
    assert_eq!(report.fitted, report.trajectory.infectious());
}
