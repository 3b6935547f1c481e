//! Properties every integrated SIR trajectory must satisfy.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use sirfit_rs::{integrate, IntegratorConfig, SirParams, SirProblem, SirState, TimeGrid};
use sirfit_rs::Problem;

const N: f64 = 1000.0;

fn run(beta: f64, gamma: f64, initial: SirState, weeks: usize) -> sirfit_rs::Trajectory {
    integrate(
        &initial,
        &TimeGrid::weeks(weeks).unwrap(),
        N,
        &SirParams::new(beta, gamma),
        &IntegratorConfig::default(),
    )
    .unwrap()
}

fn rate_grid() -> Vec<(f64, f64)> {
    vec![(1.0, 0.3), (1.5, 0.5), (0.2, 0.9), (3.0, 0.1), (0.0, 0.4), (0.8, 0.0)]
}

#[test]
fn test_population_conserved() {
    for (beta, gamma) in rate_grid() {
        let trajectory = run(beta, gamma, SirState::new(999.0, 1.0, 0.0), 20);
        for total in trajectory.totals().iter() {
            assert!(
                (total - N).abs() <= 1e-6 * N,
                "beta={} gamma={} total={}",
                beta,
                gamma,
                total
            );
        }
    }
}

#[test]
fn test_recovered_non_decreasing() {
    for (beta, gamma) in rate_grid() {
        let recovered = run(beta, gamma, SirState::new(990.0, 10.0, 0.0), 30).recovered();
        for w in recovered.windows(2) {
            assert!(w[1] >= w[0], "beta={} gamma={}: {} -> {}", beta, gamma, w[0], w[1]);
        }
    }
}

#[test]
fn test_zero_transmission_is_pure_decay() {
    let gamma = 0.4;
    let initial = SirState::new(990.0, 10.0, 0.0);
    let trajectory = run(0.0, gamma, initial, 15);

    for (t, state) in trajectory.times.iter().zip(trajectory.states.iter()) {
        assert_abs_diff_eq!(state.infectious, 10.0 * (-gamma * t).exp(), epsilon = 1e-4);
        assert_abs_diff_eq!(state.susceptible, 990.0, epsilon = 1e-4);
    }
}

#[test]
fn test_zero_recovery_keeps_recovered_fixed() {
    let initial = SirState::new(980.0, 5.0, 15.0);
    let trajectory = run(1.2, 0.0, initial, 12);
    for r in trajectory.recovered().iter() {
        assert_eq!(*r, 15.0);
    }
}

#[test]
fn test_first_state_is_initial() {
    let initial = SirState::new(999.0, 1.0, 0.0);
    let trajectory = run(1.0, 0.3, initial, 5);
    assert_eq!(trajectory.states[0], initial);
    assert_eq!(trajectory.times, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_integration_is_deterministic() {
    let a = run(1.3, 0.45, SirState::new(999.0, 1.0, 0.0), 52);
    let b = run(1.3, 0.45, SirState::new(999.0, 1.0, 0.0), 52);
    assert_eq!(a.states, b.states);
}

#[test]
fn test_residuals_are_infectious_minus_observed() {
    let observed = ndarray::Array1::linspace(0.0, 40.0, 9);
    let problem = SirProblem::new(
        SirState::new(999.0, 1.0, 0.0),
        N,
        TimeGrid::weeks(9).unwrap(),
        observed.clone(),
        IntegratorConfig::default(),
    )
    .unwrap();

    let residuals = problem.eval(&ndarray::array![1.0, 0.3]).unwrap();
    let infectious = run(1.0, 0.3, SirState::new(999.0, 1.0, 0.0), 9).infectious();

    assert_eq!(residuals.len(), problem.grid().len());
    for i in 0..residuals.len() {
        assert_relative_eq!(residuals[i], infectious[i] - observed[i], epsilon = 1e-12);
    }
}

#[test]
fn test_epidemic_peaks_then_declines() {
    // R0 = 5: the infectious curve has a single interior maximum.
    let infectious = run(2.0, 0.4, SirState::new(999.0, 1.0, 0.0), 40).infectious();
    let peak = infectious
        .iter()
        .enumerate()
        .fold((0, f64::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
    assert!(peak.0 > 0 && peak.0 < 39);
    assert!(infectious[39] < peak.1);
}
