//! File formats at the edges of a fit: CSV in, JSON config, JSON and CSV out.

use std::fs;
use std::path::PathBuf;

use approx::assert_relative_eq;
use sirfit_rs::{fit, ColumnSpec, FitConfig, FitReport, ObservedSeries, SirFitError};

use crate::test_helpers::synthetic_cases;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sirfit_io_{}_{}", std::process::id(), name))
}

#[test]
fn test_fit_from_csv_file() {
    let cases = synthetic_cases(1000.0, 1.0, 10, 1.0, 0.3);

    // Extra column first and case column before the time column.
    let mut text = String::from("Region,Cases,Week\n");
    for (week, c) in cases.iter().enumerate() {
        text.push_str(&format!("north,{:.12},{}\n", c, week));
    }
    let path = temp_path("observed.csv");
    fs::write(&path, text).unwrap();

    let observed = ObservedSeries::from_csv_path(&path, &ColumnSpec::default());
    fs::remove_file(&path).ok();
    let observed = observed.unwrap();
    assert_eq!(observed.len(), 10);

    let report = fit(FitConfig::new(1000.0, 10).with_start(1.5, 0.5), &observed).unwrap();
    assert!(report.success, "{}", report);
    assert_relative_eq!(report.params.beta, 1.0, max_relative = 0.01);
    assert_relative_eq!(report.params.gamma, 0.3, max_relative = 0.01);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = ObservedSeries::from_csv_path(temp_path("absent.csv"), &ColumnSpec::default());
    assert!(matches!(result, Err(SirFitError::Io(_))));
}

#[test]
fn test_config_file() {
    let path = temp_path("config.json");
    fs::write(
        &path,
        r#"{
            "population": 1000,
            "period": 10,
            "beta": {"value": 1.5},
            "gamma": {"value": 0.5, "max": 2.0},
            "integrator": {"rtol": 1e-9, "atol": 1e-9}
        }"#,
    )
    .unwrap();

    let config = FitConfig::load_json(&path);
    fs::remove_file(&path).ok();
    let config = config.unwrap();

    assert_eq!(config.period, 10);
    assert_eq!(config.initial_infectious, 1.0);
    assert_eq!(config.beta.min, Some(0.0));
    assert_eq!(config.gamma.max, Some(2.0));
    assert_eq!(config.integrator.rtol, 1e-9);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_rejects_unknown_fields() {
    let result = FitConfig::from_json(r#"{"population": 1000, "weeks": 10}"#);
    assert!(matches!(result, Err(SirFitError::Json(_))));
}

#[test]
fn test_report_exports() {
    let observed = ObservedSeries::from_cases(synthetic_cases(1000.0, 1.0, 8, 1.0, 0.3)).unwrap();
    let report = fit(FitConfig::new(1000.0, 8).with_start(1.5, 0.5), &observed).unwrap();

    let json_path = temp_path("report.json");
    let csv_path = temp_path("trajectory.csv");
    report.write_json(&json_path).unwrap();
    report.write_trajectory_csv(&csv_path).unwrap();

    let json = fs::read_to_string(&json_path).unwrap();
    let csv = fs::read_to_string(&csv_path).unwrap();
    fs::remove_file(&json_path).ok();
    fs::remove_file(&csv_path).ok();

    let back: FitReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back.params, report.params);
    assert_eq!(back.status, report.status);
    assert_eq!(back.fitted, report.fitted);

    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["time", "susceptible", "infectious", "recovered", "observed", "residual"]
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 8);
    for (i, row) in rows.iter().enumerate() {
        let time: f64 = row[0].parse().unwrap();
        let infectious: f64 = row[2].parse().unwrap();
        assert_eq!(time, i as f64);
        assert_relative_eq!(infectious, report.fitted[i], max_relative = 1e-12);
    }
}
