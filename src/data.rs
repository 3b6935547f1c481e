//! Observed weekly case counts.
//!
//! Input columns are bound by header name, never by position. The time column
//! must read `0, 1, ..., n-1` in order; a gap or reordering is reported, not
//! repaired.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SirFitError};
use crate::integrate::TimeGrid;

/// Header names of the time and case columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnSpec {
    pub time: String,
    pub cases: String,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            time: "Week".to_string(),
            cases: "Cases".to_string(),
        }
    }
}

impl ColumnSpec {
    pub fn new(time: &str, cases: &str) -> Self {
        Self {
            time: time.to_string(),
            cases: cases.to_string(),
        }
    }
}

/// Case counts indexed by week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedSeries {
    times: Array1<f64>,
    cases: Array1<f64>,
}

impl ObservedSeries {
    /// Build a series from `(week, cases)` pairs.
    ///
    /// Weeks must be `0, 1, ..., n-1` in order and cases must be finite.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        for (i, &(week, cases)) in pairs.iter().enumerate() {
            check_index(i, week)?;
            check_cases(i, cases)?;
        }
        Ok(Self {
            times: pairs.iter().map(|p| p.0).collect(),
            cases: pairs.iter().map(|p| p.1).collect(),
        })
    }

    /// Build a series from case counts alone, indexed `0..n-1`.
    pub fn from_cases(cases: Array1<f64>) -> Result<Self> {
        for (i, &c) in cases.iter().enumerate() {
            check_cases(i, c)?;
        }
        Ok(Self {
            times: (0..cases.len()).map(|i| i as f64).collect(),
            cases,
        })
    }

    /// Read a CSV file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, columns: &ColumnSpec) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        debug!(path = %path.display(), "reading observed series");
        Self::from_reader(file, columns)
    }

    /// Read CSV from any reader. The first row must be the header.
    pub fn from_reader<R: Read>(reader: R, columns: &ColumnSpec) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let time_col = find_column(&headers, &columns.time)?;
        let cases_col = find_column(&headers, &columns.cases)?;

        let mut pairs = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            // 1-based line numbers, after the header row
            let line = i + 2;
            let week = parse_field(&record, time_col, &columns.time, line)?;
            let cases = parse_field(&record, cases_col, &columns.cases, line)?;
            pairs.push((week, cases));
        }

        if pairs.is_empty() {
            return Err(SirFitError::InvalidInput(
                "observed series contains no rows".to_string(),
            ));
        }
        Self::from_pairs(&pairs)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn times(&self) -> &Array1<f64> {
        &self.times
    }

    pub fn cases(&self) -> &Array1<f64> {
        &self.cases
    }

    /// Keep the first `period` weeks.
    pub fn truncate(&self, period: usize) -> Result<Self> {
        if period > self.len() {
            return Err(SirFitError::InvalidInput(format!(
                "requested {} weeks, series has {}",
                period,
                self.len()
            )));
        }
        Ok(Self {
            times: self.times.slice(ndarray::s![..period]).to_owned(),
            cases: self.cases.slice(ndarray::s![..period]).to_owned(),
        })
    }

    /// Check that the series lines up with a time grid point for point.
    pub fn check_grid(&self, grid: &TimeGrid) -> Result<()> {
        if self.len() != grid.len() {
            return Err(SirFitError::InvalidInput(format!(
                "observed series has {} values, time grid has {} points",
                self.len(),
                grid.len()
            )));
        }
        if let Some(i) = self
            .times
            .iter()
            .zip(grid.as_slice())
            .position(|(a, b)| a != b)
        {
            return Err(SirFitError::InvalidInput(format!(
                "observed time {} at index {} does not match grid time {}",
                self.times[i],
                i,
                grid.as_slice()[i]
            )));
        }
        Ok(())
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        SirFitError::InvalidInput(format!(
            "missing column '{}' (found: {})",
            name,
            headers.iter().collect::<Vec<_>>().join(", ")
        ))
    })
}

fn parse_field(record: &StringRecord, col: usize, name: &str, line: usize) -> Result<f64> {
    let raw = record.get(col).ok_or_else(|| {
        SirFitError::InvalidInput(format!("line {}: column '{}' is missing", line, name))
    })?;
    raw.parse::<f64>().map_err(|_| {
        SirFitError::InvalidInput(format!(
            "line {}: column '{}' value '{}' is not a number",
            line, name, raw
        ))
    })
}

fn check_index(i: usize, week: f64) -> Result<()> {
    if week != i as f64 {
        return Err(SirFitError::InvalidInput(format!(
            "time index at row {} is {}, expected {}",
            i, week, i
        )));
    }
    Ok(())
}

fn check_cases(i: usize, cases: f64) -> Result<()> {
    if !cases.is_finite() {
        return Err(SirFitError::InvalidInput(format!(
            "case count at row {} is not finite ({})",
            i, cases
        )));
    }
    Ok(())
}
