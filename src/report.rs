//! Export of fit reports as JSON and trajectory tables as CSV.
//!
//! The CSV holds everything needed to draw the usual figures of a fit: the
//! fitted curve against the observations, residuals against fitted values,
//! and the evolution of I(t) and R(t).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::fit::FitReport;

/// One row of the trajectory table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectoryRow {
    pub time: f64,
    pub susceptible: f64,
    pub infectious: f64,
    pub recovered: f64,
    pub observed: f64,
    pub residual: f64,
}

impl FitReport {
    /// One row per grid point.
    pub fn rows(&self) -> Vec<TrajectoryRow> {
        self.trajectory
            .times
            .iter()
            .zip(self.trajectory.states.iter())
            .zip(self.observed.iter().zip(self.residuals.iter()))
            .map(|((&time, state), (&observed, &residual))| TrajectoryRow {
                time,
                susceptible: state.susceptible,
                infectious: state.infectious,
                recovered: state.recovered,
                observed,
                residual,
            })
            .collect()
    }

    /// Serialize the full report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report to a file.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        debug!(path = %path.display(), "wrote fit report");
        Ok(())
    }

    /// Write the trajectory table as CSV to any writer.
    pub fn write_trajectory<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for row in self.rows() {
            csv.serialize(row)?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Write the trajectory table to a CSV file.
    pub fn write_trajectory_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.write_trajectory(File::create(path)?)?;
        debug!(path = %path.display(), rows = self.trajectory.len(), "wrote trajectory");
        Ok(())
    }
}
