use thiserror::Error;

/// Error types for the sirfit-rs library.
#[derive(Error, Debug)]
pub enum SirFitError {
    /// Malformed configuration, time grid, initial state or observed series.
    ///
    /// Detected before any integration happens and never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The integrator could not meet its tolerances within the step budget.
    #[error("Integration failed: {0}")]
    IntegrationFailure(String),

    /// The optimizer could not produce a usable result at all.
    #[error("Optimization failed: {0}")]
    OptimizationFailure(String),

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error for boundary constraint violations.
    #[error("Bounds error: {0}")]
    Bounds(#[from] crate::parameters::bounds::BoundsError),

    /// Error for parameter-related problems.
    #[error("Parameter error: {0}")]
    Parameter(#[from] crate::parameters::parameter::ParameterError),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SirFitError {
    /// True for failures the optimizer may recover from by rejecting the current step.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SirFitError::IntegrationFailure(_))
    }
}

/// Result type alias for sirfit-rs operations.
pub type Result<T> = std::result::Result<T, SirFitError>;
