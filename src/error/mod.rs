//! Error types shared across the crate
//!
//! Two families of errors exist:
//!
//! - [`PkpdError`] is fatal to a call. Configuration problems are detected before
//!   any subject is simulated or analyzed, and the call returns early.
//! - [`SubjectError`] is attached to a single subject. A batch analysis never aborts
//!   because of it; the subject is reported in the unqualified list instead.
//!
//! Numeric degeneracies (division by a near-zero `ka - ke`, overflow) are neither:
//! they are replaced by `NaN` in the output and logged with `tracing::warn!`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PkpdError {
    /// A parameter violates its declared domain (e.g. a negative omega)
    #[error("Invalid parameter: {param} = {value}")]
    InvalidParameter { param: String, value: String },

    /// An absorption-limited route was requested without an absorption rate constant
    #[error("Absorption rate constant (ka) is required for non-IV administration: {context}")]
    MissingAbsorptionRate { context: String },

    #[error("Invalid compartment configuration: {reason}")]
    InvalidCompartments { reason: String },

    #[error("Invalid time grid: {reason}")]
    InvalidTimeGrid { reason: String },

    /// The ODE integrator failed to advance the solution
    #[error("ODE integration failed: {0}")]
    Integration(String),

    #[error("Distribution error: {0}")]
    Distribution(String),

    #[error("CSV error: {0}")]
    Csv(String),
}

impl From<diffsol::error::DiffsolError> for PkpdError {
    fn from(e: diffsol::error::DiffsolError) -> Self {
        PkpdError::Integration(e.to_string())
    }
}

impl PkpdError {
    pub(crate) fn invalid(param: impl Into<String>, value: f64) -> Self {
        PkpdError::InvalidParameter {
            param: param.into(),
            value: value.to_string(),
        }
    }
}

/// Reason a subject was excluded from an analysis
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubjectError {
    /// Fewer valid (Time, Concentration) pairs than the analysis requires
    #[error("Insufficient data: {n} valid points, need at least {required}")]
    InsufficientData { n: usize, required: usize },

    /// Non-linear least squares did not converge within the iteration budget
    #[error("Fit did not converge within {iterations} iterations")]
    FitConvergence { iterations: u64 },

    #[error("Degenerate regression: {reason}")]
    DegenerateRegression { reason: String },
}

/// Make sure a value is finite and non-negative
pub(crate) fn ensure_non_negative(param: &str, value: f64) -> Result<(), PkpdError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PkpdError::invalid(param, value))
    }
}

/// Make sure a value is finite and strictly positive
pub(crate) fn ensure_positive(param: &str, value: f64) -> Result<(), PkpdError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PkpdError::invalid(param, value))
    }
}
