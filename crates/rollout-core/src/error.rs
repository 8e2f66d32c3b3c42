//! Unified error types for the rollout ecosystem
//!
//! This module provides a common error type [`PlanError`] that can represent
//! errors from any part of the system. Domain-specific error types (forest
//! validation, accumulation, sequencing) convert to `PlanError` for uniform
//! error handling at API boundaries.
//!
//! # Example
//!
//! ```ignore
//! use rollout_core::{PlanError, PlanResult};
//!
//! fn plan_network(path: &str) -> PlanResult<()> {
//!     let forest = load_forest(path)?;
//!     sequence_buildout(&forest)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all planning operations.
///
/// Mirrors the taxonomy of the core: structural failures of the input
/// forest, missing metric fields, and internal forward-progress failures
/// of the sequencer. All are unrecoverable at the point of detection and
/// propagate to the caller; no silent repair is performed.
#[derive(Error, Debug)]
pub enum PlanError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Input is not a valid rooted forest (cycle, multi-parent, unreachable site)
    #[error("Structure error: {0}")]
    Structure(String),

    /// A site lacks a metric field required by the active objective model
    #[error("Missing metric: {0}")]
    MissingMetric(String),

    /// The sequencing frontier failed to shrink after a selection
    #[error("Progress invariant violated: {0}")]
    Progress(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using PlanError.
pub type PlanResult<T> = Result<T, PlanError>;

// Conversion from anyhow::Error
impl From<anyhow::Error> for PlanError {
    fn from(err: anyhow::Error) -> Self {
        PlanError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for PlanError {
    fn from(s: String) -> Self {
        PlanError::Other(s)
    }
}

impl From<&str> for PlanError {
    fn from(s: &str) -> Self {
        PlanError::Other(s.to_string())
    }
}

// JSON parsing errors
impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Parse(err.to_string())
    }
}

impl From<crate::forest::ForestError> for PlanError {
    fn from(err: crate::forest::ForestError) -> Self {
        PlanError::Structure(err.to_string())
    }
}
