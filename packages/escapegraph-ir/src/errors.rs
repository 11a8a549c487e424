//! Error types for escapegraph-ir
//!
//! Provides unified error handling across the crate. Every variant except
//! `Config` reports a malformed input program: the analysis never produces a
//! partial result once one of these is raised.

use thiserror::Error;

use crate::config::ConfigError;
use crate::features::ir::{FuncId, SiteId, VarId};

/// Main error type for escapegraph-ir operations
#[derive(Debug, Error)]
pub enum EscapeGraphError {
    /// An identifier or allocation site was given a second location
    #[error("Duplicate location for {0}")]
    DuplicateLocation(String),

    /// Reference to a variable that no function in the batch declares
    #[error("Unknown variable {0:?}")]
    UnknownVariable(VarId),

    /// Reference to a function that is not part of the program
    #[error("Unknown function {0:?}")]
    UnknownFunction(FuncId),

    /// Allocation site id reused or out of range
    #[error("Invalid allocation site {0:?}")]
    InvalidSite(SiteId),

    /// Structurally invalid IR (e.g. address of an address)
    #[error("Malformed IR: {0}")]
    MalformedIr(String),

    /// Leak summary string could not be decoded
    #[error("Malformed leak summary: {0}")]
    MalformedSummary(String),

    /// Summary for a function was emitted twice
    #[error("Summary for {0:?} already finalized")]
    SummaryFinalized(FuncId),

    /// Invariant violation inside the analysis itself
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EscapeGraphError {
    /// Create a malformed-IR error
    pub fn malformed(msg: impl Into<String>) -> Self {
        EscapeGraphError::MalformedIr(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        EscapeGraphError::Internal(msg.into())
    }

    /// Whether the error points at the input program rather than the engine
    pub fn is_input_error(&self) -> bool {
        !matches!(
            self,
            EscapeGraphError::Internal(_) | EscapeGraphError::Config(_)
        )
    }
}

/// Result type alias for escape analysis operations
pub type EscapeResult<T> = std::result::Result<T, EscapeGraphError>;
