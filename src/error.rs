//! Error types for arrayvault
//!
//! Provides a unified error type for marshaling, store and container operations.

use thiserror::Error;

use crate::types::Kind;

/// Result type alias using MarshalError
pub type Result<T> = std::result::Result<T, MarshalError>;

/// Unified error type for arrayvault operations
///
/// Every error is terminal for the call that produced it; nothing in this
/// crate retries.
#[derive(Debug, Error)]
pub enum MarshalError {
    // -------------------------------------------------------------------------
    // Type Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported type: {0:?} has no stored representation")]
    UnsupportedType(Kind),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Type mismatch in '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("Type construction failed: {0}")]
    TypeConstructionFailure(String),

    // -------------------------------------------------------------------------
    // Buffer Errors
    // -------------------------------------------------------------------------
    #[error("Allocation failed: {0}")]
    AllocationFailure(String),

    #[error("Unexpected variable-length size: expected 1, got {0}")]
    UnexpectedLength(u64),

    #[error("Invalid indirection: slot {slot} out of {available}")]
    InvalidIndirection { slot: u64, available: usize },

    #[error("Destination is not addressable")]
    NotAddressable,

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store operation '{operation}' failed: {reason}")]
    StoreOperationFailed {
        operation: &'static str,
        reason: String,
    },

    // -------------------------------------------------------------------------
    // Container Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Container corruption detected: {0}")]
    Corruption(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MarshalError {
    /// Shorthand for a failed store call
    pub fn store(operation: &'static str, reason: impl Into<String>) -> Self {
        MarshalError::StoreOperationFailed {
            operation,
            reason: reason.into(),
        }
    }
}

impl From<bincode::Error> for MarshalError {
    fn from(e: bincode::Error) -> Self {
        MarshalError::Serialization(e.to_string())
    }
}
