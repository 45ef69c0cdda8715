//! Error types for transform operations.
//!
//! Every variant describes a programmer or configuration error; none of them
//! is transient, so callers propagate rather than retry.

use thiserror::Error;

/// Main error type for transform operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// Parameter or option count inconsistent with the declared layout.
    #[error("Configuration mismatch in {operation}: expected {expected}, got {actual}")]
    ConfigurationMismatch {
        operation: &'static str,
        expected: String,
        actual: usize,
    },

    /// A stack coordinate selected a slot outside the valid range.
    #[error("{operation}: stack coordinate {coordinate} maps to index {index}, outside [0, {count})")]
    OutOfRangeIndex {
        operation: &'static str,
        coordinate: f64,
        index: i64,
        count: usize,
    },

    /// The transform kind does not implement the requested operation.
    #[error("{operation} is not supported by {transform}")]
    UnsupportedOperation {
        transform: &'static str,
        operation: &'static str,
    },

    /// A query reached a sub-transform slot that was never set.
    #[error("{operation}: sub-transform slot {index} is not initialized")]
    UninitializedSlot {
        operation: &'static str,
        index: usize,
    },

    /// No transform is registered under the requested type name.
    #[error("Unknown transform type: {0}")]
    UnknownTransform(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Tensor data could not be read back on the host.
    #[error("Tensor data error: {0}")]
    TensorData(String),
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

impl TransformError {
    /// Create a configuration mismatch error.
    pub fn mismatch(operation: &'static str, expected: impl ToString, actual: usize) -> Self {
        Self::ConfigurationMismatch {
            operation,
            expected: expected.to_string(),
            actual,
        }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(transform: &'static str, operation: &'static str) -> Self {
        Self::UnsupportedOperation { transform, operation }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
