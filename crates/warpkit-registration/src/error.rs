//! Error types for registration operations.
//!
//! This module provides structured error types for the multi-resolution
//! workflow. Transform-level failures are carried unchanged so callers can
//! still match on the precise [`TransformError`] kind.

use thiserror::Error;
use warpkit_core::TransformError;

/// Main error type for registration operations.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Error raised by a transform.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// A lifecycle hook was called out of order.
    #[error("Lifecycle error in {hook}: {message}")]
    Lifecycle { hook: &'static str, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Error reported by the external optimizer.
    #[error("Optimizer error at level {level}: {message}")]
    Optimizer { level: usize, message: String },
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create a lifecycle error.
    pub fn lifecycle(hook: &'static str, message: impl Into<String>) -> Self {
        Self::Lifecycle {
            hook,
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an optimizer error.
    pub fn optimizer(level: usize, message: impl Into<String>) -> Self {
        Self::Optimizer {
            level,
            message: message.into(),
        }
    }

    /// The wrapped transform error, if any.
    pub fn as_transform_error(&self) -> Option<&TransformError> {
        match self {
            Self::Transform(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_error_is_transparent() {
        let err: RegistrationError = TransformError::mismatch("set_parameters", 24, 20).into();
        assert_eq!(
            err.to_string(),
            "Configuration mismatch in set_parameters: expected 24, got 20"
        );
        assert!(matches!(
            err.as_transform_error(),
            Some(TransformError::ConfigurationMismatch { actual: 20, .. })
        ));
    }

    #[test]
    fn test_lifecycle_display() {
        let err = RegistrationError::lifecycle("before_each_resolution", "registration has not started");
        assert_eq!(
            err.to_string(),
            "Lifecycle error in before_each_resolution: registration has not started"
        );
        assert!(err.as_transform_error().is_none());
    }
}
