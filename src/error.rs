//! Error types for the apex-inertial library
//!
//! This module provides the main error and result types used throughout the library.
//! All errors use the `thiserror` crate for automatic trait implementations.

use thiserror::Error;

/// Main result type used throughout the apex-inertial library
pub type InertialResult<T> = Result<T, InertialError>;

/// Main error type for the apex-inertial library
///
/// Numerical degeneracies (near-zero rotation angles) are absorbed internally
/// by small-angle series branches and never reported through this type.
#[derive(Debug, Clone, Error)]
pub enum InertialError {
    /// Invalid input parameters (e.g. a non-positive integration interval)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid or incomplete configuration (e.g. a correction term requested
    /// without the data it needs)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let error = InertialError::InvalidInput("dt must be positive, got -0.01".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid input: dt must be positive, got -0.01"
        );
    }

    #[test]
    fn test_invalid_configuration_display() {
        let error = InertialError::InvalidConfiguration("missing Coriolis rate".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid configuration: missing Coriolis rate"
        );
    }

    #[test]
    fn test_inertial_result_err() {
        let result: InertialResult<i32> = Err(InertialError::InvalidInput("test".to_string()));
        assert!(result.is_err());
    }
}
