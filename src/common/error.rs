//! Error types for mpc_controller

use thiserror::Error;

/// Main error type for the controller and its I/O glue
///
/// Solver non-convergence is deliberately absent: a failed solve is reported
/// through the sentinel [`crate::control::MpcOutput`], not as an error.
#[derive(Debug, Error)]
pub enum MpcError {
    /// Controller configuration rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Parameter file could not be read
    #[error("Cannot load the parameter file: {0}")]
    ConfigLoad(#[from] std::io::Error),

    /// Parameter file could not be parsed
    #[error("Cannot read the parameter file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Input that cannot produce a reference path (too few points, etc.)
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// Telemetry message could not be decoded or encoded
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),

    /// Logger could not be installed
    #[error("An error occured while setting up the logger: {0}")]
    Logger(#[from] log::SetLoggerError),
}

/// Result type alias for controller operations
pub type MpcResult<T> = Result<T, MpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MpcError::DegenerateInput("need at least 4 points".to_string());
        assert_eq!(format!("{}", err), "Degenerate input: need at least 4 points");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MpcError = io_err.into();
        assert!(matches!(err, MpcError::ConfigLoad(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<Vec<f64>>("[1.0,").unwrap_err();
        let err: MpcError = json_err.into();
        assert!(matches!(err, MpcError::Telemetry(_)));
    }
}
