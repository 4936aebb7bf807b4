//! Unified error type for the surface engine.

use thiserror::Error;

/// All errors that can surface to a caller.
///
/// Recoverable conditions (single-file read errors, malformed manifests,
/// unreadable dependency artifacts, malformed helper records) are logged at
/// warning level and absorbed inside the pipeline; they never appear here.
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// Root path missing or not a directory
    #[error("Path does not exist: {0}")]
    PathNotFound(String),

    /// I/O error (file read/write, directory access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// External usage helper is not installed or not executable
    #[error("Usage helper unavailable: {0}")]
    HelperUnavailable(String),

    /// Cooperative cancellation was requested
    #[error("Operation cancelled")]
    Cancelled,

    /// Mutually exclusive flags or other argument validation error
    #[error("{0}")]
    InvalidArgs(String),

    /// Truly unexpected failure; carries a human-readable message
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SurfaceError {
    /// Stable machine-readable code for the public JSON surface.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PathNotFound(_) => "path_not_found",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::HelperUnavailable(_) => "helper_unavailable",
            Self::Cancelled => "cancelled",
            Self::InvalidArgs(_) => "invalid_args",
            Self::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_not_found_display() {
        let err = SurfaceError::PathNotFound("/nonexistent".to_string());
        assert!(err.to_string().contains("/nonexistent"));
        assert_eq!(err.code(), "path_not_found");
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: SurfaceError = io_err.into();
        assert!(matches!(err, SurfaceError::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_helper_unavailable_display() {
        let err = SurfaceError::HelperUnavailable("python3 not found on PATH".to_string());
        assert!(err.to_string().contains("python3"));
        assert_eq!(err.code(), "helper_unavailable");
    }

    #[test]
    fn test_cancelled_code() {
        assert_eq!(SurfaceError::Cancelled.code(), "cancelled");
    }

    #[test]
    fn test_no_backtrace_in_message() {
        // Surfaced failures carry a message only; stack traces never leak
        // through the public surface.
        let err = SurfaceError::Internal("merge phase poisoned".to_string());
        assert!(!err.to_string().contains("backtrace"));
        assert!(err.to_string().contains("merge phase poisoned"));
    }
}
