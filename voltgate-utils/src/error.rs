//! Error types for voltgate
//!
//! Provides a unified error type used across all voltgate crates.

use std::path::PathBuf;

/// Main error type for voltgate operations
#[derive(Debug, thiserror::Error)]
pub enum VoltgateError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Socket Errors ===

    #[error("Socket error: {0}")]
    Socket(String),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Device / Session Errors ===

    #[error("Unknown device identifier: {0}")]
    DeviceNotFound(String),

    #[error("Device already holds a live session: {0}")]
    DeviceAlreadyConnected(String),

    #[error("Session closed for device: {0}")]
    SessionClosed(String),

    #[error("Outbound queue full for device: {0}")]
    OutboundFull(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VoltgateError {
    /// Create a socket error
    pub fn socket(msg: impl Into<String>) -> Self {
        Self::Socket(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check whether this error terminates its session
    ///
    /// Socket failures are fatal for the connection that produced them; the
    /// device must re-establish the socket. Everything else is recoverable
    /// in place.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Socket(_) | Self::Io(_) | Self::SessionClosed(_))
    }
}

/// Result type alias using VoltgateError
pub type Result<T> = std::result::Result<T, VoltgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VoltgateError::DeviceNotFound("CP-0001".into());
        assert_eq!(err.to_string(), "Unknown device identifier: CP-0001");
    }

    #[test]
    fn test_error_display_already_connected() {
        let err = VoltgateError::DeviceAlreadyConnected("CP-0001".into());
        assert_eq!(
            err.to_string(),
            "Device already holds a live session: CP-0001"
        );
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = VoltgateError::FileRead {
            path: PathBuf::from("/etc/voltgate.toml"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/etc/voltgate.toml"));
    }

    #[test]
    fn test_error_display_config_invalid() {
        let err = VoltgateError::ConfigInvalid {
            path: PathBuf::from("/home/user/.config/voltgate/voltgate.toml"),
            message: "syntax error".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("voltgate.toml"));
        assert!(msg.contains("syntax error"));
    }

    #[test]
    fn test_socket_helper() {
        let err = VoltgateError::socket("connection reset by peer");
        assert!(matches!(err, VoltgateError::Socket(_)));
        assert_eq!(err.to_string(), "Socket error: connection reset by peer");
    }

    #[test]
    fn test_config_helper() {
        let err = VoltgateError::config("missing required field 'auth_token'");
        assert!(matches!(err, VoltgateError::Config(_)));
        assert!(err.to_string().contains("missing required field"));
    }

    #[test]
    fn test_internal_helper() {
        let err = VoltgateError::internal("invariant violated");
        assert!(matches!(err, VoltgateError::Internal(_)));
        assert_eq!(err.to_string(), "Internal error: invariant violated");
    }

    #[test]
    fn test_session_fatal() {
        assert!(VoltgateError::socket("reset").is_session_fatal());
        assert!(VoltgateError::SessionClosed("CP-1".into()).is_session_fatal());
        assert!(!VoltgateError::OutboundFull("CP-1".into()).is_session_fatal());
        assert!(!VoltgateError::DeviceNotFound("CP-1".into()).is_session_fatal());
        assert!(!VoltgateError::config("bad").is_session_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: VoltgateError = io_err.into();
        assert!(matches!(err, VoltgateError::Io(_)));
    }

    #[test]
    fn test_result_ok() {
        let result: Result<i32> = Ok(42);
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_error_debug() {
        let err = VoltgateError::OutboundFull("CP-7".into());
        let debug = format!("{:?}", err);
        assert!(debug.contains("OutboundFull"));
        assert!(debug.contains("CP-7"));
    }
}
