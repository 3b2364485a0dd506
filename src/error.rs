//! Error types for `pulselink`.
//!
//! Each failure domain gets its own error enum. The containment policy
//! matters more than the types themselves: session errors in periodic
//! tasks are logged and retried, protocol errors are dropped at debug,
//! and state conflicts are rejected without surfacing. No component's
//! failure may terminate another component's task.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for the `pulselink` binary, following Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Device session error (connection failed, command rejected)
    pub const SESSION_ERROR: i32 = 4;

    /// Usage error (invalid arguments)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type aggregating all domain-specific errors.
#[derive(Debug, Error)]
pub enum PulselinkError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Device session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Inbound protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Coordinator state conflict
    #[error(transparent)]
    State(#[from] StateError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PulselinkError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Session(_) => ExitCode::SESSION_ERROR,
            Self::Protocol(_) | Self::State(_) | Self::Json(_) => ExitCode::ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message from the parser
        message: String,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

// ============================================================================
// Device Session Errors
// ============================================================================

/// Device session errors.
///
/// These cover command failures on the session transport. Periodic tasks
/// catch them, log, back off 5 seconds, and retry forever; a session
/// error is never fatal to the coordinator.
#[derive(Debug, Error)]
pub enum SessionError {
    /// I/O error on the session transport
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session was closed by the remote end
    #[error("session closed: {0}")]
    Closed(String),

    /// The device rejected or failed a command
    #[error("command '{op}' failed: {reason}")]
    CommandFailed {
        /// Operation name (e.g. "set_strength")
        op: String,
        /// Reason reported by the device or transport
        reason: String,
    },

    /// Rebind handshake did not complete
    #[error("rebind failed: {0}")]
    RebindFailed(String),
}

// ============================================================================
// Protocol Errors
// ============================================================================

/// Malformed or unexpected inbound messages.
///
/// Never propagated: the offending message is dropped and the error is
/// logged at debug level.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload was not valid JSON (damage feed frames)
    #[error("decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// Address did not resolve to any registered route
    #[error("no route for address: {0}")]
    UnknownAddress(String),

    /// Argument type or range did not match the route's expectation
    #[error("bad argument on {address}: expected {expected}")]
    BadArgument {
        /// Address the message arrived on
        address: String,
        /// Description of the expected argument
        expected: String,
    },
}

// ============================================================================
// State Conflicts
// ============================================================================

/// Coordinator state conflicts.
///
/// Rejected with a log line and no state change; never surfaced to the
/// message source.
#[derive(Debug, Error)]
pub enum StateError {
    /// Fire-mode start requested while a sequence is already armed
    #[error("fire mode already armed")]
    AlreadyArmed,

    /// Fire-mode stop requested while idle
    #[error("fire mode not armed")]
    NotArmed,

    /// Waveform index outside the catalog
    #[error("waveform index {index} out of range (catalog size {size})")]
    WaveformOutOfRange {
        /// Requested index
        index: usize,
        /// Catalog size
        size: usize,
    },
}

/// Result type alias for `pulselink` operations.
pub type Result<T> = std::result::Result<T, PulselinkError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::SESSION_ERROR, 4);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
        assert_eq!(ExitCode::INTERRUPTED, 130);
        assert_eq!(ExitCode::TERMINATED, 143);
    }

    #[test]
    fn test_session_error_exit_code() {
        let err: PulselinkError = SessionError::Closed("peer gone".to_string()).into();
        assert_eq!(err.exit_code(), ExitCode::SESSION_ERROR);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: PulselinkError = ConfigError::MissingFile {
            path: PathBuf::from("/test"),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: PulselinkError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_state_error_display() {
        let err = StateError::WaveformOutOfRange { index: 20, size: 16 };
        assert_eq!(
            err.to_string(),
            "waveform index 20 out of range (catalog size 16)"
        );
    }

    #[test]
    fn test_command_failed_display() {
        let err = SessionError::CommandFailed {
            op: "set_strength".to_string(),
            reason: "session not bound".to_string(),
        };
        assert!(err.to_string().contains("set_strength"));
        assert!(err.to_string().contains("session not bound"));
    }

    #[test]
    fn test_config_invalid_value_display() {
        let err = ConfigError::InvalidValue {
            field: "damage.decay_per_tick".to_string(),
            value: "42".to_string(),
            expected: "0..=10".to_string(),
        };
        assert!(err.to_string().contains("damage.decay_per_tick"));
        assert!(err.to_string().contains("0..=10"));
    }
}
