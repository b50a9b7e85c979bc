//! Error types for the JSON messaging client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use jsonmsg::{Connection, Message, RequestId, Result};
//!
//! async fn example(connection: &Connection) -> Result<()> {
//!     let rc = connection
//!         .publish(&Message::topic("alerts", "hello"), RequestId::new(7))
//!         .await?;
//!     assert!(rc.is_success());
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::ConnectTimeout`], [`Error::ConnectRejected`], [`Error::ConnectionClosed`], [`Error::Disconnected`], [`Error::NotConnected`] |
//! | Correlation | [`Error::DuplicateRequest`], [`Error::TooManyPending`] |
//! | Usage | [`Error::ListenerActive`] |
//! | Parsing | [`Error::IncompleteJson`], [`Error::InvalidJson`] |
//! | Execution | [`Error::Timeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |
//!
//! Acknowledgement codes reported by the server are not errors. They are
//! returned as [`ReturnCode`](crate::ReturnCode) values.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::connection::ConnectionState;
use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// DisconnectReason
// ============================================================================

/// Why a connection's receive loop stopped.
///
/// Carried by the terminal delivery sentinel and handed to every request
/// that was still waiting for an acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The transport failed with the given cause.
    Transport(String),
    /// The inbound stream was malformed or carried an unknown action.
    Framing(String),
    /// The connection ended without a failure cause.
    Status(i32),
}

impl DisconnectReason {
    /// Returns `true` if the disconnect was caused by a failure.
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Status(_))
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(cause) => write!(f, "transport failure: {cause}"),
            Self::Framing(cause) => write!(f, "framing failure: {cause}"),
            Self::Status(rc) => write!(f, "disconnect rc={rc}"),
        }
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connection configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The server did not answer the `Connect` request in time.
    #[error("Connect timed out waiting for a response from the server after {timeout_ms}ms")]
    ConnectTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The server answered the `Connect` request with a non-zero code.
    #[error("Connection failed: rc={rc}")]
    ConnectRejected {
        /// Return code reported by the server.
        rc: i32,
    },

    /// The connection is closed or its event loop has stopped.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The receive loop terminated while the caller was waiting.
    #[error("Disconnected: {0}")]
    Disconnected(DisconnectReason),

    /// The operation requires an established connection.
    #[error("Connection is not active (state={state})")]
    NotConnected {
        /// State the connection was in.
        state: ConnectionState,
    },

    // ========================================================================
    // Correlation Errors
    // ========================================================================
    /// A request with this id is already awaiting its acknowledgement.
    #[error("Request {id} is already pending")]
    DuplicateRequest {
        /// The colliding request id.
        id: RequestId,
    },

    /// Too many correlated requests are outstanding.
    #[error("Too many pending requests: {pending}/{max}")]
    TooManyPending {
        /// Requests currently outstanding.
        pending: usize,
        /// Configured maximum.
        max: usize,
    },

    // ========================================================================
    // Usage Errors
    // ========================================================================
    /// Synchronous receive is unavailable while a message listener is installed.
    #[error("receive() cannot be used with a message listener")]
    ListenerActive,

    // ========================================================================
    // Parsing Errors
    // ========================================================================
    /// JSON text ended before the outer object or array was closed.
    #[error("Incomplete JSON at line {line}")]
    IncompleteJson {
        /// Line where parsing stopped.
        line: u32,
    },

    /// JSON text is malformed.
    #[error("Invalid JSON at line {line}")]
    InvalidJson {
        /// Line where parsing stopped.
        line: u32,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connect timeout error.
    #[inline]
    pub fn connect_timeout(timeout_ms: u64) -> Self {
        Self::ConnectTimeout { timeout_ms }
    }

    /// Creates a connect rejected error.
    #[inline]
    pub fn connect_rejected(rc: i32) -> Self {
        Self::ConnectRejected { rc }
    }

    /// Creates a not connected error.
    #[inline]
    pub fn not_connected(state: ConnectionState) -> Self {
        Self::NotConnected { state }
    }

    /// Creates a duplicate request error.
    #[inline]
    pub fn duplicate_request(id: RequestId) -> Self {
        Self::DuplicateRequest { id }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout { .. }
                | Self::ConnectRejected { .. }
                | Self::ConnectionClosed
                | Self::Disconnected(_)
                | Self::NotConnected { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error came from malformed JSON.
    #[inline]
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::IncompleteJson { .. } | Self::InvalidJson { .. } | Self::Json(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::config("client id is required");
        assert_eq!(err.to_string(), "Configuration error: client id is required");
    }

    #[test]
    fn test_connect_errors_are_distinct() {
        let timeout = Error::connect_timeout(500);
        let rejected = Error::connect_rejected(104);

        assert!(timeout.is_timeout());
        assert!(!rejected.is_timeout());
        assert_eq!(rejected.to_string(), "Connection failed: rc=104");
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::Disconnected(DisconnectReason::Status(0)).is_connection_error());
        assert!(Error::not_connected(ConnectionState::Closed).is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_parse_error() {
        assert!(Error::InvalidJson { line: 3 }.is_parse_error());
        assert!(Error::IncompleteJson { line: 1 }.is_parse_error());
        assert!(!Error::ListenerActive.is_parse_error());
    }

    #[test]
    fn test_disconnect_reason_display() {
        let reason = DisconnectReason::Framing("unknown action".into());
        assert_eq!(reason.to_string(), "framing failure: unknown action");
        assert!(reason.is_failure());
        assert!(!DisconnectReason::Status(0).is_failure());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
