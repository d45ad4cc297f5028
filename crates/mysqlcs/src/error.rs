//! Unified error handling for the MySQLCS client
//!
//! Every fallible operation in this crate returns [`Result`]. The variants
//! distinguish the conditions callers actually branch on: a transport
//! failure, a body that would not decode, a missing resource (which the
//! delete-wait probes treat as a positive signal), a remote operation that
//! reported failure, and a poll loop that ran out of time.
//!
//! # Example
//!
//! ```rust
//! use mysqlcs::{Error, Result};
//!
//! fn handle_error(err: Error) {
//!     if err.is_not_found() {
//!         println!("Resource not found");
//!     } else if err.is_retryable() {
//!         println!("Temporary error, can retry");
//!     }
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

/// Error type for all MySQLCS API operations
#[derive(Error, Debug)]
pub enum Error {
    /// Request could not be sent or the response could not be read
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not valid JSON or did not map onto the target shape.
    /// Carries the raw body for diagnostics.
    #[error("Failed to decode response: {message}")]
    Deserialization { message: String, body: String },

    /// The named resource does not exist (HTTP 404)
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Credentials were rejected (HTTP 401/403)
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Any other non-success response from the API
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The remote resource or its activity explicitly reported failure.
    /// The message is sourced from the server-reported reason.
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// Poll loop exhausted its deadline without a terminal verdict
    #[error("Timed out after {timeout:?} waiting for {description}")]
    WaitTimeout {
        description: String,
        timeout: Duration,
    },

    /// A response lacked a field the calling flow requires
    #[error("Response missing required field: {0}")]
    MissingField(&'static str),

    /// Client was configured with missing or malformed settings
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for MySQLCS operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized { .. })
    }

    /// Returns true if this is a server-side error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        match self {
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if this is a timeout, either at the transport layer or
    /// from an exhausted poll loop
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::WaitTimeout { .. } => true,
            Error::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns true if retrying the whole operation might succeed.
    ///
    /// Remote fatal statuses ([`Error::OperationFailed`]) are permanent and
    /// never retryable; an exhausted wait might complete given more time.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api { status, .. } => *status >= 500 || *status == 429,
            Error::WaitTimeout { .. } => true,
            Error::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
