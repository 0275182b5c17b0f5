//! Error types for queued-websocket.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Validation failures are returned synchronously from constructors and
//! registration calls. Send outcomes are only ever delivered through a
//! [`SendHandle`](crate::SendHandle):
//!
//! ```ignore
//! use queued_websocket::{Error, Result, Socket};
//!
//! async fn example() -> Result<()> {
//!     let socket = Socket::connect("ws://localhost:9001/feed")?;
//!     match socket.send("hello").await {
//!         Ok(()) => {}
//!         Err(Error::ConnectionClosed) => println!("socket gave up"),
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Validation | [`Error::InvalidUrl`], [`Error::InvalidFilter`], [`Error::StateOutOfRange`] |
//! | Send outcome | [`Error::SendCancelled`], [`Error::ConnectionClosed`] |
//! | Connection | [`Error::Connection`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::convert::Infallible;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// URL rejected at construction time.
    ///
    /// Either the URL does not parse or its scheme is not in the allowed set.
    /// No socket is produced.
    #[error("Invalid url provided: {url} ({reason})")]
    InvalidUrl {
        /// The rejected URL, as given.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Message filter rejected at registration time.
    #[error("Invalid filter pattern {pattern:?}: {message}")]
    InvalidFilter {
        /// The pattern source that failed to compile.
        pattern: String,
        /// Description from the regex compiler.
        message: String,
    },

    /// Ready-state value outside `0..=4` or not an integer.
    #[error("State must be an integer between 0 and 4, got: {value}")]
    StateOutOfRange {
        /// The rejected value, rendered for display.
        value: String,
    },

    // ========================================================================
    // Send Outcomes
    // ========================================================================
    /// A queued send was cancelled before reaching the transport.
    #[error("Send cancelled{}", reason_suffix(.reason))]
    SendCancelled {
        /// Caller-supplied reason, if any.
        reason: Option<String>,
    },

    /// The socket is in the terminal state.
    ///
    /// Delivered to every send that was queued when the terminal state was
    /// set, and to every send issued afterwards.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport-level failure.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {r}"))
        .unwrap_or_default()
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid filter error.
    #[inline]
    pub fn invalid_filter(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Creates a state out of range error.
    #[inline]
    pub fn state_out_of_range(value: impl ToString) -> Self {
        Self::StateOutOfRange {
            value: value.to_string(),
        }
    }

    /// Creates a send cancelled error.
    #[inline]
    pub fn send_cancelled(reason: Option<String>) -> Self {
        Self::SendCancelled { reason }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error rejected a pending send.
    #[inline]
    #[must_use]
    pub fn is_send_outcome(&self) -> bool {
        matches!(self, Self::SendCancelled { .. } | Self::ConnectionClosed)
    }

    /// Returns `true` if this error came from argument validation.
    #[inline]
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::InvalidFilter { .. } | Self::StateOutOfRange { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
