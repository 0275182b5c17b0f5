//! Inbound messages and close status.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Close code reported when the stream ends without a close frame.
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Close code for a normal, intentional close.
pub const NORMAL_CLOSE_CODE: u16 = 1000;

// ============================================================================
// Message
// ============================================================================

/// Body of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageData {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

/// A whole message received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message body.
    pub data: MessageData,
}

impl Message {
    /// Creates a text message.
    #[inline]
    #[must_use]
    pub fn text(data: impl Into<String>) -> Self {
        Self {
            data: MessageData::Text(data.into()),
        }
    }

    /// Creates a binary message.
    #[inline]
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: MessageData::Binary(data.into()),
        }
    }

    /// Returns the text body, or `None` for binary messages.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            MessageData::Text(text) => Some(text),
            MessageData::Binary(_) => None,
        }
    }

    /// Returns the raw bytes of either kind of body.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            MessageData::Text(text) => text.as_bytes(),
            MessageData::Binary(bytes) => bytes,
        }
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(self.as_bytes()).map_err(Error::from)
    }
}

// ============================================================================
// CloseStatus
// ============================================================================

/// Status reported by the transport when it closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseStatus {
    /// Close code from the close frame.
    pub code: u16,
    /// Close reason from the close frame, possibly empty.
    pub reason: String,
}

impl CloseStatus {
    /// Creates a close status.
    #[inline]
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Status for a stream that ended without a close frame.
    #[inline]
    #[must_use]
    pub fn abnormal() -> Self {
        Self::new(ABNORMAL_CLOSE_CODE, "")
    }

    /// Returns `true` for code 1000.
    #[inline]
    #[must_use]
    pub fn is_normal(&self) -> bool {
        self.code == NORMAL_CLOSE_CODE
    }
}

impl fmt::Display for CloseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} ({})", self.code, self.reason)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
