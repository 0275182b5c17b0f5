//! Outbound payloads.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// Payload
// ============================================================================

/// A message waiting to be handed to the transport.
///
/// Text is sent as-is. Structured values are serialized to JSON text at the
/// moment they leave the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw text, sent verbatim.
    Text(String),
    /// Structured value, sent as JSON text.
    Json(Value),
}

impl Payload {
    /// Builds a structured payload from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the value cannot be
    /// represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Renders the payload as the text that goes on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn into_text(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Json(value) => Ok(serde_json::to_string(&value)?),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
