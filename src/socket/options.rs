//! Socket configuration.
//!
//! # Example
//!
//! ```ignore
//! use queued_websocket::SocketOptions;
//!
//! let options = SocketOptions::new()
//!     .with_allowed_scheme("ws+unix")
//!     .with_reconnectable_codes([1006, 4000]);
//!
//! // Or from JSON, with missing fields taking their defaults:
//! let options = SocketOptions::from_json(r#"{ "reconnectableCodes": [1006] }"#)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Schemes accepted when none are configured.
pub const DEFAULT_ALLOWED_SCHEMES: &[&str] = &["ws", "wss"];

/// Close codes that trigger the reconnect policy when none are configured.
pub const DEFAULT_RECONNECTABLE_CODES: &[u16] = &[5000];

// ============================================================================
// SocketOptions
// ============================================================================

/// Tunable behavior of a [`Socket`](crate::Socket).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SocketOptions {
    /// URL schemes the socket may connect to.
    pub allowed_schemes: Vec<String>,

    /// Close codes that hand control to the reconnect policy.
    pub reconnectable_codes: Vec<u16>,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            allowed_schemes: DEFAULT_ALLOWED_SCHEMES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            reconnectable_codes: DEFAULT_RECONNECTABLE_CODES.to_vec(),
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SocketOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from JSON. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] on malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SocketOptions {
    /// Accepts one more URL scheme.
    #[must_use]
    pub fn with_allowed_scheme(mut self, scheme: impl Into<String>) -> Self {
        let scheme = scheme.into().to_ascii_lowercase();
        if !self.allowed_schemes.contains(&scheme) {
            self.allowed_schemes.push(scheme);
        }
        self
    }

    /// Replaces the accepted URL schemes.
    #[must_use]
    pub fn with_allowed_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_schemes = schemes
            .into_iter()
            .map(|s| s.into().to_ascii_lowercase())
            .collect();
        self
    }

    /// Adds one reconnectable close code.
    #[must_use]
    pub fn with_reconnectable_code(mut self, code: u16) -> Self {
        if !self.reconnectable_codes.contains(&code) {
            self.reconnectable_codes.push(code);
        }
        self
    }

    /// Replaces the reconnectable close codes.
    #[must_use]
    pub fn with_reconnectable_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.reconnectable_codes = codes.into_iter().collect();
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SocketOptions {
    /// Parses `raw` and checks its scheme against the allowed set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `raw` does not parse or its scheme is
    /// not allowed.
    pub fn validate_url(&self, raw: &str) -> Result<Url> {
        let url = Url::parse(raw).map_err(|e| Error::invalid_url(raw, e.to_string()))?;

        let allowed = self
            .allowed_schemes
            .iter()
            .any(|scheme| scheme.eq_ignore_ascii_case(url.scheme()));

        if !allowed {
            return Err(Error::invalid_url(
                raw,
                format!("scheme `{}` is not allowed", url.scheme()),
            ));
        }

        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================
