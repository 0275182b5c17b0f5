//! Connection ready-state.
//!
//! The first four values mirror the WebSocket `readyState` attribute. The
//! fifth, [`ReadyState::Terminal`], exists only in this library: it marks a
//! socket that has given up and will not reconnect on its own.
//!
//! | Value | Constant | Meaning |
//! |-------|----------|---------|
//! | 0 | `CONNECTING` | Transport opening |
//! | 1 | `OPEN` | Transport ready, queue drains |
//! | 2 | `CLOSING` | Close handshake in progress |
//! | 3 | `CLOSED` | Transport closed |
//! | 4 | `TERMINAL` | Reconnect aborted |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// ReadyState
// ============================================================================

/// Composite connectivity state of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum ReadyState {
    /// Transport is opening.
    Connecting = 0,
    /// Transport is open; sends are handed over immediately.
    Open = 1,
    /// Transport is closing.
    Closing = 2,
    /// Transport is closed.
    Closed = 3,
    /// The socket will not reconnect automatically.
    Terminal = 4,
}

impl ReadyState {
    /// `CONNECTING` as a raw value.
    pub const CONNECTING: u8 = 0;
    /// `OPEN` as a raw value.
    pub const OPEN: u8 = 1;
    /// `CLOSING` as a raw value.
    pub const CLOSING: u8 = 2;
    /// `CLOSED` as a raw value.
    pub const CLOSED: u8 = 3;
    /// `TERMINAL` (reconnect aborted) as a raw value.
    pub const TERMINAL: u8 = 4;

    /// Every state, in numeric order.
    pub const ALL: [Self; 5] = [
        Self::Connecting,
        Self::Open,
        Self::Closing,
        Self::Closed,
        Self::Terminal,
    ];

    /// Returns the numeric value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the upper-case constant name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
            Self::Terminal => "TERMINAL",
        }
    }

    /// Returns `true` for [`ReadyState::Open`].
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` for [`ReadyState::Terminal`].
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal)
    }

    fn from_index(value: i128) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ReadyState> for u8 {
    fn from(state: ReadyState) -> Self {
        state.as_u8()
    }
}

// ============================================================================
// Conversions
// ============================================================================

macro_rules! impl_try_from_int {
    ($($ty:ty),*) => {$(
        impl TryFrom<$ty> for ReadyState {
            type Error = Error;

            fn try_from(value: $ty) -> Result<Self> {
                Self::from_index(i128::from(value)).ok_or_else(|| Error::state_out_of_range(value))
            }
        }
    )*};
}

impl_try_from_int!(u8, u16, u32, u64, i8, i16, i32, i64);

impl TryFrom<f64> for ReadyState {
    type Error = Error;

    /// Accepts only finite values with no fractional part.
    fn try_from(value: f64) -> Result<Self> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(Error::state_out_of_range(value));
        }
        // Exact after the integer check; out-of-range values fail below.
        Self::from_index(value as i128).ok_or_else(|| Error::state_out_of_range(value))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_match_variants() {
        assert_eq!(ReadyState::Connecting.as_u8(), ReadyState::CONNECTING);
        assert_eq!(ReadyState::Open.as_u8(), ReadyState::OPEN);
        assert_eq!(ReadyState::Closing.as_u8(), ReadyState::CLOSING);
        assert_eq!(ReadyState::Closed.as_u8(), ReadyState::CLOSED);
        assert_eq!(ReadyState::Terminal.as_u8(), ReadyState::TERMINAL);
    }

    #[test]
    fn test_try_from_integers() {
        assert_eq!(ReadyState::try_from(0u8).unwrap(), ReadyState::Connecting);
        assert_eq!(ReadyState::try_from(4i64).unwrap(), ReadyState::Terminal);
        assert!(ReadyState::try_from(5u8).is_err());
        assert!(ReadyState::try_from(-1i32).is_err());
    }

    #[test]
    fn test_try_from_float() {
        assert_eq!(ReadyState::try_from(3.0f64).unwrap(), ReadyState::Closed);
        assert!(matches!(
            ReadyState::try_from(2.5f64),
            Err(Error::StateOutOfRange { .. })
        ));
        assert!(ReadyState::try_from(f64::NAN).is_err());
        assert!(ReadyState::try_from(4.0000001f64).is_err());
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ReadyState::Closing).unwrap();
        assert_eq!(json, "2");
        let state: ReadyState = serde_json::from_str("1").unwrap();
        assert_eq!(state, ReadyState::Open);
        assert!(serde_json::from_str::<ReadyState>("9").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ReadyState::Terminal.to_string(), "TERMINAL");
    }
}
