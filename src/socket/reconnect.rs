//! Reconnect policies.
//!
//! When the transport closes with a code in the socket's reconnectable set,
//! the socket asks its [`ReconnectPolicy`] what to do. The policy only
//! decides; the socket carries the decision out.
//!
//! | Policy | Behavior |
//! |--------|----------|
//! | [`ManualReconnect`] | Never acts; the caller reconnects explicitly |
//! | [`LimitedReconnect`] | Reopens immediately, gives up after N attempts |
//!
//! No delay or backoff is applied by either. A policy that wants one can
//! return [`ReconnectAction::Wait`] and schedule its own `open(true)`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::protocol::CloseStatus;

// ============================================================================
// ReconnectAction
// ============================================================================

/// What the socket should do after an abnormal close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    /// Open a fresh transport now.
    Reopen,
    /// Do nothing now.
    Wait,
    /// Stop for good: the socket enters [`ReadyState::Terminal`].
    ///
    /// [`ReadyState::Terminal`]: crate::ReadyState::Terminal
    GiveUp,
}

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Decides how to react to a reconnectable close.
pub trait ReconnectPolicy: Send + Sync + fmt::Debug {
    /// Called once per reconnect attempt.
    ///
    /// `attempt` counts from 1 and resets whenever a transport opens.
    /// `status` is the close that triggered the attempt, if any.
    fn decide(&self, attempt: u32, status: Option<&CloseStatus>) -> ReconnectAction;
}

// ============================================================================
// ManualReconnect
// ============================================================================

/// The default: never reconnects on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualReconnect;

impl ReconnectPolicy for ManualReconnect {
    fn decide(&self, _attempt: u32, _status: Option<&CloseStatus>) -> ReconnectAction {
        ReconnectAction::Wait
    }
}

// ============================================================================
// LimitedReconnect
// ============================================================================

/// Reopens immediately up to `max_attempts` times in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitedReconnect {
    /// Attempts allowed before giving up.
    pub max_attempts: u32,
}

impl LimitedReconnect {
    /// Creates a policy allowing `max_attempts` consecutive reopens.
    #[inline]
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl ReconnectPolicy for LimitedReconnect {
    fn decide(&self, attempt: u32, _status: Option<&CloseStatus>) -> ReconnectAction {
        if attempt <= self.max_attempts {
            ReconnectAction::Reopen
        } else {
            ReconnectAction::GiveUp
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
