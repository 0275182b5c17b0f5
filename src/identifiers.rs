//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Identifies |
//! |------|------------|
//! | [`SocketId`] | One managed socket, used for log correlation |
//! | [`SendId`] | One pending send inside a socket's queue |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Counters
// ============================================================================

static NEXT_SOCKET_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SEND_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// SocketId
// ============================================================================

/// Identifies one [`Socket`](crate::Socket) for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(u64);

impl SocketId {
    /// Allocates the next process-unique socket ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SOCKET_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket-{}", self.0)
    }
}

// ============================================================================
// SendId
// ============================================================================

/// Identifies one pending send.
///
/// IDs are unique across all sockets, so a handle from one socket can never
/// cancel an entry in another socket's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SendId(u64);

impl SendId {
    /// Allocates the next process-unique send ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SEND_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "send-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
