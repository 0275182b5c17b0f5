//! Transport capability.
//!
//! A transport is one duplex channel that delivers whole messages. The socket
//! never touches the network itself; it asks a [`Connector`] for a fresh
//! [`Transport`] on every (re)connect and receives the transport's events
//! through an [`EventSlot`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   open(url, slot)   ┌─────────────────┐
//! │     Socket      │────────────────────►│    Connector    │
//! │                 │                     └────────┬────────┘
//! │  queue.drain ───┼──── send / close ───► Transport (gen N)
//! │                 │                              │
//! │  handle_event ◄─┼──── EventSlot (gen N) ◄──────┘
//! └─────────────────┘
//! ```
//!
//! # Detach Before Attach
//!
//! Every slot belongs to exactly one transport. When the socket replaces its
//! transport it detaches the old slot first, so events still in flight from a
//! superseded transport are dropped instead of reaching the socket.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | `tokio-tungstenite` transport and connector |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket transport on `tokio-tungstenite`.
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{CloseStatus, Message, ReadyState};

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::{TungsteniteConnector, WebSocketTransport};

// ============================================================================
// TransportEvent
// ============================================================================

/// One of the four events a transport reports.
#[derive(Debug)]
pub enum TransportEvent {
    /// The transport is open and accepts sends.
    Open,
    /// A whole message arrived.
    Message(Message),
    /// The transport hit an error. It may or may not close afterwards.
    Error(Error),
    /// The transport closed.
    Close(CloseStatus),
}

// ============================================================================
// EventSlot
// ============================================================================

/// Event handler callback type.
pub type EventHandler = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// The binding between one transport and its owner.
///
/// Cloning a slot shares the binding; detaching any clone detaches all.
#[derive(Clone)]
pub struct EventSlot {
    handler: Arc<Mutex<Option<EventHandler>>>,
}

impl EventSlot {
    /// Creates a slot bound to `handler`.
    pub fn new(handler: impl Fn(TransportEvent) + Send + Sync + 'static) -> Self {
        let handler: EventHandler = Arc::new(handler);
        Self {
            handler: Arc::new(Mutex::new(Some(handler))),
        }
    }

    /// Creates a slot with no handler. Every event is dropped.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            handler: Arc::new(Mutex::new(None)),
        }
    }

    /// Delivers an event to the bound handler.
    ///
    /// Returns `false` if the slot has been detached.
    pub fn emit(&self, event: TransportEvent) -> bool {
        // Release the lock before calling out so the handler may detach.
        let handler = self.handler.lock().clone();

        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => {
                trace!(?event, "Event dropped by detached slot");
                false
            }
        }
    }

    /// Unbinds the handler.
    pub fn detach(&self) {
        *self.handler.lock() = None;
    }

    /// Returns `true` while a handler is bound.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.handler.lock().is_some()
    }
}

impl fmt::Debug for EventSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSlot")
            .field("attached", &self.is_attached())
            .finish()
    }
}

// ============================================================================
// Transport
// ============================================================================

/// An open (or opening) duplex channel.
///
/// Implementations report events through the [`EventSlot`] they were opened
/// with, and must not emit events synchronously from inside [`send`] or
/// [`close`].
///
/// [`send`]: Transport::send
/// [`close`]: Transport::close
pub trait Transport: Send + Sync {
    /// Hands one serialized message to the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel can no longer accept data.
    fn send(&self, text: String) -> Result<()>;

    /// Starts closing the channel.
    fn close(&self);

    /// Returns the channel's own state. Never [`ReadyState::Terminal`].
    fn ready_state(&self) -> ReadyState;

    /// Returns the number of bytes accepted by [`Transport::send`] but not
    /// yet written to the network.
    fn buffered_amount(&self) -> usize;
}

/// Opens transports.
pub trait Connector: Send + Sync {
    /// Opens a new transport to `url` reporting into `events`.
    ///
    /// # Errors
    ///
    /// Returns an error if no transport could be created at all. Failures
    /// that happen while connecting are reported as events instead.
    fn open(&self, url: &Url, events: EventSlot) -> Result<Arc<dyn Transport>>;
}

// ============================================================================
// Tests
// ============================================================================
