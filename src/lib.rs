//! Queued WebSocket - managed WebSocket client.
//!
//! This library wraps a WebSocket connection with a buffered send queue,
//! filtered message dispatch, and a pluggable reconnect policy.
//!
//! # Architecture
//!
//! Each [`Socket`] owns exactly one live transport at a time:
//!
//! - **Send queue**: every send is buffered and drained in FIFO order while
//!   the transport is open; each send yields a cancellable [`SendHandle`]
//! - **Dispatcher**: inbound messages are routed to callbacks by exact text
//!   or regex [`Filter`], with an optional host [`NotifyHook`]
//! - **Lifecycle**: reopening detaches the old transport before attaching
//!   the new one, so late events from a superseded transport are dropped
//! - **Ready state**: the socket reports the transport's state unless an
//!   override (such as [`ReadyState::Terminal`]) has been set
//!
//! # Quick Start
//!
//! ```no_run
//! use queued_websocket::{MessageOptions, Result, Socket};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let socket = Socket::connect("ws://localhost:9001/chat")?;
//!
//!     socket.on_message(
//!         |msg| println!("Received: {:?}", msg.as_text()),
//!         MessageOptions::new(),
//!     );
//!
//!     // Buffered until the connection opens.
//!     socket.send("hello").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`socket`] | [`Socket`], send queue, dispatcher, reconnect policies |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Payload, message and ready-state types |
//! | [`transport`] | Transport seam and tungstenite implementation |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for sockets and sends.
pub mod identifiers;

/// Payload, message and ready-state types.
pub mod protocol;

/// Managed socket.
///
/// Use [`Socket::connect()`] or [`Socket::builder()`] to create one.
pub mod socket;

/// Transport layer.
///
/// Defines the [`Transport`] and [`Connector`] seam and the default
/// tungstenite-backed implementation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{SendId, SocketId};

// Protocol types
pub use protocol::{CloseStatus, Message, MessageData, Payload, ReadyState};

// Socket types
pub use socket::{
    Filter, LimitedReconnect, ManualReconnect, MessageOptions, NotifyHook, ReconnectAction,
    ReconnectPolicy, SendCanceller, SendHandle, Socket, SocketBuilder, SocketOptions,
};

// Transport types
pub use transport::{Connector, EventSlot, Transport, TransportEvent, TungsteniteConnector};
