//! Managed socket: lifecycle, send queue, and message dispatch.
//!
//! A [`Socket`] owns one transport at a time and wires its four events:
//!
//! | Event | Handling |
//! |-------|----------|
//! | open | open-callbacks in order, then drain the send queue |
//! | message | [`MessageDispatcher::dispatch`] |
//! | error | error-callbacks in order |
//! | close | close-callbacks, then reconnect evaluation |
//!
//! # Ready State
//!
//! [`Socket::ready_state`] reports the override state when one is set and the
//! transport's own state otherwise. The override is only written through
//! [`Socket::set_terminal_state`] (or by a reconnect policy giving up), and
//! there is no setter for the composite value.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`SocketBuilder`] |
//! | `dispatcher` | Filters and inbound routing |
//! | `options` | [`SocketOptions`] |
//! | `queue` | Send queue and completion handles |
//! | `reconnect` | Reconnect policies |

// ============================================================================
// Submodules
// ============================================================================

/// Socket builder.
pub mod builder;

/// Inbound message routing.
pub mod dispatcher;

/// Socket configuration.
pub mod options;

/// Outbound send queue.
pub mod queue;

/// Reconnect policies.
pub mod reconnect;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{SendId, SocketId};
use crate::protocol::{CloseStatus, Message, Payload, ReadyState};
use crate::transport::{Connector, EventSlot, Transport, TransportEvent};

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SocketBuilder;
pub use dispatcher::{Filter, MessageCallback, MessageDispatcher, MessageOptions, NotifyHook};
pub use options::SocketOptions;
pub use queue::{SendCanceller, SendHandle, SendQueue};
pub use reconnect::{LimitedReconnect, ManualReconnect, ReconnectAction, ReconnectPolicy};

// ============================================================================
// Types
// ============================================================================

/// Open callback type.
pub type OpenCallback = Arc<dyn Fn() + Send + Sync>;

/// Error callback type.
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Close callback type.
pub type CloseCallback = Arc<dyn Fn(&CloseStatus) + Send + Sync>;

// ============================================================================
// Socket
// ============================================================================

/// A managed WebSocket client.
///
/// Clones share the same connection, queue and callbacks. Two sockets built
/// separately never share anything.
///
/// # Example
///
/// ```no_run
/// use queued_websocket::{MessageOptions, Socket};
///
/// # async fn example() -> queued_websocket::Result<()> {
/// let socket = Socket::connect("ws://localhost:9001/chat")?;
///
/// socket.on_message(
///     |msg| println!("got {:?}", msg.as_text()),
///     MessageOptions::new().filter("ping"),
/// );
///
/// // Queued until the transport opens, then flushed in order.
/// socket.send("hello").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Socket {
    inner: Arc<SocketInner>,
}

/// State shared by all clones of a socket and its event bindings.
struct SocketInner {
    id: SocketId,
    url: Url,
    connector: Arc<dyn Connector>,
    policy: Arc<dyn ReconnectPolicy>,
    reconnectable: FxHashSet<u16>,

    /// Current transport, replaced on every (re)open.
    transport: Mutex<Option<Arc<dyn Transport>>>,
    /// Event binding of the current transport.
    binding: Mutex<Option<EventSlot>>,
    /// Generation of the current binding; events tagged otherwise are stale.
    generation: AtomicU64,

    /// Takes precedence over the transport's state when set.
    override_state: Mutex<Option<ReadyState>>,
    /// Consecutive reconnect attempts since the last open.
    attempts: AtomicU32,
    last_close: Mutex<Option<CloseStatus>>,

    queue: Arc<SendQueue>,
    dispatcher: MessageDispatcher,
    open_callbacks: RwLock<Vec<OpenCallback>>,
    error_callbacks: RwLock<Vec<ErrorCallback>>,
    close_callbacks: RwLock<Vec<CloseCallback>>,
}

// ============================================================================
// Socket - Constructors
// ============================================================================

impl Socket {
    /// Connects to `url` with default configuration.
    ///
    /// Equivalent to `Socket::builder(url).build()`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if `url` is not a `ws://` or `wss://` URL
    /// - [`Error::Connection`] if called outside a tokio runtime
    pub fn connect(url: impl Into<String>) -> Result<Self> {
        Self::builder(url).build()
    }

    /// Starts configuring a socket for `url`.
    pub fn builder(url: impl Into<String>) -> SocketBuilder {
        SocketBuilder::new(url)
    }

    /// Assembles a socket without opening it.
    fn from_parts(
        url: Url,
        options: &SocketOptions,
        connector: Arc<dyn Connector>,
        policy: Arc<dyn ReconnectPolicy>,
        notify: Option<Arc<dyn NotifyHook>>,
    ) -> Self {
        let id = SocketId::next();
        debug!(socket = %id, url = %url, "Socket created");

        Self {
            inner: Arc::new(SocketInner {
                id,
                url,
                connector,
                policy,
                reconnectable: options.reconnectable_codes.iter().copied().collect(),
                transport: Mutex::new(None),
                binding: Mutex::new(None),
                generation: AtomicU64::new(0),
                override_state: Mutex::new(None),
                attempts: AtomicU32::new(0),
                last_close: Mutex::new(None),
                queue: SendQueue::new(),
                dispatcher: MessageDispatcher::new(notify),
                open_callbacks: RwLock::new(Vec::new()),
                error_callbacks: RwLock::new(Vec::new()),
                close_callbacks: RwLock::new(Vec::new()),
            }),
        }
    }
}

// ============================================================================
// Socket - Lifecycle
// ============================================================================

impl Socket {
    /// Opens a fresh transport.
    ///
    /// Does nothing if the current transport is `OPEN` and `force` is false.
    /// Otherwise the current transport is detached and closed before the new
    /// one is attached. Returns whether a new transport was opened.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if no transport could be created.
    pub fn open(&self, force: bool) -> Result<bool> {
        self.inner.open(force)
    }

    /// Closes the transport.
    ///
    /// Without `force`, the close is skipped while the transport still has
    /// buffered data. Returns whether a close was requested.
    pub fn close(&self, force: bool) -> bool {
        let Some(transport) = self.inner.transport() else {
            return false;
        };

        let buffered = transport.buffered_amount();
        if !force && buffered > 0 {
            warn!(socket = %self.inner.id, buffered, "Close skipped, transport has buffered data");
            return false;
        }

        debug!(socket = %self.inner.id, force, "Closing transport");
        transport.close();
        true
    }

    /// Runs the reconnect policy.
    ///
    /// Called automatically when the transport closes with a reconnectable
    /// code and the socket is not terminal. Returns what the policy decided.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if the policy chose to reopen and no
    /// transport could be created.
    pub fn reconnect(&self) -> Result<ReconnectAction> {
        self.inner.reconnect()
    }

    /// Forces the composite ready-state.
    ///
    /// Accepts anything convertible to [`ReadyState`]: the enum itself or an
    /// integer or float holding `0..=4`. On success every queued send is
    /// rejected with [`Error::ConnectionClosed`]. Setting
    /// [`ReadyState::Terminal`] also stops automatic reconnects and makes
    /// later sends fail immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StateOutOfRange`] for a non-integer or out-of-range
    /// value; the previous override is kept.
    pub fn set_terminal_state<S>(&self, state: S) -> Result<()>
    where
        S: TryInto<ReadyState>,
        Error: From<S::Error>,
    {
        let state = state.try_into()?;
        self.inner.set_override(state);
        Ok(())
    }

    /// Returns the composite ready-state.
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.inner.ready_state()
    }
}

// ============================================================================
// Socket - Sending
// ============================================================================

impl Socket {
    /// Queues a payload and drains the queue if the transport is open.
    ///
    /// Never fails synchronously. The returned handle resolves once the
    /// payload is handed to the transport, or is rejected if the send is
    /// cancelled or the socket is terminal.
    pub fn send(&self, payload: impl Into<Payload>) -> SendHandle {
        let handle = {
            // Held across the push so a concurrent override cannot miss it.
            let override_state = self.inner.override_state.lock();
            if override_state.is_some_and(ReadyState::is_terminal) {
                debug!(socket = %self.inner.id, "Send rejected, socket is terminal");
                return SendHandle::rejected(Error::ConnectionClosed);
            }
            self.inner.queue.push(payload.into())
        };

        self.inner.flush();
        handle
    }

    /// Serializes `value` to JSON and sends it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if `value` cannot be serialized; nothing is
    /// queued in that case.
    pub fn send_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<SendHandle> {
        Ok(self.send(Payload::json(value)?))
    }

    /// Cancels a queued send by ID. See [`SendHandle::cancel`].
    pub fn cancel(&self, id: SendId, reason: Option<String>) -> bool {
        self.inner.queue.cancel(id, reason)
    }

    /// Returns the number of sends still queued.
    #[inline]
    #[must_use]
    pub fn pending_sends(&self) -> usize {
        self.inner.queue.len()
    }
}

// ============================================================================
// Socket - Callbacks
// ============================================================================

impl Socket {
    /// Registers a callback for every open event, first connect and
    /// reconnects alike. Open-callbacks run before the queue drains.
    pub fn on_open(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.inner.open_callbacks.write().push(Arc::new(callback));
    }

    /// Registers an inbound message callback.
    pub fn on_message(
        &self,
        callback: impl Fn(&Message) + Send + Sync + 'static,
        options: MessageOptions,
    ) {
        self.inner.dispatcher.register(Arc::new(callback), options);
    }

    /// Registers a message callback behind a regex filter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFilter`] if `pattern` does not compile; nothing
    /// is registered in that case.
    pub fn on_message_matching(
        &self,
        pattern: &str,
        callback: impl Fn(&Message) + Send + Sync + 'static,
    ) -> Result<()> {
        let filter = Filter::pattern(pattern)?;
        self.on_message(callback, MessageOptions::new().filter(filter));
        Ok(())
    }

    /// Registers a callback for transport errors.
    pub fn on_error(&self, callback: impl Fn(&Error) + Send + Sync + 'static) {
        self.inner.error_callbacks.write().push(Arc::new(callback));
    }

    /// Registers a callback for transport closes.
    ///
    /// Close-callbacks run before the reconnect policy is consulted.
    pub fn on_close(&self, callback: impl Fn(&CloseStatus) + Send + Sync + 'static) {
        self.inner.close_callbacks.write().push(Arc::new(callback));
    }
}

// ============================================================================
// Socket - Accessors
// ============================================================================

impl Socket {
    /// Returns the socket's ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SocketId {
        self.inner.id
    }

    /// Returns the validated target URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Returns `true` if `code` triggers the reconnect policy.
    #[inline]
    #[must_use]
    pub fn is_reconnectable(&self, code: u16) -> bool {
        self.inner.reconnectable.contains(&code)
    }

    /// Returns the transport's buffered byte count, 0 without a transport.
    #[must_use]
    pub fn buffered_amount(&self) -> usize {
        self.inner
            .transport()
            .map_or(0, |transport| transport.buffered_amount())
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("id", &self.inner.id)
            .field("url", &self.inner.url.as_str())
            .field("ready_state", &self.ready_state())
            .field("pending_sends", &self.pending_sends())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SocketInner - Transport Binding
// ============================================================================

impl SocketInner {
    fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.transport.lock().clone()
    }

    fn open(self: &Arc<Self>, force: bool) -> Result<bool> {
        if !force
            && self
                .transport()
                .is_some_and(|transport| transport.ready_state().is_open())
        {
            trace!(socket = %self.id, "Transport already open");
            return Ok(false);
        }

        // Detach before attach: nothing from the old transport may arrive
        // once the new binding exists.
        let old_binding = self.binding.lock().take();
        if let Some(old) = old_binding {
            old.detach();
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let previous = self.transport.lock().take();
        if let Some(previous) = previous {
            debug!(socket = %self.id, "Closing superseded transport");
            previous.close();
        }

        let slot = Self::bind(Arc::downgrade(self), generation);
        *self.binding.lock() = Some(slot.clone());

        let transport = self.connector.open(&self.url, slot)?;

        // The connector may report a close synchronously, and the reconnect
        // it triggers attaches a newer transport before we get here.
        {
            let mut current = self.transport.lock();
            if self.generation.load(Ordering::Acquire) != generation {
                drop(current);
                debug!(socket = %self.id, generation, "Transport superseded during open");
                transport.close();
                return Ok(true);
            }
            *current = Some(transport);
        }
        debug!(socket = %self.id, generation, url = %self.url, "Transport attached");

        // An open event that raced ahead of the assignment above found no
        // transport to drain into.
        self.flush();

        Ok(true)
    }

    /// Creates the event binding for one transport generation.
    fn bind(socket: Weak<Self>, generation: u64) -> EventSlot {
        EventSlot::new(move |event| {
            if let Some(socket) = socket.upgrade() {
                socket.handle_event(generation, event);
            }
        })
    }

    fn flush(&self) -> usize {
        self.transport()
            .map_or(0, |transport| self.queue.drain(transport.as_ref()))
    }
}

// ============================================================================
// SocketInner - Event Handlers
// ============================================================================

impl SocketInner {
    fn handle_event(self: &Arc<Self>, generation: u64, event: TransportEvent) {
        if generation != self.generation.load(Ordering::Acquire) {
            warn!(socket = %self.id, generation, ?event, "Event from detached transport ignored");
            return;
        }

        match event {
            TransportEvent::Open => self.handle_open(),
            TransportEvent::Message(message) => {
                self.dispatcher.dispatch(&message);
            }
            TransportEvent::Error(error) => self.handle_error(&error),
            TransportEvent::Close(status) => self.handle_close(status),
        }
    }

    fn handle_open(&self) {
        debug!(socket = %self.id, "Transport opened");
        self.attempts.store(0, Ordering::Release);

        let callbacks = self.open_callbacks.read().clone();
        for callback in &callbacks {
            callback();
        }

        self.flush();
    }

    fn handle_error(&self, error: &Error) {
        debug!(socket = %self.id, error = %error, "Transport error");

        let callbacks = self.error_callbacks.read().clone();
        for callback in &callbacks {
            callback(error);
        }
    }

    fn handle_close(self: &Arc<Self>, status: CloseStatus) {
        debug!(socket = %self.id, code = status.code, reason = %status.reason, "Transport closed");

        let callbacks = self.close_callbacks.read().clone();
        for callback in &callbacks {
            callback(&status);
        }

        let reconnectable = self.reconnectable.contains(&status.code);
        *self.last_close.lock() = Some(status);

        if self.ready_state().is_terminal() {
            debug!(socket = %self.id, "Socket is terminal, not reconnecting");
            return;
        }

        if reconnectable && let Err(e) = self.reconnect() {
            self.handle_error(&e);
        }
    }
}

// ============================================================================
// SocketInner - State
// ============================================================================

impl SocketInner {
    fn ready_state(&self) -> ReadyState {
        let override_state = *self.override_state.lock();
        override_state.unwrap_or_else(|| {
            self.transport()
                .map_or(ReadyState::Closed, |transport| transport.ready_state())
        })
    }

    fn set_override(&self, state: ReadyState) {
        let rejected = {
            let mut override_state = self.override_state.lock();
            *override_state = Some(state);
            self.queue.reject_all()
        };
        debug!(socket = %self.id, %state, rejected, "Override state set");
    }

    fn reconnect(self: &Arc<Self>) -> Result<ReconnectAction> {
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        let status = self.last_close.lock().clone();
        let action = self.policy.decide(attempt, status.as_ref());

        debug!(socket = %self.id, attempt, ?action, "Reconnect policy consulted");

        match action {
            ReconnectAction::Reopen => {
                self.open(true)?;
            }
            ReconnectAction::Wait => {}
            ReconnectAction::GiveUp => self.set_override(ReadyState::Terminal),
        }

        Ok(action)
    }
}

// ============================================================================
// Tests
// ============================================================================
