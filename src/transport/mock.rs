//! Recording transport for unit tests.
//!
//! [`MockConnector`] records every open, and each [`MockTransport`] records
//! sends and closes. Tests drive the socket by firing events through
//! [`MockHandle`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{CloseStatus, Message, ReadyState};

use super::{Connector, EventSlot, Transport, TransportEvent};

// ============================================================================
// MockHandle
// ============================================================================

/// Test-side view of one opened transport.
pub(crate) struct MockHandle {
    pub url: Url,
    state: Mutex<ReadyState>,
    buffered: AtomicUsize,
    sent: Mutex<Vec<String>>,
    closes: AtomicUsize,
    fail_sends: AtomicBool,
    events: EventSlot,
}

impl MockHandle {
    /// Marks the transport open and fires `Open`.
    pub fn open(&self) {
        *self.state.lock() = ReadyState::Open;
        self.events.emit(TransportEvent::Open);
    }

    /// Fires a text `Message`.
    pub fn receive(&self, text: &str) {
        self.events.emit(TransportEvent::Message(Message::text(text)));
    }

    /// Fires a binary `Message`.
    pub fn receive_binary(&self, bytes: &[u8]) {
        self.events.emit(TransportEvent::Message(Message::binary(bytes)));
    }

    /// Fires `Error`.
    pub fn fail(&self, message: &str) {
        self.events.emit(TransportEvent::Error(Error::connection(message)));
    }

    /// Marks the transport closed and fires `Close`.
    pub fn remote_close(&self, code: u16) {
        *self.state.lock() = ReadyState::Closed;
        self.events.emit(TransportEvent::Close(CloseStatus::new(code, "")));
    }

    /// Overrides the reported state without firing anything.
    pub fn set_ready_state(&self, state: ReadyState) {
        *self.state.lock() = state;
    }

    pub fn set_buffered_amount(&self, amount: usize) {
        self.buffered.store(amount, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Everything handed to `send`, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn is_attached(&self) -> bool {
        self.events.is_attached()
    }
}

// ============================================================================
// MockTransport
// ============================================================================

/// The [`Transport`] handed to the socket.
pub(crate) struct MockTransport(Arc<MockHandle>);

impl Transport for MockTransport {
    fn send(&self, text: String) -> Result<()> {
        if self.0.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::connection("mock send failure"));
        }
        self.0.sent.lock().push(text);
        Ok(())
    }

    fn close(&self) {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.0.state.lock();
        if matches!(*state, ReadyState::Connecting | ReadyState::Open) {
            *state = ReadyState::Closing;
        }
    }

    fn ready_state(&self) -> ReadyState {
        *self.0.state.lock()
    }

    fn buffered_amount(&self) -> usize {
        self.0.buffered.load(Ordering::SeqCst)
    }
}

// ============================================================================
// MockConnector
// ============================================================================

/// Records every transport it opens.
#[derive(Clone, Default)]
pub(crate) struct MockConnector {
    opened: Arc<Mutex<Vec<Arc<MockHandle>>>>,
    refuse: Arc<AtomicBool>,
    close_on_open: Arc<Mutex<Option<u16>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `open` fail.
    pub fn refuse_opens(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Makes the next `open` fire `Close(code)` before it returns.
    pub fn close_next_open(&self, code: u16) {
        *self.close_on_open.lock() = Some(code);
    }

    pub fn connect_count(&self) -> usize {
        self.opened.lock().len()
    }

    /// URLs passed to `open`, in order.
    pub fn urls(&self) -> Vec<String> {
        self.opened.lock().iter().map(|h| h.url.to_string()).collect()
    }

    /// The most recently opened transport.
    ///
    /// # Panics
    ///
    /// Panics if nothing has been opened.
    pub fn latest(&self) -> Arc<MockHandle> {
        self.opened
            .lock()
            .last()
            .cloned()
            .expect("no transport opened")
    }

    /// The transport opened `index`-th (0-based).
    pub fn nth(&self, index: usize) -> Arc<MockHandle> {
        Arc::clone(&self.opened.lock()[index])
    }
}

impl Connector for MockConnector {
    fn open(&self, url: &Url, events: EventSlot) -> Result<Arc<dyn Transport>> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(Error::connection("mock connector refused"));
        }

        let handle = Arc::new(MockHandle {
            url: url.clone(),
            state: Mutex::new(ReadyState::Connecting),
            buffered: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
            fail_sends: AtomicBool::new(false),
            events,
        });
        self.opened.lock().push(Arc::clone(&handle));

        let close_code = self.close_on_open.lock().take();
        if let Some(code) = close_code {
            handle.remote_close(code);
        }

        Ok(Arc::new(MockTransport(handle)))
    }
}
