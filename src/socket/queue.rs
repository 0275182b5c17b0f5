//! Outbound send queue.
//!
//! Every `send` becomes a pending entry at the tail of the queue. The queue
//! drains head-first whenever the transport reports `OPEN`, so payloads reach
//! the transport in exactly the order they were sent.
//!
//! # Pending Send Lifecycle
//!
//! ```text
//!            drain (transport OPEN)
//!   queued ───────────────────────────► sent      (handle: Ok)
//!     │
//!     │ cancel / terminal state
//!     └───────────────────────────────► rejected  (handle: Err)
//! ```
//!
//! Once an entry leaves the queue it is never touched again: cancelling it
//! is a no-op.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::SendId;
use crate::protocol::Payload;
use crate::transport::Transport;

// ============================================================================
// Types
// ============================================================================

/// Sender half of a pending send's completion.
type Completion = oneshot::Sender<Result<()>>;

// ============================================================================
// PendingSend
// ============================================================================

/// One queued payload and its completion.
struct PendingSend {
    id: SendId,
    payload: Payload,
    completion: Completion,
}

impl PendingSend {
    fn reject(self, error: Error) {
        let _ = self.completion.send(Err(error));
    }
}

// ============================================================================
// SendQueue
// ============================================================================

/// FIFO buffer of pending sends.
pub struct SendQueue {
    /// Queued entries, head first.
    pending: Mutex<VecDeque<PendingSend>>,
    /// Held for the whole of a drain so concurrent drains cannot interleave.
    flush: ReentrantMutex<()>,
}

impl SendQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(VecDeque::new()),
            flush: ReentrantMutex::new(()),
        })
    }

    /// Appends a payload and returns its completion handle.
    ///
    /// Does not drain; see [`SendQueue::enqueue`].
    pub fn push(self: &Arc<Self>, payload: Payload) -> SendHandle {
        let id = SendId::next();
        let (completion, receiver) = oneshot::channel();

        self.pending.lock().push_back(PendingSend {
            id,
            payload,
            completion,
        });
        trace!(%id, "Send queued");

        SendHandle {
            id,
            queue: Arc::downgrade(self),
            receiver,
        }
    }

    /// Appends a payload, then drains through `transport` if one is given.
    pub fn enqueue(
        self: &Arc<Self>,
        payload: Payload,
        transport: Option<&dyn Transport>,
    ) -> SendHandle {
        let handle = self.push(payload);
        if let Some(transport) = transport {
            self.drain(transport);
        }
        handle
    }

    /// Hands queued payloads to `transport` while it reports `OPEN`.
    ///
    /// Structured payloads are serialized on the way out. Each handed-over
    /// entry's handle is fulfilled; an entry the transport refuses is
    /// rejected with the transport's error. Returns the number sent.
    pub fn drain(&self, transport: &dyn Transport) -> usize {
        let _flush = self.flush.lock();
        let mut sent = 0;

        while transport.ready_state().is_open() {
            let Some(entry) = self.pending.lock().pop_front() else {
                break;
            };
            let PendingSend {
                id,
                payload,
                completion,
            } = entry;

            let outcome = payload.into_text().and_then(|text| transport.send(text));
            match &outcome {
                Ok(()) => {
                    sent += 1;
                    trace!(%id, "Send handed to transport");
                }
                Err(e) => warn!(%id, error = %e, "Send rejected by transport"),
            }

            let _ = completion.send(outcome);
        }

        if sent > 0 {
            debug!(sent, remaining = self.len(), "Send queue drained");
        }

        sent
    }

    /// Removes a still-queued entry and rejects it.
    ///
    /// Returns `false` if the entry already left the queue.
    pub fn cancel(&self, id: SendId, reason: Option<String>) -> bool {
        let entry = {
            let mut pending = self.pending.lock();
            pending
                .iter()
                .position(|p| p.id == id)
                .and_then(|index| pending.remove(index))
        };

        match entry {
            Some(entry) => {
                debug!(%id, ?reason, "Send cancelled");
                entry.reject(Error::send_cancelled(reason));
                true
            }
            None => {
                trace!(%id, "Cancel ignored, send no longer queued");
                false
            }
        }
    }

    /// Rejects every queued entry with [`Error::ConnectionClosed`].
    ///
    /// Returns the number rejected.
    pub fn reject_all(&self) -> usize {
        let drained: Vec<_> = self.pending.lock().drain(..).collect();
        let count = drained.len();

        for entry in drained {
            entry.reject(Error::ConnectionClosed);
        }

        if count > 0 {
            debug!(count, "Rejected queued sends");
        }

        count
    }

    /// Returns the number of queued entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Returns `true` if `id` is still queued.
    #[must_use]
    pub fn contains(&self, id: SendId) -> bool {
        self.pending.lock().iter().any(|p| p.id == id)
    }

    /// Returns the queued IDs, head first.
    #[must_use]
    pub fn ids(&self) -> Vec<SendId> {
        self.pending.lock().iter().map(|p| p.id).collect()
    }
}

impl fmt::Debug for SendQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendQueue").field("len", &self.len()).finish()
    }
}

// ============================================================================
// SendHandle
// ============================================================================

/// Completion handle for one send.
///
/// Await it to learn whether the payload reached the transport. Resolves to
/// `Ok(())` once handed over, or to [`Error::SendCancelled`] /
/// [`Error::ConnectionClosed`] when rejected. Dropping the handle does not
/// cancel the send.
#[must_use = "dropping a SendHandle does not cancel the send"]
pub struct SendHandle {
    id: SendId,
    queue: Weak<SendQueue>,
    receiver: oneshot::Receiver<Result<()>>,
}

impl SendHandle {
    /// A handle that is already rejected with `error`.
    pub(crate) fn rejected(error: Error) -> Self {
        let (completion, receiver) = oneshot::channel();
        let _ = completion.send(Err(error));

        Self {
            id: SendId::next(),
            queue: Weak::new(),
            receiver,
        }
    }

    /// Returns the send's ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SendId {
        self.id
    }

    /// Cancels the send if it is still queued.
    ///
    /// Returns `false` (and changes nothing) if it already left the queue.
    pub fn cancel(&self) -> bool {
        self.canceller().cancel()
    }

    /// Cancels the send with a reason carried by [`Error::SendCancelled`].
    pub fn cancel_with_reason(&self, reason: impl Into<String>) -> bool {
        self.canceller().cancel_with_reason(reason)
    }

    /// Returns a detached canceller, usable while the handle is awaited.
    #[must_use]
    pub fn canceller(&self) -> SendCanceller {
        SendCanceller {
            id: self.id,
            queue: Weak::clone(&self.queue),
        }
    }

    /// Returns the outcome if it is already known, without waiting.
    ///
    /// The outcome is yielded once; later calls return
    /// [`Error::ConnectionClosed`].
    pub fn try_outcome(&mut self) -> Option<Result<()>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(Error::ConnectionClosed)),
        }
    }
}

impl Future for SendHandle {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped completion means the queue itself is gone.
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(Error::ConnectionClosed)))
    }
}

impl fmt::Debug for SendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendHandle").field("id", &self.id).finish()
    }
}

// ============================================================================
// SendCanceller
// ============================================================================

/// Cancels one send; cloneable and independent of the [`SendHandle`].
#[derive(Debug, Clone)]
pub struct SendCanceller {
    id: SendId,
    queue: Weak<SendQueue>,
}

impl SendCanceller {
    /// Cancels without a reason.
    pub fn cancel(&self) -> bool {
        self.cancel_inner(None)
    }

    /// Cancels with a reason.
    pub fn cancel_with_reason(&self, reason: impl Into<String>) -> bool {
        self.cancel_inner(Some(reason.into()))
    }

    fn cancel_inner(&self, reason: Option<String>) -> bool {
        self.queue
            .upgrade()
            .is_some_and(|queue| queue.cancel(self.id, reason))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready, task};
    use url::Url;

    use crate::protocol::ReadyState;
    use crate::transport::mock::{MockConnector, MockHandle};
    use crate::transport::{Connector, EventSlot};

    fn transport() -> (Arc<dyn Transport>, Arc<MockHandle>) {
        let connector = MockConnector::new();
        let url = Url::parse("ws://foo/queue").unwrap();
        let transport = connector.open(&url, EventSlot::detached()).unwrap();
        (transport, connector.latest())
    }

    #[test]
    fn test_queues_while_not_open() {
        let (transport, mock) = transport();
        let queue = SendQueue::new();

        let _a = queue.enqueue("a".into(), Some(transport.as_ref()));
        let _b = queue.enqueue("b".into(), Some(transport.as_ref()));

        assert_eq!(queue.len(), 2);
        assert!(mock.sent().is_empty());

        assert_eq!(queue.drain(transport.as_ref()), 0);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_drains_fifo_once_open() {
        let (transport, mock) = transport();
        let queue = SendQueue::new();

        let handles: Vec<_> = ["1", "2", "3"]
            .into_iter()
            .map(|m| queue.enqueue(m.into(), Some(transport.as_ref())))
            .collect();
        assert_eq!(queue.len(), 3);

        mock.set_ready_state(ReadyState::Open);
        assert_eq!(queue.drain(transport.as_ref()), 3);

        assert!(queue.is_empty());
        assert_eq!(mock.sent(), vec!["1", "2", "3"]);
        for mut handle in handles {
            assert!(matches!(handle.try_outcome(), Some(Ok(()))));
        }
    }

    #[test]
    fn test_drain_empty_is_noop() {
        let (transport, mock) = transport();
        mock.set_ready_state(ReadyState::Open);
        let queue = SendQueue::new();

        assert_eq!(queue.drain(transport.as_ref()), 0);
        assert_eq!(queue.drain(transport.as_ref()), 0);
        assert!(mock.sent().is_empty());
    }

    #[test]
    fn test_json_payload_is_stringified() {
        let (transport, mock) = transport();
        mock.set_ready_state(ReadyState::Open);
        let queue = SendQueue::new();

        let _handle = queue.enqueue(json!({ "foo": "bar" }).into(), Some(transport.as_ref()));

        assert_eq!(mock.sent(), vec![r#"{"foo":"bar"}"#]);
    }

    #[test]
    fn test_cancel_removes_exactly_that_entry() {
        let queue = SendQueue::new();
        let first = queue.push("first".into());
        let foo = queue.push("foo".into());
        let last = queue.push("last".into());

        assert!(foo.cancel_with_reason("bad data"));

        assert_eq!(queue.ids(), vec![first.id(), last.id()]);
        assert!(!queue.contains(foo.id()));
    }

    #[tokio::test]
    async fn test_cancel_rejects_with_reason() {
        let queue = SendQueue::new();
        let handle = queue.push("foo".into());
        handle.cancel_with_reason("bad data");

        match handle.await {
            Err(Error::SendCancelled { reason }) => assert_eq!(reason.as_deref(), Some("bad data")),
            other => panic!("expected cancellation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_without_reason() {
        let queue = SendQueue::new();
        let handle = queue.push("foo".into());
        assert!(handle.cancel());

        assert!(matches!(
            handle.await,
            Err(Error::SendCancelled { reason: None })
        ));
    }

    #[test]
    fn test_cancel_after_send_is_noop() {
        let (transport, mock) = transport();
        mock.set_ready_state(ReadyState::Open);
        let queue = SendQueue::new();

        let mut handle = queue.enqueue("sent".into(), Some(transport.as_ref()));

        assert!(!handle.cancel_with_reason("too late"));
        assert!(matches!(handle.try_outcome(), Some(Ok(()))));
        assert_eq!(mock.sent(), vec!["sent"]);
    }

    #[test]
    fn test_handle_pending_until_drained() {
        let (transport, mock) = transport();
        let queue = SendQueue::new();

        let mut handle = task::spawn(queue.enqueue("m1".into(), Some(transport.as_ref())));
        assert_pending!(handle.poll());

        mock.set_ready_state(ReadyState::Open);
        queue.drain(transport.as_ref());

        assert!(handle.is_woken());
        assert_ready!(handle.poll()).expect("send fulfilled");
    }

    #[test]
    fn test_reject_all() {
        let queue = SendQueue::new();
        let mut a = task::spawn(queue.push("a".into()));
        let mut b = task::spawn(queue.push("b".into()));

        assert_eq!(queue.reject_all(), 2);
        assert!(queue.is_empty());

        assert!(matches!(assert_ready!(a.poll()), Err(Error::ConnectionClosed)));
        assert!(matches!(assert_ready!(b.poll()), Err(Error::ConnectionClosed)));
    }

    #[test]
    fn test_transport_refusal_rejects_handle() {
        let (transport, mock) = transport();
        mock.set_ready_state(ReadyState::Open);
        mock.fail_sends(true);
        let queue = SendQueue::new();

        let mut handle = queue.enqueue("x".into(), Some(transport.as_ref()));

        assert!(matches!(
            handle.try_outcome(),
            Some(Err(Error::Connection { .. }))
        ));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dropped_queue_resolves_closed() {
        let queue = SendQueue::new();
        let mut handle = task::spawn(queue.push("orphan".into()));
        drop(queue);

        assert!(matches!(
            assert_ready!(handle.poll()),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn test_rejected_handle() {
        let mut handle = task::spawn(SendHandle::rejected(Error::ConnectionClosed));
        assert!(matches!(
            assert_ready!(handle.poll()),
            Err(Error::ConnectionClosed)
        ));
    }
}
