//! WebSocket transport on `tokio-tungstenite`.
//!
//! # Event Loop
//!
//! Opening a transport spawns a tokio task that:
//!
//! - Performs the client handshake (`connect_async`)
//! - Reports `Open`, then forwards inbound text and binary frames
//! - Writes outbound text handed over by [`Transport::send`]
//! - Reports `Close` exactly once when the stream ends
//!
//! The ready state and `buffered_amount` are atomics shared between the
//! handle and the task, so reading them never waits on I/O.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{CloseStatus, Message, NORMAL_CLOSE_CODE, ReadyState};

use super::{Connector, EventSlot, Transport, TransportEvent};

// ============================================================================
// Constants
// ============================================================================

/// Close code reported when the peer's close frame carried no status.
const NO_STATUS_CLOSE_CODE: u16 = 1005;

// ============================================================================
// TransportCommand
// ============================================================================

/// Internal commands for the event loop.
enum TransportCommand {
    /// Write one text frame.
    Send(String),
    /// Send a close frame and stop.
    Close,
}

// ============================================================================
// Shared
// ============================================================================

/// State read by the handle and written by the event loop.
#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    buffered: AtomicUsize,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(ReadyState::CONNECTING),
            buffered: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> ReadyState {
        ReadyState::try_from(self.state.load(Ordering::Acquire)).unwrap_or(ReadyState::Closed)
    }

    fn set_state(&self, state: ReadyState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

// ============================================================================
// TungsteniteConnector
// ============================================================================

/// Opens [`WebSocketTransport`]s on the current tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn open(&self, url: &Url, events: EventSlot) -> Result<Arc<dyn Transport>> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::connection(format!("no tokio runtime available: {e}")))?;

        Ok(Arc::new(WebSocketTransport::spawn(&runtime, url.clone(), events)))
    }
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// A client WebSocket driven by a background tokio task.
///
/// Dropping the last handle closes the connection.
pub struct WebSocketTransport {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<TransportCommand>,
    /// State shared with the event loop.
    shared: Arc<Shared>,
}

impl WebSocketTransport {
    /// Spawns the event loop for `url` on `runtime`.
    fn spawn(runtime: &Handle, url: Url, events: EventSlot) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new());

        runtime.spawn(Self::run_event_loop(
            url,
            command_rx,
            Arc::clone(&shared),
            events,
        ));

        Self { command_tx, shared }
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        url: Url,
        mut command_rx: mpsc::UnboundedReceiver<TransportCommand>,
        shared: Arc<Shared>,
        events: EventSlot,
    ) {
        let ws_stream = match connect_async(url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                error!(url = %url, error = %e, "WebSocket handshake failed");
                shared.set_state(ReadyState::Closed);
                events.emit(TransportEvent::Error(Error::from(e)));
                events.emit(TransportEvent::Close(CloseStatus::abnormal()));
                return;
            }
        };

        let (mut ws_write, mut ws_read) = ws_stream.split();

        // close() while the handshake was in flight
        if shared.state() == ReadyState::Closing {
            let _ = ws_write.close().await;
            shared.set_state(ReadyState::Closed);
            events.emit(TransportEvent::Close(CloseStatus::new(NORMAL_CLOSE_CODE, "")));
            return;
        }

        shared.set_state(ReadyState::Open);
        debug!(url = %url, "WebSocket transport open");
        events.emit(TransportEvent::Open);

        let status = loop {
            tokio::select! {
                // Incoming frames from the peer
                message = ws_read.next() => {
                    match message {
                        Some(Ok(WsMessage::Text(text))) => {
                            trace!(len = text.len(), "Text frame received");
                            events.emit(TransportEvent::Message(Message::text(text.as_str())));
                        }

                        Some(Ok(WsMessage::Binary(bytes))) => {
                            trace!(len = bytes.len(), "Binary frame received");
                            events.emit(TransportEvent::Message(Message::binary(bytes.to_vec())));
                        }

                        Some(Ok(WsMessage::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by remote");
                            break frame.map_or_else(
                                || CloseStatus::new(NO_STATUS_CLOSE_CODE, ""),
                                |f| CloseStatus::new(u16::from(f.code), f.reason.as_str()),
                            );
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            events.emit(TransportEvent::Error(Error::from(e)));
                            break CloseStatus::abnormal();
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break CloseStatus::abnormal();
                        }

                        // Ignore Ping, Pong, raw frames
                        _ => {}
                    }
                }

                // Commands from the handle
                command = command_rx.recv() => {
                    match command {
                        Some(TransportCommand::Send(text)) => {
                            let len = text.len();
                            let result = ws_write.send(WsMessage::Text(text.into())).await;
                            shared.buffered.fetch_sub(len, Ordering::AcqRel);

                            if let Err(e) = result {
                                warn!(error = %e, "Failed to write text frame");
                                events.emit(TransportEvent::Error(Error::from(e)));
                            }
                        }

                        Some(TransportCommand::Close) => {
                            debug!("Close command received");
                            let frame = CloseFrame {
                                code: CloseCode::Normal,
                                reason: String::new().into(),
                            };
                            let _ = ws_write.send(WsMessage::Close(Some(frame))).await;
                            break CloseStatus::new(NORMAL_CLOSE_CODE, "");
                        }

                        None => {
                            debug!("Transport handle dropped");
                            let _ = ws_write.close().await;
                            break CloseStatus::new(NORMAL_CLOSE_CODE, "");
                        }
                    }
                }
            }
        };

        shared.set_state(ReadyState::Closed);
        shared.buffered.store(0, Ordering::Release);
        events.emit(TransportEvent::Close(status));

        debug!("Event loop terminated");
    }
}

impl Transport for WebSocketTransport {
    fn send(&self, text: String) -> Result<()> {
        if self.shared.state() != ReadyState::Open {
            return Err(Error::connection("transport is not open"));
        }

        let len = text.len();
        self.shared.buffered.fetch_add(len, Ordering::AcqRel);

        self.command_tx
            .send(TransportCommand::Send(text))
            .map_err(|_| {
                self.shared.buffered.fetch_sub(len, Ordering::AcqRel);
                Error::connection("transport event loop has stopped")
            })
    }

    fn close(&self) {
        let state = self.shared.state();
        if matches!(state, ReadyState::Connecting | ReadyState::Open) {
            self.shared.set_state(ReadyState::Closing);
            let _ = self.command_tx.send(TransportCommand::Close);
        }
    }

    #[inline]
    fn ready_state(&self) -> ReadyState {
        self.shared.state()
    }

    #[inline]
    fn buffered_amount(&self) -> usize {
        self.shared.buffered.load(Ordering::Acquire)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;

    /// Accepts one client and echoes every text frame back.
    async fn spawn_echo_server() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("upgrade");
            while let Some(Ok(frame)) = ws.next().await {
                match frame {
                    WsMessage::Text(_) => {
                        if ws.send(frame).await.is_err() {
                            break;
                        }
                    }
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
        });

        Url::parse(&format!("ws://127.0.0.1:{port}")).expect("url")
    }

    fn recording_slot() -> (EventSlot, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let slot = EventSlot::new(move |event| {
            let label = match event {
                TransportEvent::Open => "open".to_string(),
                TransportEvent::Message(m) => format!("message:{}", m.as_text().unwrap_or("")),
                TransportEvent::Error(_) => "error".to_string(),
                TransportEvent::Close(status) => format!("close:{}", status.code),
            };
            let _ = tx.send(label);
        });
        (slot, rx)
    }

    async fn next_event(rx: &mut UnboundedReceiver<String>) -> String {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event within timeout")
            .expect("channel open")
    }

    #[test]
    fn test_open_requires_runtime() {
        let url = Url::parse("ws://127.0.0.1:1").unwrap();
        let result = TungsteniteConnector.open(&url, EventSlot::detached());
        assert!(matches!(result, Err(Error::Connection { .. })));
    }

    #[tokio::test]
    async fn test_echo_roundtrip() {
        let url = spawn_echo_server().await;
        let (slot, mut rx) = recording_slot();

        let transport = TungsteniteConnector.open(&url, slot).expect("open");
        assert_eq!(next_event(&mut rx).await, "open");
        assert_eq!(transport.ready_state(), ReadyState::Open);

        transport.send("ping".to_string()).expect("send");
        assert_eq!(next_event(&mut rx).await, "message:ping");

        transport.close();
        assert_eq!(next_event(&mut rx).await, "close:1000");
        assert_eq!(transport.ready_state(), ReadyState::Closed);
        assert_eq!(transport.buffered_amount(), 0);
    }

    #[tokio::test]
    async fn test_socket_flushes_queue_over_real_transport() {
        use crate::socket::{MessageOptions, Socket};

        let url = spawn_echo_server().await;
        let socket = Socket::connect(url.as_str()).expect("socket");

        let (tx, mut rx) = mpsc::unbounded_channel();
        socket.on_message(
            move |m: &Message| {
                let _ = tx.send(m.as_text().unwrap_or("").to_string());
            },
            MessageOptions::new().filter("hello"),
        );

        let handle = socket.send("hello");
        assert_eq!(socket.pending_sends(), 1);

        timeout(Duration::from_secs(5), handle)
            .await
            .expect("send within timeout")
            .expect("send fulfilled");
        assert_eq!(socket.pending_sends(), 0);
        assert_eq!(socket.ready_state(), ReadyState::Open);

        assert_eq!(next_event(&mut rx).await, "hello");
        assert!(socket.close(true));
    }

    #[tokio::test]
    async fn test_send_before_open_is_rejected() {
        let url = spawn_echo_server().await;
        let (slot, _rx) = recording_slot();

        let transport = TungsteniteConnector.open(&url, slot).expect("open");
        assert_eq!(transport.ready_state(), ReadyState::Connecting);
        assert!(transport.send("early".to_string()).is_err());
    }

    #[tokio::test]
    async fn test_refused_connection_reports_error_then_close() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let url = Url::parse(&format!("ws://127.0.0.1:{port}")).unwrap();
        let (slot, mut rx) = recording_slot();
        let transport = TungsteniteConnector.open(&url, slot).expect("open");

        assert_eq!(next_event(&mut rx).await, "error");
        assert_eq!(next_event(&mut rx).await, "close:1006");
        assert_eq!(transport.ready_state(), ReadyState::Closed);
    }
}
