//! Echo round trip against a live server.
//!
//! Demonstrates:
//! - Connecting with a reconnect policy
//! - Queueing sends before the connection opens
//! - Exact and regex message filters
//! - Awaiting send completion
//!
//! Usage:
//!   cargo run --example echo -- ws://127.0.0.1:9001
//!   cargo run --example echo -- ws://127.0.0.1:9001 --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::Context;
use queued_websocket::{LimitedReconnect, Message, MessageOptions, ReadyState, Socket};
use serde_json::json;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_URL: &str = "ws://127.0.0.1:9001";
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let debug = args.iter().any(|a| a == "--debug");
    let url = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map_or(DEFAULT_URL, String::as_str);

    init_logging(debug);

    let socket = Socket::builder(url)
        .reconnect_policy(LimitedReconnect::new(3))
        .reconnectable_code(1006)
        .build()
        .with_context(|| format!("connecting to {url}"))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let exact = tx.clone();
    socket.on_message(
        move |msg: &Message| {
            let _ = exact.send(format!("[exact] {}", msg.as_text().unwrap_or_default()));
        },
        MessageOptions::new().filter("hello"),
    );

    let pattern = tx.clone();
    socket.on_message_matching(r#""seq":\s*\d+"#, move |msg: &Message| {
        let _ = pattern.send(format!("[json]  {}", msg.as_text().unwrap_or_default()));
    })?;

    socket.on_open(|| println!("[open] connected"));
    socket.on_error(|e| eprintln!("[error] {e}"));
    socket.on_close(|status| println!("[close] {status}"));

    println!("[state] {}", socket.ready_state());

    let greeting = socket.send("hello");
    let tick = socket.send_json(&json!({ "seq": 1, "kind": "tick" }))?;
    let dropped = socket.send("never sent");
    dropped.cancel_with_reason("changed my mind");

    greeting.await.context("sending greeting")?;
    tick.await.context("sending tick")?;
    println!("[state] {}", socket.ready_state());

    for _ in 0..2 {
        match tokio::time::timeout(REPLY_TIMEOUT, rx.recv()).await {
            Ok(Some(line)) => println!("{line}"),
            Ok(None) => break,
            Err(_) => {
                println!("[timeout] no echo within {REPLY_TIMEOUT:?}");
                break;
            }
        }
    }

    socket.set_terminal_state(ReadyState::Terminal)?;
    socket.close(true);
    println!("[state] {}", socket.ready_state());

    Ok(())
}

// ============================================================================
// Logging
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "queued_websocket=debug"
    } else {
        "queued_websocket=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
