//! Send queue and dispatcher benchmark suite.
//!
//! Benchmarks the in-process hot paths without a network:
//! - Queue drain: 100, 1000 queued sends
//! - Dispatch: 10, 100 registrations with mixed filters
//!
//! Run with: cargo bench --bench queue_dispatch
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use queued_websocket::socket::{MessageDispatcher, SendQueue};
use queued_websocket::{Filter, Message, MessageOptions, ReadyState, Result, Transport};
use serde_json::json;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const QUEUE_SIZES: &[usize] = &[100, 1000];
const REGISTRATION_COUNTS: &[usize] = &[10, 100];

// ============================================================================
// Counting Transport
// ============================================================================

/// Always-open transport that only counts what it is handed.
#[derive(Default)]
struct CountingTransport {
    sent: AtomicUsize,
}

impl Transport for CountingTransport {
    fn send(&self, text: String) -> Result<()> {
        black_box(text);
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn close(&self) {}

    fn ready_state(&self) -> ReadyState {
        ReadyState::Open
    }

    fn buffered_amount(&self) -> usize {
        0
    }
}

// ============================================================================
// Benchmark: Queue Drain
// ============================================================================

fn bench_queue_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_drain");

    for &size in QUEUE_SIZES {
        group.bench_with_input(BenchmarkId::new("text", size), &size, |b, &size| {
            let transport = CountingTransport::default();
            b.iter(|| {
                let queue = SendQueue::new();
                let handles: Vec<_> = (0..size)
                    .map(|i| queue.push(format!("message {i}").into()))
                    .collect();
                black_box(queue.drain(&transport));
                handles
            });
        });

        group.bench_with_input(BenchmarkId::new("json", size), &size, |b, &size| {
            let transport = CountingTransport::default();
            b.iter(|| {
                let queue = SendQueue::new();
                let handles: Vec<_> = (0..size)
                    .map(|i| queue.push(json!({ "seq": i, "kind": "tick" }).into()))
                    .collect();
                black_box(queue.drain(&transport));
                handles
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Dispatch
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    let messages = [
        Message::text("foo"),
        Message::text("baz42"),
        Message::text("unmatched payload"),
    ];

    for &count in REGISTRATION_COUNTS {
        let dispatcher = MessageDispatcher::new(None);
        for i in 0..count {
            let options = match i % 3 {
                0 => MessageOptions::new(),
                1 => MessageOptions::new().filter("foo"),
                _ => MessageOptions::new().filter(
                    Filter::pattern("baz[0-9]{2}").expect("benchmark pattern compiles"),
                ),
            };
            dispatcher.register(
                std::sync::Arc::new(|msg: &Message| {
                    black_box(msg);
                }),
                options,
            );
        }

        group.bench_with_input(BenchmarkId::new("mixed", count), &count, |b, _| {
            b.iter(|| {
                for message in &messages {
                    black_box(dispatcher.dispatch(message));
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_queue_drain, bench_dispatch);
criterion_main!(benches);
