//! Codec and fan-out benchmark suite.
//!
//! Benchmarks the hot path of an inbound event:
//! - Frame decode (known, unknown and malformed frames)
//! - Registry dispatch at different listener counts
//!
//! Run with: cargo bench --bench dispatch
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mercury_client::Topic;
use mercury_client::channel::ListenerRegistry;
use mercury_client::protocol::{ClientMessage, decode, encode};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const LISTENER_COUNTS: &[usize] = &[1, 10, 100, 1000];

const FRAMES: &[(&str, &str)] = &[
    ("new_mail", r#"{"type":"NewMailAvailable"}"#),
    ("unknown", r#"{"type":"MailDeleted","id":7}"#),
    ("malformed", "{not json"),
];

// ============================================================================
// Benchmark: Codec
// ============================================================================

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for &(name, frame) in FRAMES {
        group.bench_with_input(BenchmarkId::new("decode", name), &frame, |b, &frame| {
            b.iter(|| decode(black_box(frame)));
        });
    }

    group.bench_function("encode_subscribe", |b| {
        b.iter(|| encode(black_box(ClientMessage::Subscribe(Topic::NewMail))));
    });

    group.finish();
}

// ============================================================================
// Benchmark: Dispatch
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for &count in LISTENER_COUNTS {
        let registry = ListenerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..count {
            let hits = Arc::clone(&hits);
            registry.register(
                Topic::NewMail,
                Arc::new(move || {
                    hits.fetch_add(1, Ordering::Relaxed);
                }),
            );
        }

        group.bench_with_input(BenchmarkId::new("listeners", count), &registry, |b, registry| {
            b.iter(|| registry.dispatch(black_box(Topic::NewMail)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_codec, bench_dispatch);
criterion_main!(benches);
