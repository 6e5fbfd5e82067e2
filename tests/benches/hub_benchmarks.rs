//! # Message Hub Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | publish + deliver, 1 client | < 10µs |
//! | publish + deliver, 64 clients | < 1ms |
//! | peek_type on a typical utterance | < 5µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ovos_bus_core::{BusMessage, Envelope, MessageHub, MessagePublisher};
use std::time::Duration;

fn utterance() -> String {
    BusMessage::new("recognizer_loop:utterance")
        .with_data(serde_json::json!({"utterances": ["what is the weather like"], "lang": "en-us"}))
        .with_context(serde_json::json!({"source": "audio", "destination": "skills"}))
        .to_json()
}

fn bench_fanout(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    let mut group = c.benchmark_group("hub-fanout");
    group.measurement_time(Duration::from_secs(5));

    let message = utterance();
    for clients in [1usize, 8, 64] {
        let hub = MessageHub::new();
        let mut sessions: Vec<_> = (0..clients).map(|_| hub.connect(None)).collect();
        let origin = sessions[0].id();

        group.throughput(Throughput::Elements(clients as u64));
        group.bench_with_input(
            BenchmarkId::new("publish_deliver", clients),
            &clients,
            |b, _| {
                b.iter(|| {
                    hub.publish(Envelope::text(origin, message.as_str()));
                    runtime.block_on(async {
                        for session in sessions.iter_mut() {
                            black_box(session.recv().await);
                        }
                    });
                })
            },
        );
    }

    group.finish();
}

fn bench_peek_type(c: &mut Criterion) {
    let message = utterance();

    c.bench_function("peek_type", |b| {
        b.iter(|| black_box(BusMessage::peek_type(black_box(&message))))
    });
    c.bench_function("parse", |b| {
        b.iter(|| black_box(BusMessage::parse(black_box(&message)).is_ok()))
    });
}

criterion_group!(benches, bench_fanout, bench_peek_type);
criterion_main!(benches);
