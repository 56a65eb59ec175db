//! Call and dispatch benchmark suite.
//!
//! Measures the synchronous hot paths of a connection over a channel
//! transport:
//! - Validated call plus matching response
//! - Event routing at different field counts
//!
//! Run with: cargo bench --bench dispatch
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use inspector_backend::{Arg, ChannelTransport, FnDispatcher, ParamSpec, ParamType, Registry};
use serde_json::{Map, Value, json};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const FIELD_COUNTS: &[usize] = &[1, 8, 32];

// ============================================================================
// Fixtures
// ============================================================================

fn registry(field_count: usize) -> Registry {
    let mut registry = Registry::new();
    registry.register_command(
        "Net",
        "fetch",
        vec![
            ParamSpec::required("url", ParamType::String),
            ParamSpec::optional("depth", ParamType::Number),
        ],
        vec!["body".into(), "status".into()],
        false,
    );
    registry.register_event(
        "Net",
        "progress",
        (0..field_count).map(|i| format!("f{i}")).collect(),
    );
    registry
}

// ============================================================================
// Benchmark: Call Round Trip
// ============================================================================

fn bench_call_round_trip(c: &mut Criterion) {
    let (transport, mut outgoing) = ChannelTransport::new();
    let connection = registry(1).connect(transport);
    let agent = connection.agent("Net").expect("Net agent");

    c.bench_function("call_round_trip", |b| {
        b.iter(|| {
            let call = agent.call(
                "fetch",
                vec![
                    Arg::from("http://example.com"),
                    Arg::from(2_i64),
                    Arg::callback(|reply| reply.get(1).cloned().unwrap_or_default()),
                ],
            );
            let request = outgoing.try_recv().expect("request sent");
            connection.dispatch(json!({
                "id": request.id,
                "result": {"body": "ok", "status": 200}
            }));
            black_box(call);
        });
    });
}

// ============================================================================
// Benchmark: Event Dispatch
// ============================================================================

fn bench_event_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_dispatch");

    for &count in FIELD_COUNTS {
        let (transport, _outgoing) = ChannelTransport::new();
        let connection = registry(count).connect(transport);
        connection.register_dispatcher(
            "Net",
            Arc::new(FnDispatcher::new().on("progress", |args| {
                black_box(args);
            })),
        );

        let params: Map<String, Value> = (0..count).map(|i| (format!("f{i}"), json!(i))).collect();
        let text = json!({"method": "Net.progress", "params": params}).to_string();

        group.bench_with_input(BenchmarkId::new("fields", count), &text, |b, text| {
            b.iter(|| connection.dispatch(black_box(text.as_str())));
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Main
// ============================================================================

criterion_group!(benches, bench_call_round_trip, bench_event_dispatch);
criterion_main!(benches);
