//! Benchmarks for the fire engine and relay codec
//!
//! Run with: cargo bench --bench fire_engine
//!
//! `tick` runs every host frame, so it is measured on grids of increasing size with
//! an active episode. Spread target lookup and message encoding are the other
//! per-frame costs.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use arson_mode::network::codec::{decode_message, encode_message};
use arson_mode::{
    select_arsonists, ArsonConfig, Candidate, FireEngine, NoProps, PlayerRole, RoomGraph, RoomId,
    SyncMessage,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use web_time::Duration;

/// A `side` x `side` grid of rooms named `r{row}_{col}`.
fn grid(side: usize) -> RoomGraph {
    let name = |row: usize, col: usize| format!("r{row}_{col}");
    let mut graph = RoomGraph::new();
    for row in 0..side {
        for col in 0..side {
            graph.add_room(name(row, col));
            if col + 1 < side {
                graph.add_edge(name(row, col), name(row, col + 1));
            }
            if row + 1 < side {
                graph.add_edge(name(row, col), name(row + 1, col));
            }
        }
    }
    graph
}

fn burning_engine(side: usize) -> FireEngine {
    let config = ArsonConfig {
        fire_spread_interval: Duration::from_millis(50),
        rooms_to_win: usize::MAX,
        ..ArsonConfig::default()
    };
    let mut engine = FireEngine::new(grid(side), config);
    engine.initialize();
    let _ = engine.ignite(&RoomId::from("r0_0"));
    engine
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("FireEngine");
    let frame = Duration::from_millis(16);

    for side in [4usize, 8, 16] {
        group.bench_with_input(BenchmarkId::new("tick", side * side), &side, |b, &side| {
            let mut engine = burning_engine(side);
            b.iter(|| {
                engine.tick(black_box(frame), &mut NoProps);
                // Keep the event queue from growing across iterations.
                let _ = engine.events().count();
            });
        });
    }
    group.finish();
}

fn bench_spread_target(c: &mut Criterion) {
    let mut group = c.benchmark_group("FireEngine");

    for side in [8usize, 16] {
        let mut engine = burning_engine(side);
        for _ in 0..side * 4 {
            engine.tick(Duration::from_millis(50), &mut NoProps);
        }
        group.bench_with_input(
            BenchmarkId::new("spread_target", engine.burning_count()),
            &engine,
            |b, engine| b.iter(|| black_box(engine.spread_target())),
        );
    }
    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let message = SyncMessage::FireSpread {
        room: RoomId::from("Reception"),
    };
    let bytes = encode_message(&message).unwrap();

    c.bench_function("encode_message", |b| {
        b.iter(|| encode_message(black_box(&message)).unwrap());
    });
    c.bench_function("decode_message", |b| {
        b.iter(|| decode_message(black_box(&bytes)).unwrap());
    });
}

fn bench_selection(c: &mut Criterion) {
    let roster: Vec<Candidate> = (0..16)
        .map(|i| {
            let role = if i % 3 == 0 {
                PlayerRole::Specialist
            } else {
                PlayerRole::Slacker
            };
            Candidate::new(format!("player-{i}"), role)
        })
        .collect();

    c.bench_function("select_arsonists_16", |b| {
        b.iter(|| select_arsonists(black_box(&roster), 2));
    });
}

criterion_group!(
    benches,
    bench_tick,
    bench_spread_target,
    bench_codec,
    bench_selection
);
criterion_main!(benches);
