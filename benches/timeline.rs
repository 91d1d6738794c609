//! Benchmarks for timeline operations
//!
//! Run with: cargo bench --bench timeline

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use serde::{Deserialize, Serialize};
use std::hint::black_box;

use proofline::{Config, ProofState, StateIndex, Timeline};

/// A formula payload about the size a real proof engine sends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct BenchMath {
    formula: String,
    depth: u32,
}

struct BenchConfig;

impl Config for BenchConfig {
    type Math = BenchMath;
}

fn state(depth: u32) -> ProofState<BenchMath> {
    let formula = format!("((p | q) & (r | s{depth})) = T");
    ProofState::new(
        formula.clone(),
        BenchMath {
            formula,
            depth,
        },
    )
}

fn full_timeline(states: u32) -> Timeline<BenchConfig> {
    let mut timeline = Timeline::new();
    for depth in 0..states {
        timeline.push(state(depth));
    }
    timeline
}

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("Timeline push");

    for states in [10u32, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("append", states), &states, |b, &states| {
            b.iter(|| full_timeline(black_box(states)));
        });
    }

    // Pushing with a rewound cursor truncates the abandoned branch first.
    group.bench_function("truncating", |b| {
        b.iter_batched(
            || {
                let mut timeline = full_timeline(100);
                for _ in 0..50 {
                    timeline.step_back();
                }
                timeline
            },
            |mut timeline| {
                timeline.push(state(999));
                black_box(timeline)
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_navigation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Timeline navigation");

    group.bench_function("step_back_step_forward", |b| {
        let mut timeline = full_timeline(100);
        b.iter(|| {
            black_box(timeline.step_back());
            black_box(timeline.step_forward());
        });
    });

    group.bench_function("jump_between_ends", |b| {
        let mut timeline = full_timeline(100);
        b.iter(|| {
            timeline
                .jump_to(black_box(StateIndex::new(0)))
                .expect("index 0 exists");
            timeline
                .jump_to(black_box(StateIndex::new(99)))
                .expect("index 99 exists");
        });
    });

    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("Timeline read");

    group.bench_function("current", |b| {
        let timeline = full_timeline(100);
        b.iter(|| black_box(timeline.current()));
    });

    group.bench_function("get", |b| {
        let timeline = full_timeline(100);
        b.iter(|| black_box(timeline.get(black_box(StateIndex::new(50)))));
    });

    group.finish();
}

criterion_group!(benches, bench_push, bench_navigation, bench_read);
criterion_main!(benches);
