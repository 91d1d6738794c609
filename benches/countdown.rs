//! Benchmarks for countdown operations
//!
//! Run with: cargo bench --bench countdown
//!
//! The poll benchmarks separate the common case (an up-to-date clock with
//! nothing due) from the catch-up case where a late poll replays a backlog
//! of whole ticks at once.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::hint::black_box;
use web_time::{Duration, Instant};

use proofline::{Countdown, CountdownSnapshot};

const GAME: Duration = Duration::from_secs(300);
const TICK: Duration = Duration::from_secs(1);

fn started_countdown(start: Instant) -> Countdown {
    let mut countdown = Countdown::with_tick(GAME, TICK).expect("valid countdown");
    countdown.start_at(start).expect("fresh countdown starts");
    countdown
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("Countdown construction");

    group.bench_function("with_tick", |b| {
        b.iter(|| Countdown::with_tick(black_box(GAME), black_box(TICK)));
    });

    group.bench_function("restore", |b| {
        let snapshot = CountdownSnapshot::new(GAME, Duration::from_secs(150));
        b.iter(|| Countdown::restore(black_box(snapshot), black_box(TICK)));
    });

    group.finish();
}

fn bench_poll(c: &mut Criterion) {
    let mut group = c.benchmark_group("Countdown poll");

    group.bench_function("idle", |b| {
        let start = Instant::now();
        let mut countdown = started_countdown(start);
        b.iter(|| black_box(countdown.poll_at(black_box(start))));
    });

    for backlog in [1u32, 10, 60, 240] {
        group.bench_with_input(
            BenchmarkId::new("catch_up", backlog),
            &backlog,
            |b, &backlog| {
                let start = Instant::now();
                let late = start + TICK * backlog;
                b.iter_batched(
                    || started_countdown(start),
                    |mut countdown| black_box(countdown.poll_at(late)),
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("Countdown snapshot");

    group.bench_function("snapshot", |b| {
        let countdown = Countdown::with_tick(GAME, TICK).expect("valid countdown");
        b.iter(|| black_box(&countdown).snapshot());
    });

    // The session-switch path: freeze the running clock, restore it, resume.
    group.bench_function("suspend_resume_cycle", |b| {
        let now = Instant::now();
        b.iter_batched(
            || started_countdown(now),
            |countdown| {
                let snapshot = countdown.snapshot();
                let mut restored = Countdown::restore(snapshot, TICK).expect("snapshot restores");
                restored.start_at(now).expect("restored countdown resumes");
                black_box(restored)
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_construction, bench_poll, bench_snapshot);
criterion_main!(benches);
