// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::time::Duration;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_gesture::groups::{Exclusive, Sequence};
use understory_gesture::recognizers::{LongPress, Pan, Pinch, Tap};
use understory_gesture::{GestureEngine, PointerEvent, RecognizerId};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// `n` taps stacked under one finger, like nested buttons.
fn stacked_taps(n: usize) -> (GestureEngine, Vec<RecognizerId>) {
    let mut engine = GestureEngine::new();
    let targets = (0..n).map(|_| engine.insert(Tap::default())).collect();
    (engine, targets)
}

/// Drag with `steps` moves of 2 px each.
fn drag(engine: &mut GestureEngine, targets: &[RecognizerId], steps: u64) {
    engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), targets);
    for i in 1..=steps {
        let x = (i * 2) as f64;
        engine.dispatch(&PointerEvent::moved(0, x, 0.0, ms(i * 8)), targets);
    }
    let x = (steps * 2) as f64;
    engine.dispatch(&PointerEvent::up(0, x, 0.0, ms(steps * 8 + 8)), targets);
}

fn bench_tap_contest(c: &mut Criterion) {
    let mut group = c.benchmark_group("tap_contest");
    for &n in &[2_usize, 8, 32] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("down_up_n{}", n), |b| {
            b.iter_batched(
                || stacked_taps(n),
                |(mut engine, targets)| {
                    engine.dispatch(&PointerEvent::down(0, 5.0, 5.0, ms(0)), &targets);
                    engine.dispatch(&PointerEvent::up(0, 5.0, 5.0, ms(50)), &targets);
                    engine.advance_time(ms(500));
                    black_box(engine.referee().is_empty())
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_pan_drag(c: &mut Criterion) {
    let mut group = c.benchmark_group("pan_drag");
    for &steps in &[16_u64, 128] {
        group.throughput(Throughput::Elements(steps));
        group.bench_function(format!("tap_long_press_pan_moves{}", steps), |b| {
            b.iter_batched(
                || {
                    let mut engine = GestureEngine::new();
                    let targets = vec![
                        engine.insert(Tap::default()),
                        engine.insert(LongPress::default()),
                        engine.insert(Pan::default()),
                    ];
                    (engine, targets)
                },
                |(mut engine, targets)| {
                    drag(&mut engine, &targets, steps);
                    black_box(engine.len())
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_pinch(c: &mut Criterion) {
    let mut group = c.benchmark_group("pinch");
    group.throughput(Throughput::Elements(64));
    group.bench_function("two_fingers_spread_64", |b| {
        b.iter_batched(
            || {
                let mut engine = GestureEngine::new();
                let targets = vec![engine.insert(Pinch::default()), engine.insert(Pan::default())];
                (engine, targets)
            },
            |(mut engine, targets)| {
                engine.dispatch(&PointerEvent::down(0, 100.0, 100.0, ms(0)), &targets);
                engine.dispatch(&PointerEvent::down(1, 200.0, 100.0, ms(4)), &targets);
                for i in 1..=64_u64 {
                    let d = i as f64;
                    let t = ms(4 + i * 8);
                    engine.dispatch(&PointerEvent::moved(0, 100.0 - d, 100.0, t), &targets);
                    engine.dispatch(&PointerEvent::moved(1, 200.0 + d, 100.0, t), &targets);
                }
                engine.dispatch(&PointerEvent::up(0, 36.0, 100.0, ms(600)), &targets);
                engine.dispatch(&PointerEvent::up(1, 264.0, 100.0, ms(600)), &targets);
                black_box(engine.referee().is_empty())
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_nested_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_groups");
    group.bench_function("exclusive_sequence_hold_then_drag", |b| {
        b.iter_batched(
            || {
                let mut engine = GestureEngine::new();
                let long_press = engine.insert(LongPress::default());
                let pan = engine.insert(Pan::default());
                let hold_drag = engine.insert(Sequence::new([long_press, pan]));
                let tap = engine.insert(Tap::default());
                let root = engine.insert(Exclusive::new([hold_drag, tap]));
                (engine, root)
            },
            |(mut engine, root)| {
                let targets = [root];
                engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &targets);
                engine.advance_time(ms(600));
                for i in 1..=32_u64 {
                    let x = (i * 3) as f64;
                    engine.dispatch(&PointerEvent::moved(0, x, 0.0, ms(600 + i * 8)), &targets);
                }
                engine.dispatch(&PointerEvent::up(0, 96.0, 0.0, ms(900)), &targets);
                black_box(engine.referee().is_empty())
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_tap_contest,
    bench_pan_drag,
    bench_pinch,
    bench_nested_groups
);
criterion_main!(benches);
