//! Microbenchmarks for the scheduling engine's synchronous plumbing:
//! task construction, execution + callback arming, and cron advancement.
//!
//! The event loop itself is timer-bound, so these benches target the work
//! the loop performs per delivery rather than wall-clock scheduling.

use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use future_sched::{Cron, Future, Task};

fn bench_task_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("task_construction");
    group.throughput(Throughput::Elements(1));

    group.bench_function("new", |b| {
        b.iter(|| {
            let task = Task::new(|| black_box(41) + 1);
            black_box(task)
        });
    });

    group.bench_function("new_with_then", |b| {
        b.iter(|| {
            let task = Task::new(|| black_box(41) + 1);
            let child = task.then(|n| n * 2);
            black_box((task, child))
        });
    });

    group.finish();
}

fn bench_run_and_callbacks(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_and_callbacks");
    group.throughput(Throughput::Elements(1));

    group.bench_function("run_bare", |b| {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let task = Task::new(move || counter.fetch_add(1, Ordering::Relaxed));
        let handle = task.handle();
        b.iter(|| {
            handle.run();
            black_box(handle.callbacks())
        });
    });

    group.bench_function("run_then_arm", |b| {
        let task = Task::new(|| black_box(7));
        task.then(|n| n + 1);
        let handle = task.handle();
        b.iter(|| {
            handle.run();
            let callbacks = handle.callbacks();
            for cb in &callbacks {
                cb.run();
            }
            black_box(callbacks)
        });
    });

    group.finish();
}

fn bench_cron_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("cron_advance");
    group.throughput(Throughput::Elements(1));

    group.bench_function("next", |b| {
        let cron = Cron::new(|| ()).every(Duration::from_millis(1)).infinity();
        let handle = cron.handle();
        b.iter(|| black_box(handle.next()));
    });

    group.bench_function("run_and_next", |b| {
        let cron = Cron::new(|| black_box(1)).every(Duration::from_millis(1)).infinity();
        let handle = cron.handle();
        b.iter(|| {
            handle.run();
            black_box(handle.next())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_task_construction,
    bench_run_and_callbacks,
    bench_cron_advance
);
criterion_main!(benches);
