//! Callback graphs flowing through a scheduler: chained continuations,
//! mixed callback kinds, and periodic futures feeding one-shot children.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use future_sched::sync::Mutex;
use future_sched::{Cron, Scheduler, Task};

#[tokio::test]
async fn test_then_chain_threads_values() {
    let sched = Scheduler::new();
    let out = Arc::new(Mutex::new(0));

    let task = Task::new(|| 3);
    let squared = task.then(|n| n * n);
    let sink = Arc::clone(&out);
    squared.then(move |n| *sink.lock() = n + 1);

    sched.now().send(&task);
    sleep(Duration::from_millis(400)).await;
    assert_eq!(*out.lock(), 10);
}

#[tokio::test]
async fn test_catch_child_is_chainable() {
    let sched = Scheduler::new();
    let out = Arc::new(Mutex::new(String::new()));

    let task = Task::<()>::new(|| panic!("nope"));
    let recovered = task.catch(|err| format!("handled: {err}"));
    let sink = Arc::clone(&out);
    recovered.then(move |s| *sink.lock() = s);

    sched.now().send(&task);
    sleep(Duration::from_millis(400)).await;
    assert_eq!(*out.lock(), "handled: call error: nope");
}

#[tokio::test]
async fn test_callback_future_links_existing_tasks() {
    let sched = Scheduler::new();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let head_counter = Arc::clone(&first);
    let head = Task::new(move || {
        head_counter.fetch_add(1, Ordering::SeqCst);
    });

    let tail_counter = Arc::clone(&second);
    let tail = Task::new(move || {
        tail_counter.fetch_add(1, Ordering::SeqCst);
    });
    head.callback_future(&tail);

    sched.now().send(&head);
    sleep(Duration::from_millis(400)).await;
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cron_then_fires_per_run() {
    let sched = Scheduler::new();
    let values = Arc::new(Mutex::new(Vec::new()));
    let ticks = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&ticks);
    let cron = Cron::new(move || counter.fetch_add(1, Ordering::SeqCst))
        .every(Duration::from_millis(20))
        .times(3);

    let sink = Arc::clone(&values);
    cron.then(move |v| sink.lock().push(v));

    sched.now().send(&cron);
    sleep(Duration::from_millis(600)).await;

    let seen = values.lock().clone();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen.iter().max(), Some(&2));
}

#[tokio::test]
async fn test_finish_future_accepts_existing_future() {
    let sched = Scheduler::new();
    let finished = Arc::new(AtomicUsize::new(0));

    let cron = Cron::new(|| ()).every(Duration::from_millis(1)).twice();
    let sink = Arc::clone(&finished);
    let epilogue = Task::new(move || {
        sink.fetch_add(1, Ordering::SeqCst);
    });
    cron.finish_future(&epilogue);

    sched.now().send(cron.handle());
    sleep(Duration::from_millis(400)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_callback_on_cron_runs_every_time() {
    let sched = Scheduler::new();
    let echoes = Arc::new(AtomicUsize::new(0));

    let cron = Cron::new(|| ()).every(Duration::from_millis(10)).times(3);
    let sink = Arc::clone(&echoes);
    cron.callback(move || sink.fetch_add(1, Ordering::SeqCst));

    sched.now().send(&cron);
    sleep(Duration::from_millis(500)).await;
    assert_eq!(echoes.load(Ordering::SeqCst), 3);
}
