//! Periodic futures layered over one-shot tasks.
//!
//! A [`Cron`] decorates a [`Task`] with an interval and a remaining-run
//! counter. Advancing the counter is the single source of truth for whether
//! the cron continues: each delivery decrements it, and the cron yields a
//! next run time only while the counter stays positive afterwards. Finish
//! callbacks are enqueued exactly once, in the same terminal state.
//!
//! By default a cron runs every second, effectively forever.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::SchedError;
use crate::future::{Future, FutureRef, IntoFutureRef};
use crate::sync::Mutex;
use crate::task::Task;

struct CronSchedule {
    remaining: u64,
    every: Duration,
}

struct CronInner<T> {
    task: Task<T>,
    sched: Mutex<CronSchedule>,
    onfinish: Mutex<Vec<FutureRef>>,
}

impl<T: Send + 'static> Future for CronInner<T> {
    fn run(&self) {
        self.task.inner.run_once();
    }

    fn next(&self) -> Option<Instant> {
        let mut sched = self.sched.lock();
        sched.remaining = sched.remaining.saturating_sub(1);
        if sched.remaining > 0 {
            Some(Instant::now() + sched.every)
        } else {
            None
        }
    }

    fn callbacks(&self) -> Vec<FutureRef> {
        let mut out = self.task.inner.collect_callbacks();
        if self.sched.lock().remaining == 0 {
            out.extend(self.onfinish.lock().iter().cloned());
        }
        out
    }

    fn stop_signal(&self) -> watch::Receiver<bool> {
        self.task.inner.stop_rx()
    }

    fn name(&self) -> &str {
        self.task.inner.label()
    }
}

/// A periodic future which runs a task repeatedly.
///
/// Interval and repetition methods consume and return the handle, so a cron
/// reads as one chain:
///
/// ```
/// use std::time::Duration;
/// use future_sched::Cron;
///
/// let cron = Cron::new(|| println!("tick"))
///     .every(Duration::from_millis(5))
///     .times(3);
/// # drop(cron);
/// ```
pub struct Cron<T> {
    inner: Arc<CronInner<T>>,
}

impl<T> Clone for Cron<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Cron<T> {
    /// Create a periodic future running `f`. Defaults to one run per second
    /// with no meaningful bound on repetitions.
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        Self {
            inner: Arc::new(CronInner {
                task: Task::new(f),
                sched: Mutex::new(CronSchedule {
                    remaining: u64::MAX,
                    every: Duration::from_secs(1),
                }),
                onfinish: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Set the periodic interval.
    #[must_use]
    pub fn every(self, every: Duration) -> Self {
        self.inner.sched.lock().every = every;
        self
    }

    /// Run once per second.
    #[must_use]
    pub fn secondly(self) -> Self {
        self.every(Duration::from_secs(1))
    }

    /// Run once per minute.
    #[must_use]
    pub fn minutely(self) -> Self {
        self.every(Duration::from_secs(60))
    }

    /// Run once per hour.
    #[must_use]
    pub fn hourly(self) -> Self {
        self.every(Duration::from_secs(60 * 60))
    }

    /// Run once per day.
    #[must_use]
    pub fn daily(self) -> Self {
        self.every(Duration::from_secs(24 * 60 * 60))
    }

    /// Set the maximum number of runs.
    #[must_use]
    pub fn times(self, n: u64) -> Self {
        self.inner.sched.lock().remaining = n;
        self
    }

    /// Run exactly once.
    #[must_use]
    pub fn once(self) -> Self {
        self.times(1)
    }

    /// Run exactly twice.
    #[must_use]
    pub fn twice(self) -> Self {
        self.times(2)
    }

    /// Remove any bound on the number of runs.
    #[must_use]
    pub fn infinity(self) -> Self {
        self.times(u64::MAX)
    }

    /// Append a callback which runs once the cron has run out of times.
    /// Returns the created task.
    pub fn finish<U, F>(&self, f: F) -> Task<U>
    where
        U: Send + 'static,
        F: FnMut() -> U + Send + 'static,
    {
        let child = Task::new(f);
        self.inner.onfinish.lock().push(child.handle());
        child
    }

    /// Append an existing future which runs once the cron has run out of
    /// times.
    pub fn finish_future(&self, fut: impl IntoFutureRef) {
        self.inner.onfinish.lock().push(fut.into_future_ref());
    }

    /// Append a generic callback running after every completed run.
    pub fn callback<U, F>(&self, f: F) -> Task<U>
    where
        U: Send + 'static,
        F: FnMut() -> U + Send + 'static,
    {
        self.inner.task.callback(f)
    }

    /// Append an existing future as a generic callback.
    pub fn callback_future(&self, fut: impl IntoFutureRef) {
        self.inner.task.callback_future(fut);
    }

    /// Append a success callback receiving each run's return value.
    pub fn then<U, F>(&self, f: F) -> Task<U>
    where
        T: Clone,
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        self.inner.task.then(f)
    }

    /// Append a failure callback receiving the error of a panicking run.
    pub fn catch<U, F>(&self, f: F) -> Task<U>
    where
        U: Send + 'static,
        F: FnMut(SchedError) -> U + Send + 'static,
    {
        self.inner.task.catch(f)
    }

    /// Signal the cron to stop before its next delivery.
    pub fn stop(&self) {
        self.inner.task.stop();
    }

    /// Diagnostic name of the form `future-N`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.task.name()
    }

    /// Shared schedulable handle to this cron.
    #[must_use]
    pub fn handle(&self) -> FutureRef {
        Arc::clone(&self.inner) as FutureRef
    }
}

impl<T: Send + 'static> IntoFutureRef for &Cron<T> {
    fn into_future_ref(self) -> FutureRef {
        self.handle()
    }
}

impl<T: Send + 'static> fmt::Display for Cron<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.inner.task.name())
    }
}
