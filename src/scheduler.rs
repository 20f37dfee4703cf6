//! Scheduler: delivery slots, the event loop, and admission control.
//!
//! A scheduler owns one event-loop task which receives ready futures from a
//! capacity-one channel: a busy loop or a saturated admission gate stalls
//! upstream timers instead of buffering unbounded work. Each call to
//! [`Scheduler::after`] / [`Scheduler::at`] / [`Scheduler::now`] returns a
//! single-use [`Slot`]; a helper task waits for the slot's future, races the
//! delay timer against the scheduler's stop signal and the future's own stop
//! signal, then pushes the future onto the ready queue.
//!
//! On delivery the loop drops a stopped future, re-arms a periodic future
//! for its next run time *before* dispatching the current one (a slow
//! periodic future may overlap itself), and dispatches execution into its
//! own task: admit through the gate, run the callable on the blocking pool,
//! then feed every callback future back through [`Scheduler::now`].
//!
//! Stopping a scheduler halts dispatch of not-yet-delivered work and
//! cancels pending timers; in-flight executions finish on their own.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, trace};

use crate::error::{require, SchedError};
use crate::future::{FutureRef, IntoFutureRef};
use crate::sync::{Gate, Mutex};

type UnhandledSink = Arc<dyn Fn(SchedError) + Send + Sync>;

static ANON_SCHEDULERS: AtomicU64 = AtomicU64::new(0);

struct Shared {
    name: String,
    queue_tx: mpsc::Sender<FutureRef>,
    stop: watch::Sender<bool>,
    gate: Mutex<Gate>,
    unhandled: Mutex<Option<UnhandledSink>>,
}

/// Handle to a running scheduler.
///
/// Handles are cheap to clone and compare equal when they refer to the same
/// scheduler. A scheduler starts running at creation and has exactly one
/// terminal transition, [`Scheduler::stop`].
pub struct Scheduler {
    inner: Arc<Shared>,
}

impl Clone for Scheduler {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PartialEq for Scheduler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Scheduler {}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create a private, unregistered scheduler and start its event loop.
    ///
    /// Must be called within a Tokio runtime. Every call yields a distinct
    /// instance; use [`Scheduler::named`] for shared, registered ones.
    #[must_use]
    pub fn new() -> Self {
        Self::start(format!(
            "scheduler-{}",
            ANON_SCHEDULERS.fetch_add(1, Ordering::Relaxed)
        ))
    }

    /// Return the registered scheduler called `name`, creating and starting
    /// it on first request. An empty name yields a fresh private instance.
    #[must_use]
    pub fn named(name: &str) -> Self {
        crate::registry::global_registry().get_or_create(name)
    }

    pub(crate) fn start(name: String) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(1);
        let (stop, _) = watch::channel(false);
        let sched = Self {
            inner: Arc::new(Shared {
                name,
                queue_tx,
                stop,
                gate: Mutex::new(Gate::unbounded()),
                unhandled: Mutex::new(None),
            }),
        };
        info!(scheduler = %sched.inner.name, "scheduler-start");
        tokio::spawn(event_loop(sched.clone(), queue_rx));
        sched
    }

    /// Create a single-use delivery slot which fires `delay` after a future
    /// is sent into it.
    ///
    /// The timer is cancelled if the scheduler stops or the future's own
    /// stop signal fires first.
    #[must_use]
    pub fn after(&self, delay: Duration) -> Slot {
        let (tx, rx) = oneshot::channel::<FutureRef>();
        let shared = Arc::clone(&self.inner);
        let mut stop_rx = self.inner.stop.subscribe();
        tokio::spawn(async move {
            let fut = tokio::select! {
                _ = stop_rx.wait_for(|stopped| *stopped) => return,
                delivered = rx => match delivered {
                    Ok(fut) => fut,
                    // Slot dropped unused.
                    Err(_) => return,
                },
            };
            trace!(
                scheduler = %shared.name,
                future = %fut.name(),
                delay = ?delay,
                "future-armed"
            );
            let mut future_stop = fut.stop_signal();
            tokio::select! {
                () = async { let _ = stop_rx.wait_for(|stopped| *stopped).await; } => {}
                () = async { let _ = future_stop.wait_for(|stopped| *stopped).await; } => {}
                () = time::sleep(delay) => {
                    let _ = shared.queue_tx.send(fut).await;
                }
            }
        });
        Slot { tx }
    }

    /// Delivery slot firing at `deadline`; past deadlines fire immediately.
    #[must_use]
    pub fn at(&self, deadline: Instant) -> Slot {
        self.after(deadline.saturating_duration_since(Instant::now()))
    }

    /// Delivery slot firing immediately.
    #[must_use]
    pub fn now(&self) -> Slot {
        self.after(Duration::ZERO)
    }

    /// Bound simultaneous executions to `limit`.
    ///
    /// Install the bound before relying on it: changing it while executions
    /// are in flight is not synchronized, and running work keeps whatever
    /// gate admitted it.
    ///
    /// # Panics
    ///
    /// Panics with a parameter rejection if `limit` is zero.
    pub fn concurrent(&self, limit: usize) {
        trace!(scheduler = %self.inner.name, limit, "set-concurrent");
        *self.inner.gate.lock() = Gate::bounded(limit);
    }

    /// Bound simultaneous executions to one.
    pub fn singleton(&self) {
        self.concurrent(1);
    }

    /// Install a sink receiving the typed error of any run that panicked
    /// with no failure callback registered. Without a sink such failures
    /// are logged at Error level; either way the run's callbacks are
    /// skipped.
    pub fn on_unhandled<F>(&self, sink: F)
    where
        F: Fn(SchedError) + Send + Sync + 'static,
    {
        *self.inner.unhandled.lock() = Some(Arc::new(sink));
    }

    /// Stop the scheduler: the event loop exits, pending delivery timers
    /// are cancelled, and futures already dispatched run to completion.
    ///
    /// # Panics
    ///
    /// Panics if the scheduler was already stopped.
    pub fn stop(&self) {
        debug!(scheduler = %self.inner.name, "scheduler-stopping");
        let already = self.inner.stop.send_replace(true);
        require(!already, "scheduler already stopped");
    }

    /// The scheduler's name. Anonymous instances carry a generated
    /// `scheduler-N` diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-use delivery slot returned by [`Scheduler::after`],
/// [`Scheduler::at`] and [`Scheduler::now`].
///
/// Sending consumes the slot, so exactly one future can ever be delivered
/// through it. A send after the owning scheduler stopped is dropped
/// silently.
pub struct Slot {
    tx: oneshot::Sender<FutureRef>,
}

impl Slot {
    /// Deliver a future into the slot.
    pub fn send(self, fut: impl IntoFutureRef) {
        let _ = self.tx.send(fut.into_future_ref());
    }
}

async fn event_loop(sched: Scheduler, mut ready: mpsc::Receiver<FutureRef>) {
    let mut stop_rx = sched.inner.stop.subscribe();
    debug!(scheduler = %sched.inner.name, "scheduler-loop-start");
    loop {
        let fut = tokio::select! {
            _ = stop_rx.wait_for(|stopped| *stopped) => break,
            received = ready.recv() => match received {
                Some(fut) => fut,
                None => break,
            },
        };
        if fut.stopped() {
            debug!(
                scheduler = %sched.inner.name,
                future = %fut.name(),
                "future-dropped"
            );
            continue;
        }
        // Re-arm a periodic future before this execution's outcome is
        // known; a run outlasting its interval overlaps the next one.
        if let Some(next) = fut.next() {
            sched.at(next).send(Arc::clone(&fut));
        }
        dispatch(&sched, fut);
    }
    debug!(scheduler = %sched.inner.name, "scheduler-loop-stop");
}

fn dispatch(sched: &Scheduler, fut: FutureRef) {
    let gate = sched.inner.gate.lock().clone();
    let sched = sched.clone();
    tokio::spawn(async move {
        let _permit = gate.admit().await;
        trace!(
            scheduler = %sched.inner.name,
            future = %fut.name(),
            "future-dispatch"
        );
        let runner = Arc::clone(&fut);
        let joined = tokio::task::spawn_blocking(move || runner.run()).await;
        if let Err(join_err) = joined {
            let err = if join_err.is_panic() {
                SchedError::from_panic(join_err.into_panic())
            } else {
                SchedError::Call("execution task cancelled".to_string())
            };
            let sink = sched.inner.unhandled.lock().clone();
            if let Some(sink) = sink {
                sink(err);
            } else {
                error!(
                    scheduler = %sched.inner.name,
                    future = %fut.name(),
                    error = %err,
                    "future-panicked"
                );
            }
            return;
        }
        for callback in fut.callbacks() {
            sched.now().send(callback);
        }
    });
}
