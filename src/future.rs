//! The schedulable future contract.
//!
//! A future is a deferred, possibly repeating unit of work. [`Task`] is the
//! one-shot implementation, [`Cron`] the periodic decorator; the scheduler
//! only ever sees the trait.
//!
//! [`Task`]: crate::task::Task
//! [`Cron`]: crate::cron::Cron

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;

/// A deferred, possibly repeating unit of work.
pub trait Future: Send + Sync {
    /// Execute the unit of work once and capture its outcome.
    fn run(&self);

    /// Time at which this future must be re-submitted for execution.
    ///
    /// `None` marks the future terminal. The engine consults this exactly
    /// once per delivery, before the delivered execution starts.
    fn next(&self) -> Option<Instant>;

    /// Futures to enqueue immediately after this run completes, computed
    /// from the current outcome.
    fn callbacks(&self) -> Vec<FutureRef>;

    /// Cancellation signal, observable before the future's first execution.
    ///
    /// The signal does not interrupt an execution already in flight.
    fn stop_signal(&self) -> watch::Receiver<bool>;

    /// Diagnostic name of the form `future-N`.
    fn name(&self) -> &str;

    /// Whether the future has been told to stop.
    fn stopped(&self) -> bool {
        *self.stop_signal().borrow()
    }
}

/// Shared handle to a schedulable future.
pub type FutureRef = Arc<dyn Future>;

/// Conversion into a shared future handle.
///
/// Implemented by [`Task`](crate::task::Task), [`Cron`](crate::cron::Cron)
/// and [`FutureRef`] itself, so delivery slots accept any of them.
pub trait IntoFutureRef {
    /// Convert into a shared future handle.
    fn into_future_ref(self) -> FutureRef;
}

impl IntoFutureRef for FutureRef {
    fn into_future_ref(self) -> FutureRef {
        self
    }
}

static FUTURE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Next `future-N` diagnostic name.
pub(crate) fn next_future_name() -> String {
    format!("future-{}", FUTURE_COUNTER.fetch_add(1, Ordering::Relaxed))
}
