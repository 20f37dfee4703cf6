//! # Future Sched
//!
//! An in-process future/task scheduling engine: submit units of work to run
//! once, after a delay, at a fixed time, or periodically, with success and
//! failure continuations chained between them, under an optional bound on
//! simultaneously running work.
//!
//! ## Model
//!
//! - A [`Task`] wraps a callable and its captured arguments; it runs once
//!   per dispatch and records its outcome. Continuations attach with
//!   [`Task::then`] (receives the value), [`Task::catch`] (receives the
//!   error of a panicking run), and [`Task::callback`] (always runs).
//! - A [`Cron`] decorates a task with an interval and a repeat count, plus
//!   callbacks for when it runs out of repetitions.
//! - A [`Scheduler`] owns an event loop started at creation. Its
//!   [`Scheduler::after`] / [`Scheduler::at`] / [`Scheduler::now`] methods
//!   hand out single-use delivery slots; completed runs feed their callback
//!   futures back through the loop. [`Scheduler::concurrent`] bounds how
//!   many futures execute at once.
//!
//! ## Example
//!
//! ```rust,ignore
//! use future_sched::{Scheduler, Task};
//!
//! let sched = Scheduler::new();
//!
//! let task = Task::new(|| format!("{}-{}", "x", 1));
//! task.then(|s| println!("{s}"));
//! sched.now().send(&task);
//! ```
//!
//! Named schedulers are process-wide: `Scheduler::named("reports")` returns
//! the same running instance everywhere, while `Scheduler::new()` yields a
//! private one. The registry is also available as an injectable object so
//! tests can isolate instances.
//!
//! Blocking callables are fine: execution happens on the blocking thread
//! pool, never on the event loop.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Declarative configuration for named schedulers.
pub mod config;
/// Periodic futures layered over one-shot tasks.
pub mod cron;
/// Error types for the scheduling engine.
pub mod error;
/// The schedulable future contract.
pub mod future;
/// Named-scheduler registry and process-wide defaults.
pub mod registry;
/// Scheduler, delivery slots, and admission control.
pub mod scheduler;
/// Synchronization primitives used by the engine.
pub mod sync;
/// One-shot futures wrapping a typed thunk.
pub mod task;
/// Telemetry helpers.
pub mod telemetry;

pub use config::{EngineConfig, SchedulerSettings};
pub use cron::Cron;
pub use error::{AppResult, SchedError};
pub use future::{Future, FutureRef, IntoFutureRef};
pub use registry::{after, at, global, global_registry, now, SchedulerRegistry};
pub use scheduler::{Scheduler, Slot};
pub use task::Task;
