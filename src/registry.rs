//! Named-scheduler registry and process-wide defaults.
//!
//! Non-empty scheduler names are unique per registry: the first request
//! creates and starts the instance, later requests return the same handle,
//! and entries are never removed. The registry is an explicit object so
//! tests can instantiate isolated ones; [`global_registry`] is the
//! process-wide instance backing [`Scheduler::named`].
//!
//! The module also carries the process-wide default scheduler and the free
//! [`after`] / [`at`] / [`now`] shortcuts onto it.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use tokio::time::Instant;

use crate::scheduler::{Scheduler, Slot};
use crate::sync::RwLock;

/// Registry of named schedulers guarded by a single lock.
#[derive(Default)]
pub struct SchedulerRegistry {
    entries: RwLock<HashMap<String, Scheduler>>,
}

impl SchedulerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the scheduler registered under `name`, creating and starting
    /// it on first request. An empty name yields a fresh private scheduler
    /// which is never registered.
    ///
    /// Must be called within a Tokio runtime when it creates an instance.
    #[must_use]
    pub fn get_or_create(&self, name: &str) -> Scheduler {
        if name.is_empty() {
            return Scheduler::new();
        }
        if let Some(found) = self.entries.read().get(name) {
            return found.clone();
        }
        let mut entries = self.entries.write();
        entries
            .entry(name.to_string())
            .or_insert_with(|| Scheduler::start(name.to_string()))
            .clone()
    }

    /// Look up a previously registered scheduler.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Scheduler> {
        self.entries.read().get(name).cloned()
    }
}

/// Process-wide registry backing [`Scheduler::named`].
pub fn global_registry() -> &'static SchedulerRegistry {
    static REGISTRY: OnceLock<SchedulerRegistry> = OnceLock::new();
    REGISTRY.get_or_init(SchedulerRegistry::new)
}

/// Process-wide default scheduler, created on first use.
///
/// Must first be called within a Tokio runtime.
#[must_use]
pub fn global() -> Scheduler {
    static GLOBAL: OnceLock<Scheduler> = OnceLock::new();
    GLOBAL.get_or_init(Scheduler::new).clone()
}

/// Delivery slot on the default scheduler firing after `delay`.
#[must_use]
pub fn after(delay: Duration) -> Slot {
    global().after(delay)
}

/// Delivery slot on the default scheduler firing at `deadline`.
#[must_use]
pub fn at(deadline: Instant) -> Slot {
    global().at(deadline)
}

/// Delivery slot on the default scheduler firing immediately.
#[must_use]
pub fn now() -> Slot {
    global().now()
}
