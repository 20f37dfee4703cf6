//! One-shot futures wrapping a typed thunk.
//!
//! A [`Task`] captures its callable and arguments in a zero-argument closure
//! at construction time, so argument arity and types are checked by the
//! compiler at the call site. Continuations attach through three
//! collections: generic callbacks always enqueue after a run, success
//! callbacks ([`Task::then`]) receive the run's value, and failure callbacks
//! ([`Task::catch`]) receive the recovered error of a panicking run.
//!
//! A panic inside the callable is contained only when at least one failure
//! callback is registered at the moment `run` is invoked; with none, the
//! panic propagates out of the execution task. The containment condition is
//! deliberate: the scheduler's unhandled-failure path relies on uncontained
//! panics reaching it.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::error::{require, SchedError};
use crate::future::{next_future_name, Future, FutureRef, IntoFutureRef};
use crate::sync::Mutex;

type Thunk<T> = Box<dyn FnMut() -> T + Send>;

/// A task's callable slot. `Then`/`Catch` children start unbound and are
/// bound by the parent once the parent's outcome is known.
enum ThunkSlot<T> {
    Bound(Thunk<T>),
    Unbound,
}

/// Result state guarded by the per-instance lock: written by `run`, read by
/// `callbacks`.
struct TaskState<T> {
    thunk: ThunkSlot<T>,
    ret: Option<T>,
    recover: Option<SchedError>,
}

/// A success continuation: re-binds its child task to the producing run's
/// value and yields the child for enqueueing.
trait SuccessHook<T>: Send {
    fn arm(&self, value: &T) -> FutureRef;
}

/// A failure continuation: binds its child task to the recovered error.
trait FailureHook: Send {
    fn arm(&self, err: &SchedError) -> FutureRef;
}

struct ThenHook<U, F> {
    child: Task<U>,
    f: Arc<Mutex<F>>,
}

impl<T, U, F> SuccessHook<T> for ThenHook<U, F>
where
    T: Clone + Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> U + Send + 'static,
{
    fn arm(&self, value: &T) -> FutureRef {
        let f = Arc::clone(&self.f);
        let value = value.clone();
        self.child.bind(move || {
            let mut call = f.lock();
            (*call)(value.clone())
        });
        self.child.handle()
    }
}

struct CatchHook<U, F> {
    child: Task<U>,
    f: Arc<Mutex<F>>,
}

impl<U, F> FailureHook for CatchHook<U, F>
where
    U: Send + 'static,
    F: FnMut(SchedError) -> U + Send + 'static,
{
    fn arm(&self, err: &SchedError) -> FutureRef {
        let f = Arc::clone(&self.f);
        let err = err.clone();
        self.child.bind(move || {
            let mut call = f.lock();
            (*call)(err.clone())
        });
        self.child.handle()
    }
}

struct Hooks<T> {
    cb: Vec<FutureRef>,
    onsuccess: Vec<Box<dyn SuccessHook<T>>>,
    onfailure: Vec<Box<dyn FailureHook>>,
}

pub(crate) struct TaskInner<T> {
    name: String,
    state: Mutex<TaskState<T>>,
    hooks: Mutex<Hooks<T>>,
    stop: watch::Sender<bool>,
}

impl<T: Send + 'static> TaskInner<T> {
    /// Invoke the thunk under the per-instance lock and store the outcome.
    fn invoke(&self) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        match &mut state.thunk {
            ThunkSlot::Bound(thunk) => {
                let value = thunk();
                state.ret = Some(value);
                state.recover = None;
            }
            ThunkSlot::Unbound => {
                drop(guard);
                require(false, "task has no bound arguments");
            }
        }
    }

    pub(crate) fn run_once(&self) {
        debug!(future = %self.name, "future-run");
        // A panic is contained only when a failure callback is registered at
        // call time; otherwise it propagates out of the execution task.
        let contain = !self.hooks.lock().onfailure.is_empty();
        if contain {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| self.invoke())) {
                let err = SchedError::from_panic(payload);
                error!(future = %self.name, error = %err, "future-recovered");
                self.state.lock().recover = Some(err);
            }
        } else {
            self.invoke();
        }
    }

    pub(crate) fn collect_callbacks(&self) -> Vec<FutureRef> {
        let hooks = self.hooks.lock();
        let mut out = hooks.cb.clone();
        let state = self.state.lock();
        if let Some(err) = &state.recover {
            for hook in &hooks.onfailure {
                out.push(hook.arm(err));
            }
        } else if let Some(value) = &state.ret {
            for hook in &hooks.onsuccess {
                out.push(hook.arm(value));
            }
        }
        out
    }

    pub(crate) fn stop_rx(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }

    pub(crate) fn label(&self) -> &str {
        &self.name
    }
}

impl<T: Send + 'static> Future for TaskInner<T> {
    fn run(&self) {
        self.run_once();
    }

    fn next(&self) -> Option<Instant> {
        None
    }

    fn callbacks(&self) -> Vec<FutureRef> {
        self.collect_callbacks()
    }

    fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop_rx()
    }

    fn name(&self) -> &str {
        self.label()
    }
}

/// A one-shot future wrapping a callable and its captured arguments.
///
/// The handle is cheap to clone; clones share the same underlying task.
///
/// ```
/// use future_sched::{Future, Task};
///
/// let task = Task::new(|| 2 + 2);
/// let doubled = task.then(|n| n * 2);
///
/// task.handle().run();
/// for cb in task.handle().callbacks() {
///     cb.run();
/// }
/// # drop(doubled);
/// ```
pub struct Task<T> {
    pub(crate) inner: Arc<TaskInner<T>>,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Task<T> {
    /// Create a future which runs `f` once per dispatch.
    ///
    /// Arguments are captured in the closure, so arity and types are
    /// validated by the compiler before a task can exist.
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        let task = Self::placeholder();
        task.bind(f);
        task
    }

    /// Create a task whose arguments are determined later.
    pub(crate) fn placeholder() -> Self {
        let name = next_future_name();
        debug!(future = %name, "new-future");
        let (stop, _) = watch::channel(false);
        Self {
            inner: Arc::new(TaskInner {
                name,
                state: Mutex::new(TaskState {
                    thunk: ThunkSlot::Unbound,
                    ret: None,
                    recover: None,
                }),
                hooks: Mutex::new(Hooks {
                    cb: Vec::new(),
                    onsuccess: Vec::new(),
                    onfailure: Vec::new(),
                }),
                stop,
            }),
        }
    }

    /// Bind (or re-bind) the zero-argument thunk this task runs.
    pub(crate) fn bind<F>(&self, f: F)
    where
        F: FnMut() -> T + Send + 'static,
    {
        self.inner.state.lock().thunk = ThunkSlot::Bound(Box::new(f));
    }

    /// Append a generic callback which runs after every completed run of
    /// this task, regardless of outcome. Returns the created task.
    pub fn callback<U, F>(&self, f: F) -> Task<U>
    where
        U: Send + 'static,
        F: FnMut() -> U + Send + 'static,
    {
        let child = Task::new(f);
        self.inner.hooks.lock().cb.push(child.handle());
        child
    }

    /// Append an existing future as a generic callback.
    pub fn callback_future(&self, fut: impl IntoFutureRef) {
        self.inner.hooks.lock().cb.push(fut.into_future_ref());
    }

    /// Append a success callback receiving this task's return value.
    ///
    /// Input assignability is checked by the compiler at the attach site:
    /// `f` must accept exactly the task's output type. Returns the created
    /// child task, itself chainable.
    pub fn then<U, F>(&self, f: F) -> Task<U>
    where
        T: Clone,
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        let child = Task::placeholder();
        self.inner.hooks.lock().onsuccess.push(Box::new(ThenHook {
            child: child.clone(),
            f: Arc::new(Mutex::new(f)),
        }));
        child
    }

    /// Append a failure callback receiving the error recovered from a
    /// panicking run. Registering at least one also switches the task to
    /// containing panics instead of propagating them.
    pub fn catch<U, F>(&self, f: F) -> Task<U>
    where
        U: Send + 'static,
        F: FnMut(SchedError) -> U + Send + 'static,
    {
        let child = Task::placeholder();
        self.inner.hooks.lock().onfailure.push(Box::new(CatchHook {
            child: child.clone(),
            f: Arc::new(Mutex::new(f)),
        }));
        child
    }

    /// Signal the task to stop.
    ///
    /// Effective only while the task waits for its delivery timer; a run
    /// already dispatched completes normally.
    pub fn stop(&self) {
        debug!(future = %self.inner.name, "future-stop");
        self.inner.stop.send_replace(true);
    }

    /// Diagnostic name of the form `future-N`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Shared schedulable handle to this task.
    #[must_use]
    pub fn handle(&self) -> FutureRef {
        Arc::clone(&self.inner) as FutureRef
    }
}

impl<T: Send + 'static> IntoFutureRef for &Task<T> {
    fn into_future_ref(self) -> FutureRef {
        self.handle()
    }
}

impl<T> fmt::Display for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}
