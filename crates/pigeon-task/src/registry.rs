//! Task registry for tracking spawned worker threads.
//!
//! Every task gets its own [`CancellationToken`]. The registry keeps the token
//! and the join handle under one mutex so that `kill` and `spawn` can race
//! from different threads; the mutex is never held while joining.

use crate::{CancellationToken, TaskError};
use std::any::Any;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// Handle ids are unique across registries so a foreign handle never aliases a local task.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Id of the registry that spawned the current thread, if any
    static OWNER: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Identifies a task spawned through a [`TaskRegistry`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle {
    id: u64,
    name: Arc<str>,
}

impl TaskHandle {
    fn next(name: &str) -> Self {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            name: Arc::from(name),
        }
    }

    /// Numeric id, increasing in spawn order
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Task name, also used as the OS thread name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Outcome of stopping or joining a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// The task was signalled (if applicable) and has terminated
    Stopped,
    /// The task terminated by panicking
    Panicked,
    /// No task is registered under this handle
    NotFound,
}

impl KillOutcome {
    /// Whether the task terminated normally
    pub fn is_success(&self) -> bool {
        matches!(self, KillOutcome::Stopped)
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            KillOutcome::Stopped => "stopped",
            KillOutcome::Panicked => "panicked",
            KillOutcome::NotFound => "not found",
        }
    }
}

struct RegisteredTask {
    handle: TaskHandle,
    token: CancellationToken,
    join: JoinHandle<()>,
}

/// Registry of running tasks owned by a single watcher or runner
pub struct TaskRegistry {
    id: u64,
    label: String,
    tasks: Mutex<BTreeMap<u64, RegisteredTask>>,
}

impl TaskRegistry {
    /// Create an empty registry; `label` prefixes log lines and thread names
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
            tasks: Mutex::new(BTreeMap::new()),
        }
    }

    /// Label given at construction
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Spawn `body` on a new named thread with its own cancellation token.
    ///
    /// The task is registered before its thread starts, so a handle returned
    /// from here can always be killed or joined.
    pub fn spawn<F>(&self, name: &str, body: F) -> Result<TaskHandle, TaskError>
    where
        F: FnOnce(CancellationToken) + Send + 'static,
    {
        let handle = TaskHandle::next(name);
        let token = CancellationToken::new();
        let thread_token = token.clone();
        let owner = self.id;

        // Hold the lock across the spawn so the entry exists before the body can run.
        let mut tasks = self.lock();
        let join = thread::Builder::new()
            .name(format!("{}-{}", self.label, handle))
            .spawn(move || {
                OWNER.with(|cell| cell.set(Some(owner)));
                body(thread_token)
            })
            .map_err(|source| TaskError::Spawn {
                name: name.to_string(),
                source,
            })?;

        tracing::debug!("[{}] Started {}", self.label, handle);
        tasks.insert(
            handle.id,
            RegisteredTask {
                handle: handle.clone(),
                token,
                join,
            },
        );

        Ok(handle)
    }

    /// Signal a task's token and block until its thread terminates.
    ///
    /// A handle that is not registered (never spawned here, or already
    /// killed/joined/reaped) reports [`KillOutcome::NotFound`].
    ///
    /// Called from one of this registry's own tasks, the target is signalled
    /// but not waited for: it may itself be waiting on the caller.
    pub fn kill(&self, handle: &TaskHandle) -> KillOutcome {
        let Some(task) = self.remove(handle) else {
            tracing::warn!(
                "[{}] Failed to stop {}: no cancellation token registered",
                self.label,
                handle
            );
            return KillOutcome::NotFound;
        };

        self.cancel(task)
    }

    /// Kill every registered task in spawn order.
    ///
    /// Tasks registered while this runs (for example batches started by a
    /// controller that has not yet seen its token) are killed too. Like
    /// [`kill`](Self::kill), waits only when called from outside the registry.
    pub fn kill_all(&self) -> Vec<(TaskHandle, KillOutcome)> {
        let mut outcomes = Vec::new();
        while let Some(task) = self.pop_first() {
            let handle = task.handle.clone();
            let outcome = self.cancel(task);
            outcomes.push((handle, outcome));
        }
        outcomes
    }

    /// Block until a task terminates, without signalling it
    pub fn join(&self, handle: &TaskHandle) -> KillOutcome {
        match self.remove(handle) {
            Some(task) => self.finish(task),
            None => KillOutcome::NotFound,
        }
    }

    /// Join every registered task in spawn order without signalling them.
    ///
    /// Returns the number of tasks joined.
    pub fn join_all(&self) -> usize {
        let mut joined = 0;
        while let Some(task) = self.pop_first() {
            tracing::debug!("[{}] Joining {}", self.label, task.handle);
            self.finish(task);
            joined += 1;
        }
        joined
    }

    /// Drop registrations whose threads have already terminated
    pub fn reap_finished(&self) -> usize {
        let finished: Vec<RegisteredTask> = {
            let mut tasks = self.lock();
            let ids: Vec<u64> = tasks
                .iter()
                .filter(|(_, task)| task.join.is_finished())
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter().filter_map(|id| tasks.remove(&id)).collect()
        };

        let count = finished.len();
        for task in finished {
            self.finish(task);
        }
        count
    }

    /// Whether `handle` is still registered
    pub fn is_registered(&self, handle: &TaskHandle) -> bool {
        self.lock().contains_key(&handle.id)
    }

    /// Whether `handle` is registered and its thread has not terminated
    pub fn is_alive(&self, handle: &TaskHandle) -> bool {
        self.lock()
            .get(&handle.id)
            .is_some_and(|task| !task.join.is_finished())
    }

    /// Handles of all registered tasks, in spawn order
    pub fn handles(&self) -> Vec<TaskHandle> {
        self.lock().values().map(|task| task.handle.clone()).collect()
    }

    /// Number of registered tasks
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no tasks are registered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn remove(&self, handle: &TaskHandle) -> Option<RegisteredTask> {
        self.lock().remove(&handle.id)
    }

    fn pop_first(&self) -> Option<RegisteredTask> {
        self.lock().pop_first().map(|(_, task)| task)
    }

    fn cancel(&self, task: RegisteredTask) -> KillOutcome {
        tracing::info!("[{}] Cancelling {}", self.label, task.handle);
        task.token.cancel();

        if self.on_own_task() {
            tracing::debug!(
                "[{}] {} signalled from a task of the same registry, not waiting",
                self.label,
                task.handle
            );
            return KillOutcome::Stopped;
        }
        self.finish(task)
    }

    fn on_own_task(&self) -> bool {
        OWNER.with(|owner| owner.get() == Some(self.id))
    }

    fn finish(&self, task: RegisteredTask) -> KillOutcome {
        let RegisteredTask { handle, join, .. } = task;

        if join.thread().id() == thread::current().id() {
            // A task stopping itself; its thread exits when the caller returns.
            tracing::debug!("[{}] {} stopped from its own thread", self.label, handle);
            return KillOutcome::Stopped;
        }

        if !join.is_finished() {
            tracing::debug!("[{}] Waiting for {} to exit", self.label, handle);
        }

        match join.join() {
            Ok(()) => {
                tracing::info!("[{}] Successfully exited {}", self.label, handle);
                KillOutcome::Stopped
            }
            Err(payload) => {
                tracing::warn!(
                    "[{}] {} terminated by panic: {}",
                    self.label,
                    handle,
                    panic_message(payload.as_ref())
                );
                KillOutcome::Panicked
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, RegisteredTask>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("label", &self.label)
            .field("tasks", &self.handles())
            .finish()
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
