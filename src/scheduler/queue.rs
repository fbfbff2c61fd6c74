//! The dependency-aware task queue.
//!
//! The queue is responsible for:
//! - Admitting tasks and partitioning them into ready/waiting
//! - Exposing only tasks whose dependencies are all completed
//! - Preserving arrival order among ready tasks
//! - Promoting waiting tasks when their last dependency completes
//! - O(1) status/identity lookup by id, plus lookup by name
//!
//! All mutable state lives behind a single mutex: one id-to-task registry
//! with status on the record, the FIFO ready sequence, the admission-ordered
//! waiting list, a reverse dependency index, and the name index. Every
//! scheduling decision happens inside that critical section, and no call
//! suspends while holding it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::status::TaskStatus;
use crate::core::task::{RecordError, Task};
use crate::core::types::TaskId;
use crate::events::{Event, EventBus};

/// Errors surfaced by queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The id is not registered with this queue.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// Each task may be admitted exactly once.
    #[error("task already enqueued: {0}")]
    DuplicateTask(TaskId),

    /// The task has been handed to a runner and can no longer be canceled.
    #[error("task is in flight: {0}")]
    TaskInFlight(TaskId),

    /// Invalid mutation of a task record's graph edges.
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Read-only snapshot of one task's scheduler-visible state.
#[derive(Debug, Clone, Serialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub parent_task_id: Option<TaskId>,
    pub sub_task_ids: Vec<TaskId>,
    pub dependency_task_ids: Vec<TaskId>,
}

impl TaskInfo {
    fn snapshot(task: &dyn Task) -> Self {
        let record = task.record();
        Self {
            id: record.id().clone(),
            name: record.name().to_string(),
            status: record.status(),
            parent_task_id: record.parent_task_id(),
            sub_task_ids: record.sub_task_ids(),
            dependency_task_ids: record.dependency_task_ids(),
        }
    }
}

/// Counters describing the queue's current population.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueueStats {
    /// Total tasks ever admitted and still registered.
    pub total: usize,
    /// Tasks in the ready sequence.
    pub ready: usize,
    /// Tasks blocked on unmet dependencies.
    pub waiting: usize,
    /// Tasks handed to a runner and not yet reported.
    pub in_flight: usize,
    pub completed: usize,
    pub failed: usize,
    pub canceled: usize,
}

/// Mutable queue state, guarded by one mutex.
struct QueueState {
    /// Every admitted task, keyed by id. Status lives on the record, so a
    /// task is never tracked in two places at once.
    registry: HashMap<TaskId, Arc<dyn Task>>,
    /// FIFO sequence of tasks ready for dispatch.
    ready: VecDeque<TaskId>,
    /// Blocked tasks in admission order, so promotion is stable.
    waiting: Vec<TaskId>,
    /// Reverse dependency index: completed-id -> tasks waiting on it.
    /// A completion only re-examines tasks that hold an edge to it.
    dependents: HashMap<TaskId, Vec<TaskId>>,
    /// Name lookup, last write wins on collisions.
    names: HashMap<String, TaskId>,
}

impl QueueState {
    fn dep_completed(&self, dep: &TaskId) -> bool {
        self.registry
            .get(dep)
            .map(|t| t.record().status().satisfies_dependency())
            .unwrap_or(false)
    }

    fn deps_completed(&self, id: &TaskId) -> bool {
        match self.registry.get(id) {
            Some(task) => task
                .record()
                .dependency_task_ids()
                .iter()
                .all(|d| self.dep_completed(d)),
            None => false,
        }
    }
}

/// A single-process, dependency-aware task queue.
///
/// Multiple threads and tokio tasks may call [`enqueue`](Self::enqueue),
/// [`dequeue`](Self::dequeue) and [`mark_completed`](Self::mark_completed)
/// concurrently; the mutex makes each scheduling decision atomic, so no
/// caller observes a torn intermediate state and no ready task is ever
/// claimed twice.
pub struct TaskQueue {
    state: Mutex<QueueState>,
    events: EventBus,
}

impl TaskQueue {
    /// Create an empty queue with the default event capacity.
    pub fn new() -> Self {
        Self::with_event_capacity(256)
    }

    /// Create an empty queue with an explicit event channel capacity.
    pub fn with_event_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                registry: HashMap::new(),
                ready: VecDeque::new(),
                waiting: Vec::new(),
                dependents: HashMap::new(),
                names: HashMap::new(),
            }),
            events: EventBus::with_capacity(capacity),
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Admit a task.
    ///
    /// Readiness is evaluated against the current set of completed tasks:
    /// with every dependency completed (or none declared) the task goes to
    /// the tail of the ready sequence as `Queued`, otherwise it is parked
    /// as `WaitingOnDependencies`. A dependency id unknown to this queue
    /// counts as unmet.
    ///
    /// Admitting the same id twice returns [`QueueError::DuplicateTask`].
    pub fn enqueue(&self, task: Arc<dyn Task>) -> Result<(), QueueError> {
        let mut state = self.state.lock().expect("queue lock poisoned");
        let event = Self::admit_locked(&mut state, task)?;
        drop(state);
        self.events.emit(event);
        Ok(())
    }

    /// Claim the task at the head of the ready sequence.
    ///
    /// Returns `None` when nothing is ready. This is the queue's only
    /// back-pressure signal: it never blocks and never errors on empty.
    /// The claimed task transitions to `SentToRunner`; the mutex guarantees
    /// no task is returned to two callers.
    pub fn dequeue(&self) -> Option<Arc<dyn Task>> {
        let mut state = self.state.lock().expect("queue lock poisoned");
        let id = state.ready.pop_front()?;
        let task = state
            .registry
            .get(&id)
            .cloned()
            .expect("ready id missing from registry");
        task.record().set_status(TaskStatus::SentToRunner);
        drop(state);
        debug!(task = %id, "task dispatched");
        self.events.emit(Event::task_dispatched(id));
        Some(task)
    }

    /// Record that a runner has begun executing a dequeued task.
    ///
    /// Advisory: only a `SentToRunner` task moves to `Running`; any other
    /// status is left untouched with a warning. Unknown ids error.
    pub fn mark_running(&self, id: &TaskId) -> Result<(), QueueError> {
        let state = self.state.lock().expect("queue lock poisoned");
        let task = state
            .registry
            .get(id)
            .cloned()
            .ok_or_else(|| QueueError::TaskNotFound(id.clone()))?;
        let status = task.record().status();
        if status != TaskStatus::SentToRunner {
            warn!(task = %id, %status, "mark_running ignored: task is not sent_to_runner");
            return Ok(());
        }
        task.record().set_status(TaskStatus::Running);
        drop(state);
        debug!(task = %id, "task running");
        self.events.emit(Event::task_started(id.clone()));
        Ok(())
    }

    /// Report a task's outcome.
    ///
    /// Sets `Completed` or `Failed`, then, on success, promotes every
    /// waiting task whose dependencies are now all completed into the
    /// ready sequence, preserving their relative admission order. Only a
    /// completed prerequisite unblocks dependents; a failed one strands
    /// them permanently.
    ///
    /// Unknown ids return [`QueueError::TaskNotFound`]. Reporting a task
    /// that is already terminal is an idempotent no-op.
    pub fn mark_completed(&self, id: &TaskId, success: bool) -> Result<(), QueueError> {
        let mut state = self.state.lock().expect("queue lock poisoned");
        let task = state
            .registry
            .get(id)
            .cloned()
            .ok_or_else(|| QueueError::TaskNotFound(id.clone()))?;
        let status = task.record().status();
        if status.is_terminal() {
            warn!(task = %id, %status, "duplicate completion report ignored");
            return Ok(());
        }

        // A supervisor may force-complete a task that was never dispatched;
        // drop it from whichever sequence still holds it.
        match status {
            TaskStatus::Queued => state.ready.retain(|t| t != id),
            TaskStatus::WaitingOnDependencies => state.waiting.retain(|t| t != id),
            _ => {}
        }

        let mut emitted = Vec::new();
        if success {
            task.record().set_status(TaskStatus::Completed);
            emitted.push(Event::task_completed(id.clone()));

            let candidates: HashSet<TaskId> =
                state.dependents.remove(id).into_iter().flatten().collect();
            if !candidates.is_empty() {
                let promoted: Vec<TaskId> = state
                    .waiting
                    .iter()
                    .filter(|wid| candidates.contains(*wid) && state.deps_completed(*wid))
                    .cloned()
                    .collect();
                for wid in &promoted {
                    state.waiting.retain(|t| t != wid);
                    state.ready.push_back(wid.clone());
                    if let Some(t) = state.registry.get(wid) {
                        t.record().set_status(TaskStatus::Queued);
                    }
                    debug!(task = %wid, unblocked_by = %id, "task promoted to ready");
                    emitted.push(Event::task_ready(wid.clone()));
                }
            }
        } else {
            task.record().set_status(TaskStatus::Failed);
            emitted.push(Event::task_failed(id.clone()));
            // Dependents of a failed task can never be promoted.
            if let Some(stranded) = state.dependents.remove(id) {
                for sid in stranded {
                    warn!(task = %sid, failed_dependency = %id, "task permanently stranded");
                }
            }
        }

        drop(state);
        debug!(task = %id, success, "task completion recorded");
        for event in emitted {
            self.events.emit(event);
        }
        Ok(())
    }

    /// Cancel a task that has not yet been handed to a runner.
    ///
    /// `Queued` and `WaitingOnDependencies` tasks move to the terminal
    /// `Canceled` status; their dependents are stranded exactly as with a
    /// failure. An in-flight task returns [`QueueError::TaskInFlight`] --
    /// the queue has no way to abort running work. Canceling a task that
    /// is already terminal is an idempotent no-op.
    pub fn cancel(&self, id: &TaskId) -> Result<(), QueueError> {
        let mut state = self.state.lock().expect("queue lock poisoned");
        let task = state
            .registry
            .get(id)
            .cloned()
            .ok_or_else(|| QueueError::TaskNotFound(id.clone()))?;
        let status = task.record().status();
        if status.is_terminal() {
            warn!(task = %id, %status, "cancel ignored: task already terminal");
            return Ok(());
        }
        if status.is_in_flight() {
            return Err(QueueError::TaskInFlight(id.clone()));
        }

        match status {
            TaskStatus::Queued => state.ready.retain(|t| t != id),
            TaskStatus::WaitingOnDependencies => state.waiting.retain(|t| t != id),
            _ => {}
        }
        task.record().set_status(TaskStatus::Canceled);
        state.dependents.remove(id);
        drop(state);
        debug!(task = %id, "task canceled");
        self.events.emit(Event::task_canceled(id.clone()));
        Ok(())
    }

    /// Look up a task snapshot by id.
    ///
    /// Covers every admitted task regardless of status. Returns `None`
    /// for unknown ids, never an error.
    pub fn get_task_info(&self, id: &TaskId) -> Option<TaskInfo> {
        let state = self.state.lock().expect("queue lock poisoned");
        state.registry.get(id).map(|t| TaskInfo::snapshot(t.as_ref()))
    }

    /// Look up a task snapshot by name. On name collisions the most
    /// recently admitted task wins.
    pub fn get_task_info_by_name(&self, name: &str) -> Option<TaskInfo> {
        let state = self.state.lock().expect("queue lock poisoned");
        let id = state.names.get(name)?;
        state.registry.get(id).map(|t| TaskInfo::snapshot(t.as_ref()))
    }

    /// Current population counters.
    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock().expect("queue lock poisoned");
        let mut stats = QueueStats {
            total: state.registry.len(),
            ready: state.ready.len(),
            waiting: state.waiting.len(),
            in_flight: 0,
            completed: 0,
            failed: 0,
            canceled: 0,
        };
        for task in state.registry.values() {
            match task.record().status() {
                TaskStatus::SentToRunner | TaskStatus::Running => stats.in_flight += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
                TaskStatus::Canceled => stats.canceled += 1,
                _ => {}
            }
        }
        stats
    }

    /// Ids currently parked on unmet dependencies, in admission order.
    pub fn waiting_ids(&self) -> Vec<TaskId> {
        let state = self.state.lock().expect("queue lock poisoned");
        state.waiting.clone()
    }

    /// Register `child` as a sub-task of `parent_id` and admit it, all
    /// under one lock acquisition so the edge mutations and the admission
    /// are atomic. Called through the execution context.
    pub(crate) fn enqueue_sub_task(
        &self,
        parent_id: &TaskId,
        child: Arc<dyn Task>,
    ) -> Result<(), QueueError> {
        let mut state = self.state.lock().expect("queue lock poisoned");
        let parent = state
            .registry
            .get(parent_id)
            .cloned()
            .ok_or_else(|| QueueError::TaskNotFound(parent_id.clone()))?;
        let child_id = child.record().id().clone();
        if state.registry.contains_key(&child_id) {
            return Err(QueueError::DuplicateTask(child_id));
        }

        child.record().set_parent(parent_id.clone())?;
        parent.record().push_sub_task(child_id);
        let event = Self::admit_locked(&mut state, child)?;
        drop(state);
        self.events.emit(event);
        Ok(())
    }

    /// Admit `next` as a follow-on of `current_id`: its dependency list
    /// gains the current task's id plus a snapshot of the sub-task ids the
    /// current task has registered as of this call. Sub-tasks registered
    /// later are not retroactively added. One lock acquisition end to end.
    pub(crate) fn enqueue_next_task(
        &self,
        current_id: &TaskId,
        next: Arc<dyn Task>,
    ) -> Result<(), QueueError> {
        let mut state = self.state.lock().expect("queue lock poisoned");
        let current = state
            .registry
            .get(current_id)
            .cloned()
            .ok_or_else(|| QueueError::TaskNotFound(current_id.clone()))?;
        let next_id = next.record().id().clone();
        if state.registry.contains_key(&next_id) {
            return Err(QueueError::DuplicateTask(next_id));
        }

        next.record().push_dependency_unique(current_id.clone());
        for sub_id in current.record().sub_task_ids() {
            next.record().push_dependency_unique(sub_id);
        }
        let event = Self::admit_locked(&mut state, next)?;
        drop(state);
        self.events.emit(event);
        Ok(())
    }

    /// Shared admission path. Caller holds the lock.
    fn admit_locked(state: &mut QueueState, task: Arc<dyn Task>) -> Result<Event, QueueError> {
        let id = task.record().id().clone();
        if state.registry.contains_key(&id) {
            return Err(QueueError::DuplicateTask(id));
        }
        let name = task.record().name().to_string();
        let deps = task.record().dependency_task_ids();

        let mut ready = true;
        for dep in &deps {
            if !state.dep_completed(dep) {
                ready = false;
                state.dependents.entry(dep.clone()).or_default().push(id.clone());
            }
        }

        state.names.insert(name.clone(), id.clone());
        state.registry.insert(id.clone(), task.clone());
        if ready {
            task.record().set_status(TaskStatus::Queued);
            state.ready.push_back(id.clone());
        } else {
            task.record().set_status(TaskStatus::WaitingOnDependencies);
            state.waiting.push(id.clone());
        }
        debug!(task = %id, name = %name, waiting = !ready, "task admitted");
        Ok(Event::task_enqueued(id, name, !ready))
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
