//! Task trait, task record and error types.
//!
//! The `Task` trait is the contract between the scheduler and a unit of
//! work: a narrow graph view (the [`TaskRecord`]) plus an opaque execute
//! behavior. Task input and output payloads stay inside the concrete
//! implementation; the scheduler never inspects them.

use async_trait::async_trait;
use std::sync::RwLock;
use thiserror::Error;

use super::status::TaskStatus;
use super::types::TaskId;
use crate::scheduler::{ExecutionContext, QueueError};

/// Errors from mutating a task record's graph edges.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The parent back-reference is set at most once.
    #[error("parent already set for task {0}")]
    ParentAlreadySet(TaskId),

    /// Dependencies may be appended only before the task is admitted.
    #[error("dependencies are frozen once task {0} is admitted")]
    DependenciesFrozen(TaskId),
}

/// Errors that can occur during task execution.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task execution failed with a message.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Error extending the graph through the execution context.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Mutable portion of a task record, guarded by one lock.
#[derive(Debug)]
struct RecordState {
    status: TaskStatus,
    parent_task_id: Option<TaskId>,
    sub_task_ids: Vec<TaskId>,
    dependency_task_ids: Vec<TaskId>,
}

/// The scheduler-visible state of one task: identity, status and graph
/// edges. Everything else about a task is opaque to the queue.
///
/// The mutable fields sit behind an interior lock so a record can be shared
/// between the queue, the runner and the task body via `Arc`. Status and
/// edge mutations happen only under the queue's own mutex, so this lock is
/// a leaf and is never held across an await point.
#[derive(Debug)]
pub struct TaskRecord {
    id: TaskId,
    name: String,
    state: RwLock<RecordState>,
}

impl TaskRecord {
    /// Create a record in status `New` with a fresh id and no edges.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            name: name.into(),
            state: RwLock::new(RecordState {
                status: TaskStatus::New,
                parent_task_id: None,
                sub_task_ids: Vec::new(),
                dependency_task_ids: Vec::new(),
            }),
        }
    }

    /// Create a record in status `New` with the given dependencies.
    pub fn with_dependencies(name: impl Into<String>, deps: Vec<TaskId>) -> Self {
        let record = Self::new(name);
        record
            .state
            .write()
            .expect("record lock poisoned")
            .dependency_task_ids = deps;
        record
    }

    /// The task's immutable identifier.
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// The human-readable name used by the queue's name index.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle status.
    pub fn status(&self) -> TaskStatus {
        self.state.read().expect("record lock poisoned").status
    }

    /// Back-reference to the task that spawned this one, if any.
    pub fn parent_task_id(&self) -> Option<TaskId> {
        self.state
            .read()
            .expect("record lock poisoned")
            .parent_task_id
            .clone()
    }

    /// Ids of the sub-tasks this task has registered, in registration order.
    pub fn sub_task_ids(&self) -> Vec<TaskId> {
        self.state
            .read()
            .expect("record lock poisoned")
            .sub_task_ids
            .clone()
    }

    /// Ids this task must wait for before it becomes ready.
    pub fn dependency_task_ids(&self) -> Vec<TaskId> {
        self.state
            .read()
            .expect("record lock poisoned")
            .dependency_task_ids
            .clone()
    }

    /// Append a dependency. Allowed only while the task is still `New`;
    /// after admission the dependency set is frozen.
    pub fn add_dependency(&self, dep: TaskId) -> Result<(), RecordError> {
        let mut state = self.state.write().expect("record lock poisoned");
        if state.status != TaskStatus::New {
            return Err(RecordError::DependenciesFrozen(self.id.clone()));
        }
        if !state.dependency_task_ids.contains(&dep) {
            state.dependency_task_ids.push(dep);
        }
        Ok(())
    }

    pub(crate) fn set_status(&self, status: TaskStatus) {
        self.state.write().expect("record lock poisoned").status = status;
    }

    pub(crate) fn set_parent(&self, parent: TaskId) -> Result<(), RecordError> {
        let mut state = self.state.write().expect("record lock poisoned");
        if state.parent_task_id.is_some() {
            return Err(RecordError::ParentAlreadySet(self.id.clone()));
        }
        state.parent_task_id = Some(parent);
        Ok(())
    }

    pub(crate) fn push_sub_task(&self, child: TaskId) {
        self.state
            .write()
            .expect("record lock poisoned")
            .sub_task_ids
            .push(child);
    }

    // Bypasses the `New`-only rule: used by the queue when wiring a
    // follow-on task's dependencies under its own lock, before admission.
    pub(crate) fn push_dependency_unique(&self, dep: TaskId) {
        let mut state = self.state.write().expect("record lock poisoned");
        if !state.dependency_task_ids.contains(&dep) {
            state.dependency_task_ids.push(dep);
        }
    }
}

/// The core trait for schedulable tasks.
///
/// The queue depends only on the [`TaskRecord`] view; `execute` is the
/// opaque behavior supplied by the task implementation and invoked by a
/// runner, never by the queue itself.
///
/// # Example
///
/// ```ignore
/// use workgraph::{ExecutionContext, Task, TaskError, TaskRecord};
/// use async_trait::async_trait;
///
/// struct Double {
///     record: TaskRecord,
///     input: i64,
///     output: std::sync::Mutex<Option<i64>>,
/// }
///
/// #[async_trait]
/// impl Task for Double {
///     fn record(&self) -> &TaskRecord {
///         &self.record
///     }
///
///     async fn execute(&self, _ctx: &ExecutionContext) -> Result<(), TaskError> {
///         *self.output.lock().unwrap() = Some(self.input * 2);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync {
    /// The scheduler-visible record for this task.
    fn record(&self) -> &TaskRecord;

    /// Execute the task.
    ///
    /// The context is the only sanctioned channel for extending the graph
    /// from inside a running task. Errors are reported to the queue by the
    /// runner as a failed completion; the queue itself never sees them.
    async fn execute(&self, ctx: &ExecutionContext) -> Result<(), TaskError>;
}
