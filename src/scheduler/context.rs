//! Execution context handed to running tasks.
//!
//! The context is the sole sanctioned channel through which a task's own
//! execution logic extends the graph it is part of. It hides queue
//! internals from task bodies; both operations route into the queue and
//! take a fresh lock acquisition, so a task that calls them mid-execution
//! never re-enters a held critical section.

use std::sync::Arc;

use crate::core::task::Task;
use crate::core::types::TaskId;

use super::queue::{QueueError, TaskQueue};

/// API surface a running task uses to add sub-tasks and follow-on tasks.
#[derive(Clone)]
pub struct ExecutionContext {
    queue: Arc<TaskQueue>,
    current: Arc<dyn Task>,
}

impl ExecutionContext {
    /// Create a context for one task's execution.
    pub fn new(queue: Arc<TaskQueue>, current: Arc<dyn Task>) -> Self {
        Self { queue, current }
    }

    /// Id of the task this context belongs to.
    pub fn task_id(&self) -> &TaskId {
        self.current.record().id()
    }

    /// The queue behind this context, for read-only lookups from task
    /// bodies (task info, stats, event subscription).
    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Register `child` as a sub-task of the current task and admit it.
    ///
    /// Sets the child's parent back-reference, appends the child's id to
    /// the current task's sub-task list, and enqueues the child -- all
    /// atomically under the queue's lock. Sub-tasks carry no dependencies
    /// of their own by convention, so they become ready immediately and
    /// fan out in parallel.
    pub fn enqueue_sub_task(&self, child: Arc<dyn Task>) -> Result<(), QueueError> {
        self.queue.enqueue_sub_task(self.task_id(), child)
    }

    /// Admit `next` to run only after the current task and every sub-task
    /// registered so far have completed.
    ///
    /// The dependency capture is a snapshot at call time, not a live
    /// subscription: the current task's id plus the sub-task ids
    /// registered as of this call are appended to `next`'s dependencies;
    /// sub-tasks registered afterwards are not retroactively added.
    pub fn enqueue_next_task(&self, next: Arc<dyn Task>) -> Result<(), QueueError> {
        self.queue.enqueue_next_task(self.task_id(), next)
    }
}
