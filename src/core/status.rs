//! Task lifecycle status and the legal transitions between states.
//!
//! Status values are mutated only by the [`TaskQueue`](crate::scheduler::TaskQueue);
//! task bodies and external observers read them through snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a task.
///
/// The scheduler drives these transitions:
///
/// - `New → Queued` when admitted with all dependencies already completed
/// - `New → WaitingOnDependencies` when admitted with unmet dependencies
/// - `WaitingOnDependencies → Queued` when the last dependency completes
/// - `Queued → SentToRunner` on dequeue (exactly once per task)
/// - `SentToRunner → Running` when the runner reports execution start
/// - `SentToRunner | Running → Completed | Failed` on the runner's
///   completion report
/// - `Queued | WaitingOnDependencies → Canceled` on a supervisor cancel
///
/// `Completed`, `Failed` and `Canceled` are terminal; only `Completed`
/// satisfies a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Constructed but not yet admitted to the queue.
    New,
    /// Admitted and ready for dispatch.
    Queued,
    /// Admitted but blocked on unmet dependencies.
    WaitingOnDependencies,
    /// Claimed by a dequeue call and handed to a runner.
    SentToRunner,
    /// The runner has reported that execution started.
    Running,
    /// Execution finished successfully.
    Completed,
    /// Execution finished unsuccessfully.
    Failed,
    /// Canceled before being handed to a runner.
    Canceled,
}

impl TaskStatus {
    /// Whether this status is terminal. The scheduler never moves a task
    /// out of a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Canceled
        )
    }

    /// Whether a dependency in this status counts as satisfied.
    ///
    /// Only `Completed` does: a `Failed` or `Canceled` prerequisite
    /// permanently strands its dependents.
    pub fn satisfies_dependency(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Whether the task is currently in a runner's hands.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TaskStatus::SentToRunner | TaskStatus::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::New => "new",
            TaskStatus::Queued => "queued",
            TaskStatus::WaitingOnDependencies => "waiting_on_dependencies",
            TaskStatus::SentToRunner => "sent_to_runner",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Canceled => "canceled",
        };
        write!(f, "{}", s)
    }
}
