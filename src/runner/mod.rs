//! Task runner: the external collaborator that drives a queue.
//!
//! The runner repeatedly claims ready tasks, executes their bodies with
//! semaphore-bounded concurrency, and reports exactly one completion per
//! task back to the queue -- success, failure and panic alike. Failing to
//! report would leave every transitive dependent permanently blocked, so
//! each body runs inside its own tokio task and a panic is caught as a
//! join error and reported as a failed completion.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use crate::core::task::Task;
use crate::core::types::TaskId;
use crate::scheduler::{ExecutionContext, TaskQueue};

/// Default number of task bodies executing concurrently.
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Outcome of driving a queue to quiescence.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Tasks that reported success.
    pub completed: usize,
    /// Tasks that reported failure (including panicked bodies).
    pub failed: usize,
    /// Tasks still parked on dependencies that can never complete:
    /// a failed or canceled prerequisite strands its dependents.
    pub stranded: Vec<TaskId>,
}

impl RunReport {
    /// Total tasks that reached a terminal status during the run.
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }

    /// True when no task was left stranded in the waiting set.
    pub fn fully_drained(&self) -> bool {
        self.stranded.is_empty()
    }
}

/// Executes ready tasks from a [`TaskQueue`] until nothing is left to do.
pub struct Runner {
    queue: Arc<TaskQueue>,
    max_concurrency: usize,
}

impl Runner {
    /// Create a runner with the default concurrency limit.
    pub fn new(queue: Arc<TaskQueue>) -> Self {
        Self {
            queue,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Set the maximum number of concurrently executing task bodies.
    /// Values below 1 are clamped to 1.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// The configured concurrency limit.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Drive the queue until the ready sequence is empty and no task is in
    /// flight.
    ///
    /// Tasks spawned during execution (sub-tasks, follow-on tasks) extend
    /// the run: the loop keeps claiming work as completions promote
    /// waiters. Returns a [`RunReport`]; any ids still in the waiting set
    /// at idle are stranded behind a failed or canceled prerequisite.
    pub async fn run_until_idle(&self) -> RunReport {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut in_flight: JoinSet<(TaskId, bool)> = JoinSet::new();
        let mut report = RunReport::default();

        loop {
            match self.queue.dequeue() {
                Some(task) => {
                    let permit = semaphore
                        .clone()
                        .acquire_owned()
                        .await
                        .expect("semaphore closed");
                    in_flight.spawn(Self::execute_one(self.queue.clone(), task, permit));
                }
                None => match in_flight.join_next().await {
                    // A completion may have promoted waiters; loop and
                    // dequeue again.
                    Some(outcome) => Self::tally(&mut report, outcome),
                    None => break,
                },
            }

            while let Some(outcome) = in_flight.try_join_next() {
                Self::tally(&mut report, outcome);
            }
        }

        report.stranded = self.queue.waiting_ids();
        if !report.fully_drained() {
            warn!(
                stranded = report.stranded.len(),
                "runner idle with tasks stranded on unmet dependencies"
            );
        }
        debug!(
            completed = report.completed,
            failed = report.failed,
            "runner idle"
        );
        report
    }

    /// Execute one claimed task and report its outcome exactly once.
    async fn execute_one(
        queue: Arc<TaskQueue>,
        task: Arc<dyn Task>,
        permit: OwnedSemaphorePermit,
    ) -> (TaskId, bool) {
        let _permit = permit;
        let id = task.record().id().clone();

        if let Err(err) = queue.mark_running(&id) {
            warn!(task = %id, error = %err, "failed to report running status");
        }

        let ctx = ExecutionContext::new(queue.clone(), task.clone());
        let body = tokio::spawn(async move { task.execute(&ctx).await });

        let success = match body.await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(task = %id, error = %err, "task execution failed");
                false
            }
            Err(join_err) => {
                warn!(task = %id, error = %join_err, "task body panicked");
                false
            }
        };

        if let Err(err) = queue.mark_completed(&id, success) {
            warn!(task = %id, error = %err, "failed to report completion");
        }
        (id, success)
    }

    fn tally(report: &mut RunReport, outcome: Result<(TaskId, bool), JoinError>) {
        match outcome {
            Ok((_, true)) => report.completed += 1,
            Ok((_, false)) => report.failed += 1,
            Err(err) => {
                warn!(error = %err, "runner worker aborted");
                report.failed += 1;
            }
        }
    }
}
