//! Testing utilities for users of the workgraph library.
//!
//! This module provides helpers for exercising schedulers without writing
//! a full `Task` implementation:
//!
//! - [`ClosureTask`]: a task whose body is an async closure
//! - convenience constructors for no-op and always-failing tasks

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::core::task::{Task, TaskError, TaskRecord};
use crate::core::types::TaskId;
use crate::scheduler::ExecutionContext;

type TaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send>>;
type TaskBody = Box<dyn Fn(ExecutionContext) -> TaskFuture + Send + Sync>;

/// A task built from an async closure.
///
/// The closure receives a clone of the [`ExecutionContext`], so test
/// bodies can spawn sub-tasks and follow-on tasks just like production
/// ones.
///
/// # Example
///
/// ```ignore
/// use workgraph::testing::ClosureTask;
///
/// let task = ClosureTask::new("fan-out", |ctx| async move {
///     ctx.enqueue_sub_task(ClosureTask::noop("child"))?;
///     Ok(())
/// });
/// ```
pub struct ClosureTask {
    record: TaskRecord,
    body: TaskBody,
}

impl ClosureTask {
    /// Create a task that runs the given async closure.
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Arc<Self>
    where
        F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Arc::new(Self {
            record: TaskRecord::new(name),
            body: Box::new(move |ctx| Box::pin(body(ctx))),
        })
    }

    /// Create a closure task that must wait for the given dependencies.
    pub fn with_dependencies<F, Fut>(
        name: impl Into<String>,
        deps: Vec<TaskId>,
        body: F,
    ) -> Arc<Self>
    where
        F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Arc::new(Self {
            record: TaskRecord::with_dependencies(name, deps),
            body: Box::new(move |ctx| Box::pin(body(ctx))),
        })
    }

    /// A task that succeeds without doing anything.
    pub fn noop(name: impl Into<String>) -> Arc<Self> {
        Self::new(name, |_ctx| async { Ok(()) })
    }

    /// A no-op task gated on the given dependencies.
    pub fn noop_with_dependencies(name: impl Into<String>, deps: Vec<TaskId>) -> Arc<Self> {
        Self::with_dependencies(name, deps, |_ctx| async { Ok(()) })
    }

    /// A task that always fails.
    pub fn failing(name: impl Into<String>) -> Arc<Self> {
        let label = "deliberate test failure".to_string();
        Self::new(name, move |_ctx| {
            let label = label.clone();
            async move { Err(TaskError::ExecutionFailed(label)) }
        })
    }
}

#[async_trait]
impl Task for ClosureTask {
    fn record(&self) -> &TaskRecord {
        &self.record
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<(), TaskError> {
        (self.body)(ctx.clone()).await
    }
}
