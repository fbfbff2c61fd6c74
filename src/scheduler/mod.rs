//! Dependency-aware scheduling.
//!
//! This module provides the task queue that partitions admitted tasks
//! into ready and waiting sets, and the execution context through which
//! a running task extends the graph.

mod context;
mod queue;

pub use context::ExecutionContext;
pub use queue::{QueueError, QueueStats, TaskInfo, TaskQueue};
