//! workgraph - a dependency-aware task scheduler with a runtime-extensible
//! graph.
//!
//! Tasks declare prerequisite tasks, and a running task may spawn sub-tasks
//! and follow-on tasks through its [`ExecutionContext`], extending the graph
//! mid-flight. The [`TaskQueue`] partitions admitted tasks into a FIFO ready
//! sequence and a waiting set, promotes waiters as dependencies complete,
//! and serializes every scheduling decision behind one lock. A [`Runner`]
//! claims ready tasks, executes them concurrently and reports outcomes.
//!
//! ```ignore
//! use std::sync::Arc;
//! use workgraph::{Runner, TaskQueue, testing::ClosureTask};
//!
//! # #[tokio::main] async fn main() {
//! let queue = Arc::new(TaskQueue::new());
//! let fetch = ClosureTask::noop("fetch");
//! let report = ClosureTask::noop_with_dependencies(
//!     "report",
//!     vec![fetch.record().id().clone()],
//! );
//! queue.enqueue(fetch).unwrap();
//! queue.enqueue(report).unwrap();
//!
//! let outcome = Runner::new(queue).run_until_idle().await;
//! assert_eq!(outcome.completed, 2);
//! # }
//! ```

pub mod core;
pub mod events;
pub mod runner;
pub mod scheduler;
pub mod testing;

pub use crate::core::status::TaskStatus;
pub use crate::core::task::{RecordError, Task, TaskError, TaskRecord};
pub use crate::core::types::TaskId;
pub use events::{Event, EventBus};
pub use runner::{RunReport, Runner};
pub use scheduler::{ExecutionContext, QueueError, QueueStats, TaskInfo, TaskQueue};
