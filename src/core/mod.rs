//! Core task model: identifiers, lifecycle status and the task contract.

pub mod status;
pub mod task;
pub mod types;

pub use status::TaskStatus;
pub use task::{RecordError, Task, TaskError, TaskRecord};
pub use types::TaskId;
