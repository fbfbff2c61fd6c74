//! Common test utilities shared across integration tests.

use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::TryRecvError;
use workgraph::testing::ClosureTask;
use workgraph::{Event, TaskId};

/// A ready no-op task.
pub fn task(name: &str) -> Arc<ClosureTask> {
    ClosureTask::noop(name)
}

/// A no-op task gated on the given dependencies.
pub fn task_with_deps(name: &str, deps: &[&TaskId]) -> Arc<ClosureTask> {
    ClosureTask::noop_with_dependencies(name, deps.iter().map(|d| (*d).clone()).collect())
}

/// Drain every event currently sitting in the receiver.
pub fn drain_events(rx: &mut Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
    events
}
