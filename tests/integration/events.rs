//! Lifecycle event stream contents.

use std::sync::Arc;
use workgraph::{Event, Runner, Task, TaskQueue};

use crate::common::{drain_events, task, task_with_deps};

#[tokio::test]
async fn queue_operations_emit_lifecycle_events() {
    let queue = TaskQueue::new();
    let mut rx = queue.subscribe();

    let a = task("a");
    let b = task_with_deps("b", &[a.record().id()]);
    queue.enqueue(a.clone()).unwrap();
    queue.enqueue(b.clone()).unwrap();
    queue.dequeue().unwrap();
    queue.mark_running(a.record().id()).unwrap();
    queue.mark_completed(a.record().id(), true).unwrap();

    let events = drain_events(&mut rx);
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            Event::TaskEnqueued { .. } => "enqueued",
            Event::TaskReady { .. } => "ready",
            Event::TaskDispatched { .. } => "dispatched",
            Event::TaskStarted { .. } => "started",
            Event::TaskCompleted { .. } => "completed",
            Event::TaskFailed { .. } => "failed",
            Event::TaskCanceled { .. } => "canceled",
        })
        .collect();

    assert_eq!(
        kinds,
        vec![
            "enqueued",   // a, ready
            "enqueued",   // b, waiting
            "dispatched", // a
            "started",    // a
            "completed",  // a
            "ready",      // b promoted
        ]
    );

    // The promotion event names b.
    match events.last().unwrap() {
        Event::TaskReady { task_id, .. } => assert_eq!(task_id, b.record().id()),
        other => panic!("expected TaskReady, got {:?}", other),
    }
}

#[tokio::test]
async fn enqueued_event_reports_waiting_flag() {
    let queue = TaskQueue::new();
    let mut rx = queue.subscribe();

    let a = task("a");
    let b = task_with_deps("b", &[a.record().id()]);
    queue.enqueue(a).unwrap();
    queue.enqueue(b).unwrap();

    let events = drain_events(&mut rx);
    match (&events[0], &events[1]) {
        (
            Event::TaskEnqueued { waiting: first, .. },
            Event::TaskEnqueued { waiting: second, .. },
        ) => {
            assert!(!first);
            assert!(second);
        }
        other => panic!("expected two TaskEnqueued events, got {:?}", other),
    }
}

#[tokio::test]
async fn failure_emits_failed_event_and_no_promotion() {
    let queue = Arc::new(TaskQueue::new());
    let mut rx = queue.subscribe();

    let a = workgraph::testing::ClosureTask::failing("a");
    let b = task_with_deps("b", &[a.record().id()]);
    queue.enqueue(a.clone()).unwrap();
    queue.enqueue(b).unwrap();

    Runner::new(queue.clone()).run_until_idle().await;

    let events = drain_events(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::TaskFailed { task_id, .. } if task_id == a.record().id())));
    assert!(!events.iter().any(|e| matches!(e, Event::TaskReady { .. })));
}
