//! Queue-level behavior: FIFO ordering, dependency gating, promotion
//! stability, lookups and the failure-poisoning policy.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use workgraph::{QueueError, Task, TaskQueue, TaskStatus};

use crate::common::{task, task_with_deps};

#[test]
fn ready_tasks_dequeue_in_enqueue_order() {
    let queue = TaskQueue::new();
    let a = task("a");
    let b = task("b");
    let c = task("c");
    queue.enqueue(a.clone()).unwrap();
    queue.enqueue(b.clone()).unwrap();
    queue.enqueue(c.clone()).unwrap();

    assert_eq!(queue.dequeue().unwrap().record().id(), a.record().id());
    assert_eq!(queue.dequeue().unwrap().record().id(), b.record().id());
    assert_eq!(queue.dequeue().unwrap().record().id(), c.record().id());
    assert!(queue.dequeue().is_none());
}

#[test]
fn task_stays_blocked_until_every_dependency_completes() {
    let queue = TaskQueue::new();
    let a = task("a");
    let b = task("b");
    let gated = task_with_deps("gated", &[a.record().id(), b.record().id()]);
    queue.enqueue(a.clone()).unwrap();
    queue.enqueue(b.clone()).unwrap();
    queue.enqueue(gated.clone()).unwrap();

    // Claim and complete A only; gated must not surface.
    let first = queue.dequeue().unwrap();
    let second = queue.dequeue().unwrap();
    assert!(queue.dequeue().is_none());

    queue.mark_completed(first.record().id(), true).unwrap();
    assert!(queue.dequeue().is_none());

    queue.mark_completed(second.record().id(), true).unwrap();
    let promoted = queue.dequeue().unwrap();
    assert_eq!(promoted.record().id(), gated.record().id());
}

#[test]
fn failed_dependency_never_unblocks_dependent() {
    let queue = TaskQueue::new();
    let a = task("a");
    let b = task("b");
    let gated = task_with_deps("gated", &[a.record().id(), b.record().id()]);
    queue.enqueue(a.clone()).unwrap();
    queue.enqueue(b.clone()).unwrap();
    queue.enqueue(gated.clone()).unwrap();

    queue.dequeue().unwrap();
    queue.dequeue().unwrap();
    queue.mark_completed(a.record().id(), false).unwrap();
    queue.mark_completed(b.record().id(), true).unwrap();

    assert!(queue.dequeue().is_none());
    assert_eq!(gated.record().status(), TaskStatus::WaitingOnDependencies);
}

#[test]
fn dependent_enqueued_after_failure_is_poisoned() {
    let queue = TaskQueue::new();
    let a = task("a");
    queue.enqueue(a.clone()).unwrap();
    queue.dequeue().unwrap();
    queue.mark_completed(a.record().id(), false).unwrap();

    let b = task_with_deps("b", &[a.record().id()]);
    queue.enqueue(b.clone()).unwrap();

    assert!(queue.dequeue().is_none());
    assert_eq!(b.record().status(), TaskStatus::WaitingOnDependencies);
    assert_eq!(queue.waiting_ids(), vec![b.record().id().clone()]);
}

#[test]
fn chain_scenario_runs_in_order() {
    let queue = TaskQueue::new();
    let a = task("a");
    let b = task_with_deps("b", &[a.record().id()]);
    queue.enqueue(a.clone()).unwrap();
    queue.enqueue(b.clone()).unwrap();

    let claimed = queue.dequeue().unwrap();
    assert_eq!(claimed.record().id(), a.record().id());
    queue.mark_completed(a.record().id(), true).unwrap();

    let claimed = queue.dequeue().unwrap();
    assert_eq!(claimed.record().id(), b.record().id());
    queue.mark_completed(b.record().id(), true).unwrap();

    assert!(queue.dequeue().is_none());
    assert_eq!(queue.stats().completed, 2);
}

#[test]
fn promotion_preserves_waiting_order() {
    let queue = TaskQueue::new();
    let root = task("root");
    queue.enqueue(root.clone()).unwrap();

    let w1 = task_with_deps("w1", &[root.record().id()]);
    let w2 = task_with_deps("w2", &[root.record().id()]);
    let w3 = task_with_deps("w3", &[root.record().id()]);
    queue.enqueue(w1.clone()).unwrap();
    queue.enqueue(w2.clone()).unwrap();
    queue.enqueue(w3.clone()).unwrap();

    queue.dequeue().unwrap();
    queue.mark_completed(root.record().id(), true).unwrap();

    // All three promoted by one completion, in their waiting-set order.
    assert_eq!(queue.dequeue().unwrap().record().id(), w1.record().id());
    assert_eq!(queue.dequeue().unwrap().record().id(), w2.record().id());
    assert_eq!(queue.dequeue().unwrap().record().id(), w3.record().id());
}

#[test]
fn lookup_covers_all_statuses() {
    let queue = TaskQueue::new();
    let done = task("done");
    let failed = task("failed");
    let waiting = task_with_deps("waiting", &[done.record().id(), failed.record().id()]);
    let queued = task("queued");
    queue.enqueue(done.clone()).unwrap();
    queue.enqueue(failed.clone()).unwrap();
    queue.enqueue(waiting.clone()).unwrap();
    queue.enqueue(queued.clone()).unwrap();

    queue.dequeue().unwrap();
    queue.dequeue().unwrap();
    queue.mark_completed(done.record().id(), true).unwrap();
    queue.mark_completed(failed.record().id(), false).unwrap();

    assert_eq!(queue.get_task_info(done.record().id()).unwrap().status, TaskStatus::Completed);
    assert_eq!(queue.get_task_info(failed.record().id()).unwrap().status, TaskStatus::Failed);
    assert_eq!(
        queue.get_task_info(waiting.record().id()).unwrap().status,
        TaskStatus::WaitingOnDependencies
    );
    assert_eq!(queue.get_task_info(queued.record().id()).unwrap().status, TaskStatus::Queued);
    assert_eq!(queue.get_task_info_by_name("waiting").unwrap().id, waiting.record().id().clone());

    let stats = queue.stats();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.waiting, 1);
    assert_eq!(stats.ready, 1);
}

#[test]
fn canceled_dependency_strands_dependent() {
    let queue = TaskQueue::new();
    let a = task("a");
    let b = task_with_deps("b", &[a.record().id()]);
    queue.enqueue(a.clone()).unwrap();
    queue.enqueue(b.clone()).unwrap();

    queue.cancel(a.record().id()).unwrap();

    assert_eq!(a.record().status(), TaskStatus::Canceled);
    assert!(queue.dequeue().is_none());
    assert_eq!(queue.waiting_ids(), vec![b.record().id().clone()]);
}

#[test]
fn supervisor_force_completion_unblocks_dependents() {
    // mark_completed on a task that was never dispatched is allowed and
    // promotes waiters like any other completion.
    let queue = TaskQueue::new();
    let a = task("a");
    let b = task_with_deps("b", &[a.record().id()]);
    queue.enqueue(a.clone()).unwrap();
    queue.enqueue(b.clone()).unwrap();

    queue.mark_completed(a.record().id(), true).unwrap();

    assert_eq!(queue.dequeue().unwrap().record().id(), b.record().id());
    // A was removed from the ready sequence when force-completed.
    assert!(queue.dequeue().is_none());
}

#[test]
fn mark_completed_unknown_id_errors() {
    let queue = TaskQueue::new();
    let err = queue.mark_completed(&workgraph::TaskId::new(), true).unwrap_err();
    assert!(matches!(err, QueueError::TaskNotFound(_)));
}

#[test]
fn concurrent_workers_claim_each_task_exactly_once() {
    const TASKS: usize = 200;
    const WORKERS: usize = 8;

    let queue = Arc::new(TaskQueue::new());
    for i in 0..TASKS {
        queue.enqueue(task(&format!("t{}", i))).unwrap();
    }

    let claimed = Arc::new(Mutex::new(HashSet::new()));
    let mut handles = Vec::new();
    for _ in 0..WORKERS {
        let queue = queue.clone();
        let claimed = claimed.clone();
        handles.push(std::thread::spawn(move || {
            while let Some(task) = queue.dequeue() {
                let id = task.record().id().clone();
                let fresh = claimed.lock().unwrap().insert(id.clone());
                assert!(fresh, "task {} claimed twice", id);
                queue.mark_completed(&id, true).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(claimed.lock().unwrap().len(), TASKS);
    assert_eq!(queue.stats().completed, TASKS);
}
