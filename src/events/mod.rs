//! Lifecycle events and event emission.
//!
//! The queue emits an [`Event`] for every task lifecycle transition,
//! enabling observability into scheduling decisions without polling.
//!
//! Emission goes over a `tokio::sync::broadcast` channel rather than an
//! async handler registry: queue mutations happen inside a synchronous
//! critical section, and a broadcast send never awaits and never blocks.
//! Events are dropped when nobody is subscribed.

use std::time::Instant;
use tokio::sync::broadcast;

use crate::core::types::TaskId;

/// Default capacity of the broadcast channel backing an [`EventBus`].
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Lifecycle events emitted by the queue.
#[derive(Debug, Clone)]
pub enum Event {
    /// A task was admitted to the queue.
    TaskEnqueued {
        task_id: TaskId,
        name: String,
        /// True when the task was parked on unmet dependencies.
        waiting: bool,
        timestamp: Instant,
    },

    /// A waiting task's dependencies are now all completed.
    TaskReady { task_id: TaskId, timestamp: Instant },

    /// A task was claimed by a dequeue call.
    TaskDispatched { task_id: TaskId, timestamp: Instant },

    /// The runner reported that execution started.
    TaskStarted { task_id: TaskId, timestamp: Instant },

    /// The runner reported a successful completion.
    TaskCompleted { task_id: TaskId, timestamp: Instant },

    /// The runner reported a failed completion.
    TaskFailed { task_id: TaskId, timestamp: Instant },

    /// A task was canceled before reaching a runner.
    TaskCanceled { task_id: TaskId, timestamp: Instant },
}

impl Event {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::TaskEnqueued { timestamp, .. } => *timestamp,
            Event::TaskReady { timestamp, .. } => *timestamp,
            Event::TaskDispatched { timestamp, .. } => *timestamp,
            Event::TaskStarted { timestamp, .. } => *timestamp,
            Event::TaskCompleted { timestamp, .. } => *timestamp,
            Event::TaskFailed { timestamp, .. } => *timestamp,
            Event::TaskCanceled { timestamp, .. } => *timestamp,
        }
    }

    /// The task this event concerns.
    pub fn task_id(&self) -> &TaskId {
        match self {
            Event::TaskEnqueued { task_id, .. } => task_id,
            Event::TaskReady { task_id, .. } => task_id,
            Event::TaskDispatched { task_id, .. } => task_id,
            Event::TaskStarted { task_id, .. } => task_id,
            Event::TaskCompleted { task_id, .. } => task_id,
            Event::TaskFailed { task_id, .. } => task_id,
            Event::TaskCanceled { task_id, .. } => task_id,
        }
    }

    /// Create a TaskEnqueued event.
    pub fn task_enqueued(task_id: TaskId, name: impl Into<String>, waiting: bool) -> Self {
        Event::TaskEnqueued {
            task_id,
            name: name.into(),
            waiting,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskReady event.
    pub fn task_ready(task_id: TaskId) -> Self {
        Event::TaskReady {
            task_id,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskDispatched event.
    pub fn task_dispatched(task_id: TaskId) -> Self {
        Event::TaskDispatched {
            task_id,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskStarted event.
    pub fn task_started(task_id: TaskId) -> Self {
        Event::TaskStarted {
            task_id,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskCompleted event.
    pub fn task_completed(task_id: TaskId) -> Self {
        Event::TaskCompleted {
            task_id,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskFailed event.
    pub fn task_failed(task_id: TaskId) -> Self {
        Event::TaskFailed {
            task_id,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskCanceled event.
    pub fn task_canceled(task_id: TaskId) -> Self {
        Event::TaskCanceled {
            task_id,
            timestamp: Instant::now(),
        }
    }
}

/// Broadcast bus for lifecycle events.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a bus with an explicit channel capacity. Slow subscribers
    /// that fall more than `capacity` events behind observe a lag error
    /// on their receiver rather than blocking the queue.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Emit an event. Never blocks; a send with no subscribers is a no-op.
    pub fn emit(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
