//! wg - sample driver for the workgraph scheduler.
//!
//! Usage:
//!   wg fanout --children 4      Root task fans out sub-tasks, then a join task
//!   wg chain --length 5         Linear dependency chain
//!
//! The demo tasks carry a JSON payload to show that payloads never cross
//! the scheduler boundary: the queue sees only ids, statuses and edges.

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use workgraph::{
    Event, ExecutionContext, RunReport, Runner, Task, TaskError, TaskQueue, TaskRecord,
};

/// wg - dependency-aware task scheduler demo
#[derive(Parser)]
#[command(name = "wg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a fan-out/join graph: one root spawns children at runtime,
    /// then registers a join task behind all of them
    Fanout {
        /// Number of sub-tasks the root spawns
        #[arg(short, long, default_value = "4")]
        children: usize,

        /// Maximum concurrent task executions
        #[arg(short = 'j', long, default_value = "4")]
        concurrency: usize,

        /// Make the given child (0-based) fail, stranding the join task
        #[arg(long)]
        fail_child: Option<usize>,
    },

    /// Run a linear chain of dependent tasks
    Chain {
        /// Number of tasks in the chain
        #[arg(short, long, default_value = "5")]
        length: usize,

        /// Maximum concurrent task executions
        #[arg(short = 'j', long, default_value = "4")]
        concurrency: usize,
    },
}

/// Demo task: sleeps briefly, then echoes its payload into its output slot.
struct WorkTask {
    record: TaskRecord,
    payload: serde_json::Value,
    delay: Duration,
    fail: bool,
    output: Mutex<Option<serde_json::Value>>,
}

impl WorkTask {
    fn new(name: impl Into<String>, payload: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            record: TaskRecord::new(name),
            payload,
            delay: Duration::from_millis(20),
            fail: false,
            output: Mutex::new(None),
        })
    }

    fn failing(name: impl Into<String>, payload: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            record: TaskRecord::new(name),
            payload,
            delay: Duration::from_millis(20),
            fail: true,
            output: Mutex::new(None),
        })
    }
}

#[async_trait]
impl Task for WorkTask {
    fn record(&self) -> &TaskRecord {
        &self.record
    }

    async fn execute(&self, _ctx: &ExecutionContext) -> Result<(), TaskError> {
        sleep(self.delay).await;
        if self.fail {
            return Err(TaskError::ExecutionFailed(format!(
                "demo failure in '{}'",
                self.record.name()
            )));
        }
        *self.output.lock().expect("output lock poisoned") =
            Some(serde_json::json!({ "echo": self.payload }));
        Ok(())
    }
}

/// Root task for the fan-out demo: spawns children and a join task while
/// running, extending the graph it is itself part of.
struct FanoutRoot {
    record: TaskRecord,
    children: usize,
    fail_child: Option<usize>,
}

impl FanoutRoot {
    fn new(children: usize, fail_child: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            record: TaskRecord::new("root"),
            children,
            fail_child,
        })
    }
}

#[async_trait]
impl Task for FanoutRoot {
    fn record(&self) -> &TaskRecord {
        &self.record
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<(), TaskError> {
        for i in 0..self.children {
            let name = format!("child-{}", i);
            let payload = serde_json::json!({ "index": i });
            let child: Arc<dyn Task> = if self.fail_child == Some(i) {
                WorkTask::failing(name, payload)
            } else {
                WorkTask::new(name, payload)
            };
            ctx.enqueue_sub_task(child)?;
        }
        // Joins on the root plus every child registered above.
        ctx.enqueue_next_task(WorkTask::new("join", serde_json::json!({ "role": "join" })))?;
        Ok(())
    }
}

/// Print lifecycle events as they happen.
fn spawn_event_printer(queue: &TaskQueue) {
    let mut rx = queue.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(Event::TaskEnqueued { task_id, name, waiting, .. }) => {
                    if waiting {
                        info!("task '{}' admitted, waiting on dependencies ({})", name, task_id);
                    } else {
                        info!("task '{}' admitted, ready ({})", name, task_id);
                    }
                }
                Ok(Event::TaskReady { task_id, .. }) => {
                    info!("task {} promoted to ready", task_id);
                }
                Ok(Event::TaskStarted { task_id, .. }) => {
                    info!("task {} running", task_id);
                }
                Ok(Event::TaskCompleted { task_id, .. }) => {
                    info!("task {} completed", task_id);
                }
                Ok(Event::TaskFailed { task_id, .. }) => {
                    warn!("task {} failed", task_id);
                }
                Ok(Event::TaskCanceled { task_id, .. }) => {
                    warn!("task {} canceled", task_id);
                }
                Ok(Event::TaskDispatched { .. }) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("event printer lagged, skipped {} events", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn print_report(queue: &TaskQueue, report: &RunReport) {
    info!(
        "run finished: {} completed, {} failed, {} stranded",
        report.completed,
        report.failed,
        report.stranded.len()
    );
    for id in &report.stranded {
        if let Some(task) = queue.get_task_info(id) {
            warn!(
                "stranded: '{}' ({}) waiting on {} dependencies",
                task.name,
                task.id,
                task.dependency_task_ids.len()
            );
        }
    }
}

async fn run_fanout(
    children: usize,
    concurrency: usize,
    fail_child: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let queue = Arc::new(TaskQueue::new());
    spawn_event_printer(&queue);

    queue.enqueue(FanoutRoot::new(children, fail_child))?;

    let runner = Runner::new(queue.clone()).with_max_concurrency(concurrency);
    let report = runner.run_until_idle().await;
    print_report(&queue, &report);
    Ok(())
}

async fn run_chain(length: usize, concurrency: usize) -> Result<(), Box<dyn std::error::Error>> {
    let queue = Arc::new(TaskQueue::new());
    spawn_event_printer(&queue);

    let mut prev = None;
    for i in 0..length {
        let task = WorkTask::new(format!("link-{}", i), serde_json::json!({ "index": i }));
        if let Some(prev_id) = prev {
            task.record().add_dependency(prev_id)?;
        }
        prev = Some(task.record().id().clone());
        queue.enqueue(task)?;
    }

    let runner = Runner::new(queue.clone()).with_max_concurrency(concurrency);
    let report = runner.run_until_idle().await;
    print_report(&queue, &report);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fanout {
            children,
            concurrency,
            fail_child,
        } => {
            run_fanout(children, concurrency, fail_child).await?;
        }
        Commands::Chain {
            length,
            concurrency,
        } => {
            run_chain(length, concurrency).await?;
        }
    }

    Ok(())
}
