//! Bounded-concurrency runner for independent tasks (one per lead, typically).
//!
//! Tasks are queued, then drained by at most `max_workers` workers. Every task
//! yields exactly one `TaskResult`; results come back in completion order.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub const DEFAULT_MAX_WORKERS: usize = 3;

type BoxedTask<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'static>>;
type Queue<T> = Arc<Mutex<VecDeque<(String, BoxedTask<T>)>>>;

#[derive(Debug, Clone, Serialize)]
pub struct TaskResult<T> {
    pub task_name: String,
    pub success: bool,
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> TaskResult<T> {
    fn succeeded(task_name: String, result: T) -> Self {
        Self {
            task_name,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    fn failed(task_name: String, error: String) -> Self {
        Self {
            task_name,
            success: false,
            result: None,
            error: Some(error),
        }
    }
}

pub struct TaskDispatcher<T> {
    max_workers: usize,
    queue: VecDeque<(String, BoxedTask<T>)>,
}

impl<T: Send + 'static> Default for TaskDispatcher<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

impl<T: Send + 'static> TaskDispatcher<T> {
    /// `max_workers` is clamped to at least one.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            queue: VecDeque::new(),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn enqueue<F>(&mut self, task_name: impl Into<String>, task: F)
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.queue.push_back((task_name.into(), Box::pin(task)));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drains the queue. A failing or panicking task never affects the others.
    pub async fn run_all(&mut self) -> Vec<TaskResult<T>> {
        let pending = std::mem::take(&mut self.queue);
        if pending.is_empty() {
            return Vec::new();
        }

        let total = pending.len();
        let workers = self.max_workers.min(total);
        debug!("Dispatching {} tasks across {} workers", total, workers);

        let queue: Queue<T> = Arc::new(Mutex::new(pending));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            pool.spawn(worker(worker_id, Arc::clone(&queue), tx.clone()));
        }
        drop(tx);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        while pool.join_next().await.is_some() {}

        results
    }
}

async fn worker<T: Send + 'static>(
    worker_id: usize,
    queue: Queue<T>,
    results: mpsc::UnboundedSender<TaskResult<T>>,
) {
    loop {
        let next = queue.lock().await.pop_front();
        let Some((task_name, task)) = next else {
            break;
        };

        debug!(worker_id, "Starting task '{}'", task_name);
        let result = match tokio::spawn(task).await {
            Ok(Ok(value)) => TaskResult::succeeded(task_name, value),
            Ok(Err(e)) => {
                warn!("Task '{}' failed: {:#}", task_name, e);
                TaskResult::failed(task_name, format!("{e:#}"))
            }
            Err(e) => {
                warn!("Task '{}' aborted: {}", task_name, e);
                TaskResult::failed(task_name, format!("task aborted: {e}"))
            }
        };

        if results.send(result).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use anyhow::bail;

    #[tokio::test]
    async fn test_empty_queue_returns_nothing() {
        let mut dispatcher: TaskDispatcher<u32> = TaskDispatcher::default();
        assert!(dispatcher.run_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let mut dispatcher = TaskDispatcher::new(3);
        for i in 0..5u32 {
            dispatcher.enqueue(format!("lead-{i}"), async move {
                if i == 2 {
                    bail!("lead {i} bounced");
                }
                Ok(i * 10)
            });
        }
        assert_eq!(dispatcher.len(), 5);

        let results = dispatcher.run_all().await;
        assert_eq!(results.len(), 5);
        assert!(dispatcher.is_empty());

        let failed: Vec<_> = results.iter().filter(|r| !r.success).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].task_name, "lead-2");
        assert_eq!(failed[0].error.as_deref(), Some("lead 2 bounced"));
        assert!(failed[0].result.is_none());

        let mut values: Vec<u32> = results.iter().filter_map(|r| r.result).collect();
        values.sort_unstable();
        assert_eq!(values, [0, 10, 30, 40]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut dispatcher = TaskDispatcher::new(2);
        for i in 0..6 {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            dispatcher.enqueue(format!("task-{i}"), async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(i)
            });
        }

        let results = dispatcher.run_all().await;
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_arrive_in_completion_order() {
        let mut dispatcher = TaskDispatcher::new(2);
        dispatcher.enqueue("slow", async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok("slow")
        });
        dispatcher.enqueue("fast", async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok("fast")
        });

        let results = dispatcher.run_all().await;
        let names: Vec<&str> = results.iter().map(|r| r.task_name.as_str()).collect();
        assert_eq!(names, ["fast", "slow"]);
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported() {
        let mut dispatcher = TaskDispatcher::new(1);
        dispatcher.enqueue("explodes", async {
            if true {
                panic!("kaboom");
            }
            Ok(0u8)
        });
        dispatcher.enqueue("fine", async { Ok(1u8) });

        let results = dispatcher.run_all().await;
        assert_eq!(results.len(), 2);
        let explodes = results.iter().find(|r| r.task_name == "explodes").unwrap();
        assert!(!explodes.success);
        assert!(explodes.error.as_deref().unwrap().starts_with("task aborted"));
        assert!(results.iter().any(|r| r.task_name == "fine" && r.success));
    }

    #[test]
    fn test_zero_workers_clamped() {
        let dispatcher: TaskDispatcher<()> = TaskDispatcher::new(0);
        assert_eq!(dispatcher.max_workers(), 1);
    }
}
