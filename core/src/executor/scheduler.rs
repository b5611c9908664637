use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::Semaphore;

use crate::error::ExecutorError;

use super::graph::TaskGraph;
use super::types::{Task, WorkerResult};

/// Execute a single batch of tasks concurrently
///
/// Every task future is created before any is polled; the call returns once
/// all of them have settled. A panicking task is turned into a failed result
/// and does not disturb its siblings.
///
/// # Arguments
///
/// * `task_ids` - List of task IDs to execute in this batch
/// * `graph` - Task dependency graph
/// * `max_concurrency` - Optional cap on tasks in flight
/// * `executor_fn` - Async function to execute a single task
///
/// # Returns
///
/// Results in the order of `task_ids`
pub async fn execute_batch_parallel<F, Fut>(
    task_ids: &[String],
    graph: &TaskGraph<Task>,
    max_concurrency: Option<usize>,
    executor_fn: F,
) -> Result<Vec<WorkerResult>, ExecutorError>
where
    F: Fn(Task) -> Fut,
    Fut: std::future::Future<Output = WorkerResult>,
{
    let sem = max_concurrency.map(|n| Arc::new(Semaphore::new(n.max(1))));
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for (position, id) in task_ids.iter().enumerate() {
        let task = graph
            .get(id)
            .cloned()
            .ok_or_else(|| ExecutorError::TaskNotFound(id.clone()))?;

        let task_id = task.id.clone();
        let sem = sem.clone();
        let run = executor_fn(task);

        futs.push(async move {
            let _permit = match sem {
                Some(sem) => Some(sem.acquire_owned().await.map_err(|_| {
                    ExecutorError::Runner("semaphore closed unexpectedly".into())
                })?),
                None => None,
            };

            let result = match AssertUnwindSafe(run).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    tracing::error!(task_id = %task_id, "worker panicked: {}", reason);
                    WorkerResult::failed(
                        task_id,
                        "worker panicked",
                        vec![format!("worker panicked: {reason}")],
                    )
                }
            };

            Ok::<_, ExecutorError>((position, result))
        });
    }

    let mut results: Vec<(usize, WorkerResult)> = Vec::with_capacity(task_ids.len());

    while let Some(res) = futs.next().await {
        results.push(res?);
    }

    results.sort_by_key(|(position, _)| *position);
    Ok(results.into_iter().map(|(_, r)| r).collect())
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
