use async_trait::async_trait;

use crate::error::WorkerError;
use crate::executor::types::{Task, WorkerResult};

/// Per-task transformation service.
///
/// Implementations report every failure through `Err`; the executor converts
/// errors, timeouts and panics into failed [`WorkerResult`]s so that a single
/// task never takes down its batch.
#[async_trait]
pub trait TaskWorker: Send + Sync {
    /// Worker name (unique identifier)
    fn name(&self) -> &str;

    async fn execute(&self, task: &Task, ctx: &WorkerContext) -> Result<WorkerResult, WorkerError>;
}

/// Per-invocation context handed to a worker.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub run_id: String,
    pub batch_index: usize,
    /// Zero for the first attempt.
    pub attempt: u32,
}
