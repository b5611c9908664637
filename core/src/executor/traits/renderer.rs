use crate::executor::types::{ExecutionReport, WorkerResult};

/// Output renderer plugin (controls the event format)
pub trait OutputRendererPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn render(&self, event: &RenderEvent);
}

/// Executor lifecycle events
#[derive(Debug, Clone)]
pub enum RenderEvent {
    RunStart {
        run_id: String,
        total_tasks: usize,
        total_batches: usize,
    },
    Plan {
        run_id: String,
        batches: Vec<Vec<String>>,
    },
    BatchStart {
        run_id: String,
        batch_index: usize,
        task_ids: Vec<String>,
    },
    TaskStart {
        run_id: String,
        task_id: String,
        batch_index: usize,
    },
    TaskComplete {
        run_id: String,
        task_id: String,
        result: WorkerResult,
    },
    BatchEnd {
        run_id: String,
        batch_index: usize,
        succeeded: usize,
        failed: usize,
    },
    RunEnd {
        run_id: String,
        report: ExecutionReport,
    },
}
