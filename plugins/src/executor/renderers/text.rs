use otelflow_core::executor::traits::{OutputRendererPlugin, RenderEvent};

pub struct TextRendererPlugin {
    ascii_only: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn status(&self, success: bool) -> &'static str {
        match (success, self.ascii_only) {
            (true, true) => "OK",
            (true, false) => "✓ SUCCESS",
            (false, true) => "FAIL",
            (false, false) => "✗ FAILED",
        }
    }

    fn format_event(&self, event: &RenderEvent) -> String {
        match event {
            RenderEvent::RunStart {
                run_id,
                total_tasks,
                total_batches,
            } => format!(
                "RUN START {} (tasks: {}, batches: {})",
                run_id, total_tasks, total_batches
            ),
            RenderEvent::Plan { run_id, batches } => {
                let mut out = format!("PLAN {}:", run_id);
                for (idx, batch) in batches.iter().enumerate() {
                    out.push_str(&format!("\n  batch {}: {}", idx, batch.join(", ")));
                }
                out
            }
            RenderEvent::BatchStart {
                run_id,
                batch_index,
                task_ids,
            } => format!(
                "BATCH START {} (batch {}, tasks: {})",
                run_id,
                batch_index,
                task_ids.len()
            ),
            RenderEvent::TaskStart {
                run_id,
                task_id,
                batch_index,
            } => format!(
                "TASK START {} (batch {}, task {})",
                run_id, batch_index, task_id
            ),
            RenderEvent::TaskComplete {
                run_id,
                task_id,
                result,
            } => {
                let mut line = format!(
                    "TASK END {} (task {}, status {}, changes {}, duration {}ms, retries {})",
                    run_id,
                    task_id,
                    self.status(result.success),
                    result.changes.len(),
                    result.duration_ms,
                    result.retries_used
                );
                if !result.success {
                    line.push_str(&format!(": {}", result.errors.join("; ")));
                }
                line
            }
            RenderEvent::BatchEnd {
                run_id,
                batch_index,
                succeeded,
                failed,
            } => format!(
                "BATCH END {} (batch {}, succeeded {}, failed {})",
                run_id, batch_index, succeeded, failed
            ),
            RenderEvent::RunEnd { run_id, report } => format!(
                "RUN END {} (status {}, succeeded {}, failed {}, duration {}ms)",
                run_id,
                self.status(report.overall_success),
                report.succeeded(),
                report.failed,
                report.duration_ms
            ),
        }
    }
}

impl OutputRendererPlugin for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        println!("{}", self.format_event(event));
    }
}
