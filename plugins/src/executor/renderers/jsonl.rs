use chrono::Local;
use otelflow_core::executor::traits::{OutputRendererPlugin, RenderEvent};
use serde_json::{json, Value};

pub struct JsonlRendererPlugin {
    pretty_print: bool,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        match event {
            RenderEvent::RunStart {
                run_id,
                total_tasks,
                total_batches,
            } => json!({
                "v": 1,
                "event_type": "run.start",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "total_tasks": total_tasks,
                    "total_batches": total_batches,
                }
            }),
            RenderEvent::Plan { run_id, batches } => {
                let total_tasks: usize = batches.iter().map(|b| b.len()).sum();
                json!({
                    "v": 1,
                    "event_type": "executor.plan",
                    "ts": ts,
                    "run_id": run_id,
                    "metadata": {
                        "batches": batches,
                        "total_tasks": total_tasks,
                    }
                })
            }
            RenderEvent::BatchStart {
                run_id,
                batch_index,
                task_ids,
            } => json!({
                "v": 1,
                "event_type": "batch.start",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "batch_index": batch_index,
                    "tasks": task_ids,
                }
            }),
            RenderEvent::TaskStart {
                run_id,
                task_id,
                batch_index,
            } => json!({
                "v": 1,
                "event_type": "task.start",
                "ts": ts,
                "run_id": run_id,
                "task_id": task_id,
                "metadata": {
                    "batch_index": batch_index,
                }
            }),
            RenderEvent::TaskComplete {
                run_id,
                task_id,
                result,
            } => {
                let files: Vec<&str> = result
                    .changes
                    .iter()
                    .map(|c| c.target_file.as_str())
                    .collect();
                json!({
                    "v": 1,
                    "event_type": "task.end",
                    "ts": ts,
                    "run_id": run_id,
                    "task_id": task_id,
                    "success": result.success,
                    "metadata": {
                        "message": result.message,
                        "errors": result.errors,
                        "files": files,
                        "duration_ms": result.duration_ms,
                        "retries_used": result.retries_used,
                    }
                })
            }
            RenderEvent::BatchEnd {
                run_id,
                batch_index,
                succeeded,
                failed,
            } => json!({
                "v": 1,
                "event_type": "batch.end",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "batch_index": batch_index,
                    "succeeded": succeeded,
                    "failed": failed,
                }
            }),
            RenderEvent::RunEnd { run_id, report } => json!({
                "v": 1,
                "event_type": "run.end",
                "ts": ts,
                "run_id": run_id,
                "success": report.overall_success,
                "metadata": {
                    "total_tasks": report.total_tasks,
                    "failed": report.failed,
                    "duration_ms": report.duration_ms,
                    "errors": report.errors,
                }
            }),
        }
    }
}

impl OutputRendererPlugin for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otelflow_core::executor::types::{ExecutionReport, FileChange, WorkerResult};

    #[test]
    fn test_jsonl_renderer_event_type() {
        let renderer = JsonlRendererPlugin::new(false);
        let event = RenderEvent::RunStart {
            run_id: "run".to_string(),
            total_tasks: 2,
            total_batches: 1,
        };

        let value = renderer.event_to_json(&event);
        assert_eq!(value["event_type"], "run.start");
        assert_eq!(value["metadata"]["total_batches"], 1);
    }

    #[test]
    fn test_jsonl_renderer_task_complete() {
        let renderer = JsonlRendererPlugin::new(false);
        let event = RenderEvent::TaskComplete {
            run_id: "run".to_string(),
            task_id: "http-3".to_string(),
            result: WorkerResult::succeeded(
                "http-3",
                vec![FileChange::modify("routes/users.js", "x")],
                "instrumented",
            )
            .with_retries(1),
        };

        let value = renderer.event_to_json(&event);
        assert_eq!(value["event_type"], "task.end");
        assert_eq!(value["success"], true);
        assert_eq!(value["metadata"]["retries_used"], 1);
        assert_eq!(value["metadata"]["files"][0], "routes/users.js");
    }

    #[test]
    fn test_jsonl_renderer_run_end() {
        let renderer = JsonlRendererPlugin::new(false);
        let report = ExecutionReport::from_results(
            vec![
                WorkerResult::succeeded("a", vec![], "ok"),
                WorkerResult::failed("b", "bad", vec!["boom".into()]),
            ],
            vec![vec!["a".into(), "b".into()]],
            100,
        );
        let event = RenderEvent::RunEnd {
            run_id: "run".to_string(),
            report,
        };

        let value = renderer.event_to_json(&event);
        assert_eq!(value["success"], false);
        assert_eq!(value["metadata"]["total_tasks"], 2);
        assert_eq!(value["metadata"]["errors"][0], "b: boom");
    }
}
