use std::sync::{Arc, Mutex};
use std::time::Instant;

use uuid::Uuid;

use crate::error::{ExecutorError, WorkerError};

use super::graph::TaskGraph;
use super::phase::ExecutorPhase;
use super::progress::ProgressMonitor;
use super::scheduler::execute_batch_parallel;
use super::traits::{OutputRendererPlugin, RenderEvent, RetryStrategyPlugin, TaskWorker, WorkerContext};
use super::types::{ExecutionOpts, ExecutionReport, Task, WorkerResult};

/// Batch executor for task dependency graphs.
///
/// Batches run strictly one after another; the tasks of a batch run
/// concurrently and are all awaited before the next batch starts. A failed
/// task never stops its siblings or later batches.
pub struct BatchExecutor {
    worker: Arc<dyn TaskWorker>,
    opts: ExecutionOpts,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    retry_strategy: Option<Arc<dyn RetryStrategyPlugin>>,
    phase: Mutex<ExecutorPhase>,
}

impl BatchExecutor {
    pub fn new(worker: Arc<dyn TaskWorker>, opts: ExecutionOpts) -> Self {
        Self {
            worker,
            opts,
            renderer: None,
            retry_strategy: None,
            phase: Mutex::new(ExecutorPhase::Idle),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_retry_strategy(mut self, strategy: Arc<dyn RetryStrategyPlugin>) -> Self {
        self.retry_strategy = Some(strategy);
        self
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ExecutorPhase {
        self.phase.lock().map(|p| *p).unwrap_or(ExecutorPhase::Done)
    }

    /// Plan and execute a task list.
    ///
    /// Graph errors (duplicate ids, unknown prerequisites, cycles) abort the
    /// run before any worker is invoked.
    pub async fn execute(&self, tasks: &[Task]) -> Result<ExecutionReport, ExecutorError> {
        let graph = TaskGraph::from_tasks(tasks)?;
        graph.validate()?;
        let batches = graph.topological_sort()?;

        let run_id = Uuid::new_v4().to_string();
        self.execute_batches(&run_id, batches, &graph).await
    }

    /// Execute all batches sequentially (tasks within a batch run concurrently)
    #[tracing::instrument(name = "executor.run", skip(self, batches, graph), fields(tasks = graph.len()))]
    pub async fn execute_batches(
        &self,
        run_id: &str,
        batches: Vec<Vec<String>>,
        graph: &TaskGraph<Task>,
    ) -> Result<ExecutionReport, ExecutorError> {
        let start = Instant::now();
        let total_tasks = graph.len();
        let total_batches = batches.len();

        self.transition(ExecutorPhase::Running { batch_index: 0 })?;

        let progress = Arc::new(Mutex::new(ProgressMonitor::new(
            total_tasks,
            self.opts.progress_bar,
        )));

        self.emit(RenderEvent::RunStart {
            run_id: run_id.to_string(),
            total_tasks,
            total_batches,
        });
        self.emit(RenderEvent::Plan {
            run_id: run_id.to_string(),
            batches: batches.clone(),
        });
        tracing::info!(run_id, total_tasks, total_batches, "execution started");

        let mut results: Vec<WorkerResult> = Vec::with_capacity(total_tasks);

        for (batch_index, task_ids) in batches.iter().enumerate() {
            if batch_index > 0 {
                self.transition(ExecutorPhase::Running { batch_index })?;
            }
            self.emit(RenderEvent::BatchStart {
                run_id: run_id.to_string(),
                batch_index,
                task_ids: task_ids.clone(),
            });
            if let Ok(mut monitor) = progress.lock() {
                monitor.start_batch(batch_index, total_batches, task_ids);
            }
            tracing::info!(batch_index, tasks = task_ids.len(), "batch started");

            let batch_results = self
                .execute_batch_tasks(run_id, batch_index, task_ids, graph, progress.clone())
                .await?;

            let failed = batch_results.iter().filter(|r| !r.success).count();
            self.emit(RenderEvent::BatchEnd {
                run_id: run_id.to_string(),
                batch_index,
                succeeded: batch_results.len() - failed,
                failed,
            });
            if failed > 0 {
                tracing::warn!(batch_index, failed, "batch finished with failures, continuing");
            } else {
                tracing::info!(batch_index, "batch finished");
            }

            results.extend(batch_results);
            self.transition(ExecutorPhase::BatchComplete { batch_index })?;
        }

        let report = ExecutionReport::from_results(
            results,
            batches,
            start.elapsed().as_millis() as u64,
        );

        if let Ok(mut monitor) = progress.lock() {
            monitor.finish(&report);
        }

        self.transition(ExecutorPhase::Done)?;
        tracing::info!(
            run_id,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "execution finished"
        );
        self.emit(RenderEvent::RunEnd {
            run_id: run_id.to_string(),
            report: report.clone(),
        });

        Ok(report)
    }

    /// Execute tasks in a single batch (concurrently)
    async fn execute_batch_tasks(
        &self,
        run_id: &str,
        batch_index: usize,
        task_ids: &[String],
        graph: &TaskGraph<Task>,
        progress: Arc<Mutex<ProgressMonitor>>,
    ) -> Result<Vec<WorkerResult>, ExecutorError> {
        let executor_fn = |task: Task| {
            let progress = progress.clone();
            async move {
                self.emit(RenderEvent::TaskStart {
                    run_id: run_id.to_string(),
                    task_id: task.id.clone(),
                    batch_index,
                });

                let result = self.run_task(run_id, batch_index, &task).await;

                if let Ok(mut monitor) = progress.lock() {
                    monitor.record(&result);
                }
                self.emit(RenderEvent::TaskComplete {
                    run_id: run_id.to_string(),
                    task_id: task.id.clone(),
                    result: result.clone(),
                });
                result
            }
        };

        execute_batch_parallel(task_ids, graph, self.opts.max_parallel, executor_fn).await
    }

    /// Run one task to a `WorkerResult`, retrying when a strategy is set.
    async fn run_task(&self, run_id: &str, batch_index: usize, task: &Task) -> WorkerResult {
        let start = Instant::now();
        let max_attempts = self
            .retry_strategy
            .as_ref()
            .map(|strategy| strategy.max_attempts().max(1))
            .unwrap_or(1);

        let mut attempt: u32 = 0;
        let mut outcome = self.invoke_once(run_id, batch_index, task, attempt).await;

        if let Some(strategy) = &self.retry_strategy {
            while let Err(err) = &outcome {
                attempt += 1;
                if attempt >= max_attempts {
                    break;
                }
                let reason = err.to_string();
                if !strategy.should_retry(attempt, &reason) {
                    break;
                }
                let Some(delay) = strategy.next_delay(attempt, &reason) else {
                    break;
                };
                tracing::debug!(task_id = %task.id, attempt, ?delay, "retrying task: {}", reason);
                tokio::time::sleep(delay).await;
                outcome = self.invoke_once(run_id, batch_index, task, attempt).await;
            }
        }

        let retries_used = attempt.min(max_attempts.saturating_sub(1));
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(mut result) => {
                if result.task_id != task.id {
                    tracing::warn!(
                        task_id = %task.id,
                        reported = %result.task_id,
                        "worker reported a different task id, correcting"
                    );
                    result.task_id = task.id.clone();
                }
                if !result.success && result.errors.is_empty() {
                    result.errors.push(result.message.clone());
                }
                if !result.success {
                    result.changes.clear();
                }
                result
            }
            Err(err) => {
                tracing::warn!(task_id = %task.id, kind = %task.kind, "task failed: {}", err);
                WorkerResult::failed(task.id.clone(), format!("{} failed", task.kind), vec![err.to_string()])
            }
        };

        result.with_duration(duration_ms).with_retries(retries_used)
    }

    async fn invoke_once(
        &self,
        run_id: &str,
        batch_index: usize,
        task: &Task,
        attempt: u32,
    ) -> Result<WorkerResult, WorkerError> {
        let ctx = WorkerContext {
            run_id: run_id.to_string(),
            batch_index,
            attempt,
        };

        let call = self.worker.execute(task, &ctx);
        match self.opts.task_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => Err(WorkerError::Other(format!(
                    "timed out after {}ms",
                    limit.as_millis()
                ))),
            },
            None => call.await,
        }
    }

    fn transition(&self, next: ExecutorPhase) -> Result<(), ExecutorError> {
        let mut phase = self
            .phase
            .lock()
            .map_err(|_| ExecutorError::Runner("phase lock poisoned".into()))?;
        phase.validate(next)?;
        tracing::debug!(from = ?*phase, to = ?next, "executor phase");
        *phase = next;
        Ok(())
    }

    fn emit(&self, event: RenderEvent) {
        if let Some(renderer) = &self.renderer {
            renderer.render(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::{FileChange, TaskKind};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Test worker with per-task scripted behavior.
    #[derive(Default)]
    struct ScriptedWorker {
        fail: Vec<String>,
        hang: Vec<String>,
        flaky_until: HashMap<String, u32>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl TaskWorker for ScriptedWorker {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn execute(&self, task: &Task, ctx: &WorkerContext) -> Result<WorkerResult, WorkerError> {
            self.calls
                .lock()
                .unwrap()
                .push((task.id.clone(), ctx.batch_index));
            if self.hang.contains(&task.id) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.fail.contains(&task.id) {
                return Err(WorkerError::Other(format!("simulated failure in {}", task.id)));
            }
            if let Some(until) = self.flaky_until.get(&task.id) {
                if ctx.attempt < *until {
                    return Err(WorkerError::Other("flaky".into()));
                }
            }
            Ok(WorkerResult::succeeded(
                task.id.clone(),
                vec![FileChange::modify(task.target.clone(), "// instrumented")],
                "done",
            ))
        }
    }

    struct FixedRetry(u32);

    impl RetryStrategyPlugin for FixedRetry {
        fn name(&self) -> &str {
            "fixed"
        }
        fn next_delay(&self, _attempt: u32, _error: &str) -> Option<Duration> {
            Some(Duration::from_millis(1))
        }
        fn max_attempts(&self) -> u32 {
            self.0
        }
    }

    #[derive(Default)]
    struct CountingRenderer {
        events: Mutex<Vec<String>>,
    }

    impl OutputRendererPlugin for CountingRenderer {
        fn name(&self) -> &str {
            "counting"
        }
        fn format(&self) -> &str {
            "test"
        }
        fn render(&self, event: &RenderEvent) {
            let tag = match event {
                RenderEvent::RunStart { .. } => "run.start",
                RenderEvent::Plan { .. } => "plan",
                RenderEvent::BatchStart { .. } => "batch.start",
                RenderEvent::TaskStart { .. } => "task.start",
                RenderEvent::TaskComplete { .. } => "task.end",
                RenderEvent::BatchEnd { .. } => "batch.end",
                RenderEvent::RunEnd { .. } => "run.end",
            };
            self.events.lock().unwrap().push(tag.to_string());
        }
    }

    fn sample_tasks() -> Vec<Task> {
        vec![
            Task::new("dep-1", TaskKind::DependencyUpdate, "package.json", ""),
            Task::new("cfg-2", TaskKind::ConfigGeneration, "tracing.js", "")
                .with_dependencies(vec!["dep-1".into()]),
            Task::new("http-3", TaskKind::HttpInstrumentation, "routes/a.js", "")
                .with_dependencies(vec!["cfg-2".into()]),
            Task::new("http-4", TaskKind::HttpInstrumentation, "routes/b.js", "")
                .with_dependencies(vec!["cfg-2".into()]),
            Task::new("service-5", TaskKind::ServiceInstrumentation, "services/c.js", "")
                .with_dependencies(vec!["cfg-2".into()]),
        ]
    }

    fn no_timeout() -> ExecutionOpts {
        ExecutionOpts {
            task_timeout: None,
            ..ExecutionOpts::default()
        }
    }

    #[tokio::test]
    async fn all_successful_run() {
        let worker = Arc::new(ScriptedWorker::default());
        let executor = BatchExecutor::new(worker.clone(), no_timeout());

        let report = executor.execute(&sample_tasks()).await.unwrap();

        assert!(report.overall_success);
        assert_eq!(report.results.len(), 5);
        assert_eq!(report.batches.len(), 3);
        assert!(report.errors.is_empty());
        assert_eq!(executor.phase(), ExecutorPhase::Done);

        let order: Vec<&str> = report.results.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(order, vec!["dep-1", "cfg-2", "http-3", "http-4", "service-5"]);
    }

    #[tokio::test]
    async fn failure_does_not_cancel_siblings_or_later_batches() {
        let worker = Arc::new(ScriptedWorker {
            fail: vec!["cfg-2".into(), "http-4".into()],
            ..Default::default()
        });
        let executor = BatchExecutor::new(worker.clone(), no_timeout());

        let report = executor.execute(&sample_tasks()).await.unwrap();

        assert!(!report.overall_success);
        assert_eq!(report.results.len(), 5);
        assert_eq!(report.failed, 2);
        assert!(report.result("http-3").unwrap().success);
        assert!(report.result("service-5").unwrap().success);

        let failed = report.result("http-4").unwrap();
        assert!(failed.changes.is_empty());
        assert!(!failed.errors.is_empty());
        assert!(report
            .errors
            .iter()
            .any(|e| e.starts_with("http-4:") && e.contains("simulated failure")));

        // Batch 2 still ran after the config task failed.
        let calls = worker.calls.lock().unwrap();
        assert!(calls.iter().any(|(id, batch)| id == "http-3" && *batch == 2));
    }

    #[tokio::test]
    async fn batches_are_a_barrier() {
        let worker = Arc::new(ScriptedWorker::default());
        let executor = BatchExecutor::new(worker.clone(), no_timeout());
        executor.execute(&sample_tasks()).await.unwrap();

        let calls = worker.calls.lock().unwrap();
        let batch_of: Vec<usize> = calls.iter().map(|(_, b)| *b).collect();
        let mut sorted = batch_of.clone();
        sorted.sort();
        assert_eq!(batch_of, sorted);
    }

    #[tokio::test]
    async fn timeout_is_an_ordinary_failure() {
        let worker = Arc::new(ScriptedWorker {
            hang: vec!["http-3".into()],
            ..Default::default()
        });
        let opts = ExecutionOpts {
            task_timeout: Some(Duration::from_millis(20)),
            ..ExecutionOpts::default()
        };
        let executor = BatchExecutor::new(worker, opts);

        let report = executor.execute(&sample_tasks()).await.unwrap();

        let timed_out = report.result("http-3").unwrap();
        assert!(!timed_out.success);
        assert!(timed_out.errors[0].contains("timed out"));
        assert!(report.result("http-4").unwrap().success);
    }

    #[tokio::test]
    async fn cycle_aborts_before_any_work() {
        let worker = Arc::new(ScriptedWorker::default());
        let executor = BatchExecutor::new(worker.clone(), no_timeout());
        let tasks = vec![
            Task::new("a", TaskKind::HttpInstrumentation, "a.js", "").with_dependencies(vec!["b".into()]),
            Task::new("b", TaskKind::HttpInstrumentation, "b.js", "").with_dependencies(vec!["a".into()]),
        ];

        let err = executor.execute(&tasks).await.unwrap_err();
        assert!(matches!(err, ExecutorError::CircularDependency(_)));
        assert!(worker.calls.lock().unwrap().is_empty());
        assert_eq!(executor.phase(), ExecutorPhase::Idle);
    }

    #[tokio::test]
    async fn retry_strategy_recovers_flaky_task() {
        let mut flaky = HashMap::new();
        flaky.insert("http-3".to_string(), 2);
        let worker = Arc::new(ScriptedWorker {
            flaky_until: flaky,
            ..Default::default()
        });
        let executor =
            BatchExecutor::new(worker, no_timeout()).with_retry_strategy(Arc::new(FixedRetry(3)));

        let report = executor.execute(&sample_tasks()).await.unwrap();
        let result = report.result("http-3").unwrap();
        assert!(result.success);
        assert_eq!(result.retries_used, 2);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let worker = Arc::new(ScriptedWorker {
            fail: vec!["dep-1".into()],
            ..Default::default()
        });
        let executor = BatchExecutor::new(worker.clone(), no_timeout())
            .with_retry_strategy(Arc::new(FixedRetry(3)));

        let report = executor.execute(&sample_tasks()).await.unwrap();
        assert!(!report.result("dep-1").unwrap().success);
        let attempts = worker
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == "dep-1")
            .count();
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn renderer_sees_lifecycle_in_order() {
        let renderer = Arc::new(CountingRenderer::default());
        let executor = BatchExecutor::new(Arc::new(ScriptedWorker::default()), no_timeout())
            .with_renderer(renderer.clone());
        let tasks = vec![Task::new("cfg-1", TaskKind::ConfigGeneration, "tracing.js", "")];

        executor.execute(&tasks).await.unwrap();

        let events = renderer.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["run.start", "plan", "batch.start", "task.start", "task.end", "batch.end", "run.end"]
        );
    }

    #[tokio::test]
    async fn empty_task_list_is_trivially_successful() {
        let worker = Arc::new(ScriptedWorker::default());
        let executor = BatchExecutor::new(worker.clone(), no_timeout());
        let report = executor.execute(&[]).await.unwrap();
        assert!(report.overall_success);
        assert_eq!(report.total_tasks, 0);
        assert!(worker.calls.lock().unwrap().is_empty());
        assert_eq!(executor.phase(), ExecutorPhase::Done);
    }

    #[tokio::test]
    async fn executor_can_be_reused() {
        let executor = BatchExecutor::new(Arc::new(ScriptedWorker::default()), no_timeout());
        executor.execute(&sample_tasks()).await.unwrap();
        let report = executor.execute(&sample_tasks()).await.unwrap();
        assert!(report.overall_success);
    }
}
