use serde::Serialize;

use crate::analysis::CodebaseAnalysis;
use crate::executor::types::{ChangeOperation, ExecutionReport, TaskKind};
use crate::planner::TaskPlan;

/// Aggregate report of one end-to-end run. Derived only from its inputs.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub files_analyzed: usize,
    pub files_modified: usize,
    pub files_created: usize,
    /// Files whose role mapped to no instrumentation category
    pub files_skipped: usize,
    pub total_tasks: usize,
    pub batch_count: usize,
    pub batches: Vec<Vec<String>>,
    pub dependencies_added: Vec<String>,
    pub duration_ms: u64,
    pub overall_success: bool,
    pub errors: Vec<String>,
}

impl RunSummary {
    /// `write_errors` are failures from applying changes; they count against
    /// overall success like task failures do.
    pub fn build(
        analysis: &CodebaseAnalysis,
        plan: &TaskPlan,
        report: &ExecutionReport,
        write_errors: &[String],
    ) -> Self {
        let successful = report.results.iter().filter(|r| r.success);

        let mut files_modified = 0;
        let mut files_created = 0;
        for change in successful.clone().flat_map(|r| r.changes.iter()) {
            match change.operation {
                ChangeOperation::Create => files_created += 1,
                ChangeOperation::Modify => files_modified += 1,
                ChangeOperation::None => {}
            }
        }

        let dependency_update_succeeded = successful.clone().any(|r| {
            plan.tasks
                .iter()
                .any(|t| t.id == r.task_id && t.kind == TaskKind::DependencyUpdate)
        });
        let dependencies_added = if dependency_update_succeeded {
            analysis.missing_dependencies.clone()
        } else {
            Vec::new()
        };

        let mut errors = report.errors.clone();
        errors.extend(write_errors.iter().cloned());

        Self {
            files_analyzed: analysis.files.len(),
            files_modified,
            files_created,
            files_skipped: plan.skipped.len(),
            total_tasks: plan.tasks.len(),
            batch_count: report.batches.len(),
            batches: report.batches.clone(),
            dependencies_added,
            duration_ms: report.duration_ms,
            overall_success: report.overall_success && write_errors.is_empty(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FileDescriptor, FileRole};
    use crate::executor::types::{FileChange, WorkerResult};
    use crate::planner::TaskGraphBuilder;

    fn analysis() -> CodebaseAnalysis {
        CodebaseAnalysis {
            root: ".".into(),
            files: vec![
                FileDescriptor::new("routes/a.js", FileRole::Route),
                FileDescriptor::new("index.js", FileRole::Other),
            ],
            missing_dependencies: vec!["@opentelemetry/api".into()],
        }
    }

    #[test]
    fn counts_changes_and_skips() {
        let analysis = analysis();
        let plan = TaskGraphBuilder::default().build(&analysis);
        let results = vec![
            WorkerResult::succeeded(
                "dependency-update-1",
                vec![FileChange::modify("package.json", "{}")],
                "ok",
            ),
            WorkerResult::succeeded(
                "config-generation-2",
                vec![FileChange::create("tracing.js", "x")],
                "ok",
            ),
            WorkerResult::succeeded("http-3", vec![FileChange::modify("routes/a.js", "y")], "ok"),
        ];
        let report = ExecutionReport::from_results(
            results,
            vec![
                vec!["dependency-update-1".into()],
                vec!["config-generation-2".into()],
                vec!["http-3".into()],
            ],
            42,
        );

        let summary = RunSummary::build(&analysis, &plan, &report, &[]);

        assert_eq!(summary.files_analyzed, 2);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.files_modified, 2);
        assert_eq!(summary.files_created, 1);
        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.batch_count, 3);
        assert_eq!(summary.dependencies_added, vec!["@opentelemetry/api".to_string()]);
        assert!(summary.overall_success);
    }

    #[test]
    fn failed_dependency_task_adds_nothing_and_write_errors_fail_the_run() {
        let analysis = analysis();
        let plan = TaskGraphBuilder::default().build(&analysis);
        let report = ExecutionReport::from_results(
            vec![WorkerResult::failed("dependency-update-1", "bad", vec![])],
            vec![vec!["dependency-update-1".into()]],
            1,
        );

        let summary = RunSummary::build(&analysis, &plan, &report, &["disk full".to_string()]);

        assert!(summary.dependencies_added.is_empty());
        assert!(!summary.overall_success);
        assert_eq!(summary.errors.len(), 2);
    }
}
