use serde::{Deserialize, Serialize};

/// What a change does to its target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Create,
    Modify,
    None,
}

/// A proposed change to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub target_file: String,
    pub operation: ChangeOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
}

impl FileChange {
    pub fn create(target_file: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            target_file: target_file.into(),
            operation: ChangeOperation::Create,
            new_content: Some(content.into()),
        }
    }

    pub fn modify(target_file: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            target_file: target_file.into(),
            operation: ChangeOperation::Modify,
            new_content: Some(content.into()),
        }
    }

    pub fn unchanged(target_file: impl Into<String>) -> Self {
        Self {
            target_file: target_file.into(),
            operation: ChangeOperation::None,
            new_content: None,
        }
    }
}

/// Outcome of executing one task.
///
/// A failed result always carries at least one error and never carries
/// changes; use [`WorkerResult::succeeded`] and [`WorkerResult::failed`] to
/// build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerResult {
    pub task_id: String,
    pub success: bool,
    pub changes: Vec<FileChange>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    /// Wall time of the task including retries, in milliseconds
    #[serde(default)]
    pub duration_ms: u64,

    /// Number of retries used
    #[serde(default)]
    pub retries_used: u32,
}

impl WorkerResult {
    pub fn succeeded(
        task_id: impl Into<String>,
        changes: Vec<FileChange>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            changes,
            message: message.into(),
            errors: Vec::new(),
            duration_ms: 0,
            retries_used: 0,
        }
    }

    pub fn failed(task_id: impl Into<String>, message: impl Into<String>, errors: Vec<String>) -> Self {
        let message = message.into();
        let errors = if errors.is_empty() {
            vec![message.clone()]
        } else {
            errors
        };
        Self {
            task_id: task_id.into(),
            success: false,
            changes: Vec::new(),
            message,
            errors,
            duration_ms: 0,
            retries_used: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_retries(mut self, retries_used: u32) -> Self {
        self.retries_used = retries_used;
        self
    }
}

/// Result of executing a task graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Total number of tasks in the graph
    pub total_tasks: usize,

    /// Number of tasks whose result has `success == false`
    pub failed: usize,

    /// Total execution duration in milliseconds
    pub duration_ms: u64,

    /// Results in batch order, submission order within a batch
    pub results: Vec<WorkerResult>,

    /// True iff every result succeeded
    pub overall_success: bool,

    /// Errors of all failed results, each prefixed with its task id
    pub errors: Vec<String>,

    /// Execution batches
    pub batches: Vec<Vec<String>>,
}

impl ExecutionReport {
    pub fn from_results(
        results: Vec<WorkerResult>,
        batches: Vec<Vec<String>>,
        duration_ms: u64,
    ) -> Self {
        let errors: Vec<String> = results
            .iter()
            .filter(|r| !r.success)
            .flat_map(|r| r.errors.iter().map(move |e| format!("{}: {}", r.task_id, e)))
            .collect();
        let failed = results.iter().filter(|r| !r.success).count();
        let total_tasks = batches.iter().map(Vec::len).sum();

        Self {
            total_tasks,
            failed,
            duration_ms,
            overall_success: results.iter().all(|r| r.success),
            results,
            errors,
            batches,
        }
    }

    pub fn result(&self, task_id: &str) -> Option<&WorkerResult> {
        self.results.iter().find(|r| r.task_id == task_id)
    }

    pub fn succeeded(&self) -> usize {
        self.results.len() - self.failed
    }
}
