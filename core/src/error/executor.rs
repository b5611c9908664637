use thiserror::Error;

use super::error::ErrorCode;

/// Executor-specific errors for task graph construction and execution
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("Dependency not found: task '{task_id}' depends on '{missing_dep}'")]
    DependencyNotFound {
        task_id: String,
        missing_dep: String,
    },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Runner error: {0}")]
    Runner(String),
}

impl ExecutorError {
    /// Map executor error to protocol error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::DuplicateTaskId(_) => ErrorCode::ValidationError,
            Self::DependencyNotFound { .. } => ErrorCode::DependencyError,
            Self::CircularDependency(_) => ErrorCode::CircularDependency,
            Self::TaskNotFound(_) => ErrorCode::TaskNotFound,
            Self::InvalidTransition { .. } => ErrorCode::GeneralError,
            Self::Runner(_) => ErrorCode::GeneralError,
        }
    }

    /// True for errors caused by the shape of the task graph rather than by
    /// the runtime.
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTaskId(_)
                | Self::DependencyNotFound { .. }
                | Self::CircularDependency(_)
        )
    }
}
