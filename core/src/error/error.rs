use thiserror::Error;

use super::executor::ExecutorError;

/// Coarse error categories, shared by events and process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    GeneralError = 1,
    ValidationError = 3,
    TaskNotFound = 10,
    DependencyError = 11,
    CircularDependency = 12,
    BackendError = 20,
    Timeout = 30,
    NetworkError = 40,
    AuthError = 41,
    FileNotFound = 60,
    PathTraversal = 65,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("scheduling failed: {0}")]
    Scheduling(#[from] ExecutorError),
    #[error("analysis failed: {0}")]
    Analysis(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}
