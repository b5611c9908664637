use thiserror::Error;

use super::error::ErrorCode;

/// Failures of the text-completion service.
#[derive(Error, Debug, Clone)]
pub enum CompletionError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingCredentials(_) => ErrorCode::AuthError,
            Self::Transport(_) => ErrorCode::NetworkError,
            Self::Http { status, .. } if *status == 401 || *status == 403 => ErrorCode::AuthError,
            Self::Http { .. } => ErrorCode::BackendError,
            Self::InvalidResponse(_) => ErrorCode::BackendError,
        }
    }
}

/// Failures while pulling a structured payload out of free-form model output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no fenced code block found")]
    NoCodeBlock,

    #[error("extracted payload is empty")]
    EmptyPayload,

    #[error("no JSON object or array found")]
    NoJson,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),
}

/// Errors raised by a task worker. The executor turns every one of these into
/// a failed `WorkerResult`.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("could not extract payload: {0}")]
    Extract(#[from] ExtractError),

    #[error("io error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("worker error: {0}")]
    Other(String),
}

impl WorkerError {
    pub fn io(path: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Completion(e) => e.error_code(),
            Self::Extract(_) => ErrorCode::BackendError,
            Self::Io { .. } => ErrorCode::FileNotFound,
            Self::InvalidInput(_) => ErrorCode::ValidationError,
            Self::Other(_) => ErrorCode::GeneralError,
        }
    }
}
