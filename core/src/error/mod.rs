#[allow(clippy::module_inception)]
pub mod error;
pub mod executor;
pub mod worker;

pub use error::{CliError, ErrorCode};
pub use executor::ExecutorError;
pub use worker::{CompletionError, ExtractError, WorkerError};
