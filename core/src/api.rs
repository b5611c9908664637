//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `otelflow_core::api` instead of reaching into internal modules.

pub use crate::analysis::{CodebaseAnalysis, FileDescriptor, FileRole};
pub use crate::apply::{copy_template, write_changes, WriteReport};
pub use crate::config::{
    load_default, load_file, load_from_str, AppConfig, InstrumentationConfig, LlmConfig, LoggingConfig,
    RequiredPackage,
};
pub use crate::error::{
    CliError, CompletionError, ErrorCode, ExecutorError, ExtractError, WorkerError,
};
pub use crate::executor::traits::{
    OutputRendererPlugin, RenderEvent, RetryStrategyPlugin, TaskWorker, WorkerContext,
};
pub use crate::executor::types::{
    ChangeOperation, ExecutionOpts, ExecutionReport, ExecutorConfig, FileChange, RetryConfig,
    Task, TaskKind, TaskLike, WorkerResult,
};
pub use crate::executor::{plan_batches, BatchExecutor, ExecutorPhase, TaskGraph};
pub use crate::extract::{extract_code_block, extract_json, extract_json_str};
pub use crate::llm::{CompletionRequest, CompletionService};
pub use crate::planner::{classify, TaskGraphBuilder, TaskPlan};
pub use crate::summary::RunSummary;
