//! Batch executor for task dependency graphs (DAG)
//!
//! - Task dependency graph construction and validation
//! - Layered topological sort into execution batches
//! - Circular dependency detection
//! - Concurrent execution inside a batch, a barrier between batches
//! - Failure isolation: errors, timeouts and panics become failed results
//!
//! # Architecture
//!
//! ```text
//! Vec<Task>
//!   ↓
//! TaskGraph::from_tasks()
//!   ↓
//! TaskGraph::validate() → detect_cycle(), check dependencies
//!   ↓
//! TaskGraph::topological_sort() → Vec<Vec<String>> (execution batches)
//!   ↓
//! BatchExecutor::execute_batches() → ExecutionReport
//! ```

mod engine;
mod graph;
mod phase;
mod progress;
mod scheduler;
pub mod traits;
pub mod types;

pub use engine::BatchExecutor;
pub use graph::{plan_batches, TaskGraph};
pub use phase::ExecutorPhase;
pub use progress::{BatchTally, ProgressMonitor};
pub use scheduler::execute_batch_parallel;
pub use types::{ExecutionOpts, ExecutionReport, Task, TaskKind, WorkerResult};
