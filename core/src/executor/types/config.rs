use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runtime options for one executor run.
#[derive(Debug, Clone)]
pub struct ExecutionOpts {
    /// Maximum tasks in flight inside one batch; `None` dispatches the whole
    /// batch at once.
    pub max_parallel: Option<usize>,

    /// Per-task deadline; an expired task becomes an ordinary failed result.
    pub task_timeout: Option<Duration>,

    /// Enable visual progress bar (disabled for jsonl output)
    pub progress_bar: bool,
}

impl Default for ExecutionOpts {
    fn default() -> Self {
        Self {
            max_parallel: None,
            task_timeout: Some(Duration::from_secs(default_task_timeout_secs())),
            progress_bar: false,
        }
    }
}

impl ExecutionOpts {
    /// Build runtime options from the executor section of the config file.
    pub fn from_config(cfg: &ExecutorConfig, progress_bar: bool) -> Self {
        Self {
            max_parallel: cfg.max_parallel.filter(|n| *n > 0),
            task_timeout: (cfg.task_timeout_secs > 0)
                .then(|| Duration::from_secs(cfg.task_timeout_secs)),
            progress_bar,
        }
    }
}

/// `[executor]` section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub max_parallel: Option<usize>,

    /// Seconds; 0 disables the per-task deadline.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_task_timeout_secs() -> u64 {
    300
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_parallel: None,
            task_timeout_secs: default_task_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_strategy")]
    pub strategy: String,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Total attempts including the first; 1 disables retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: default_retry_strategy(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_retry_strategy() -> String {
    "exponential-backoff".to_string()
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8000
}

fn default_max_attempts() -> u32 {
    2
}
