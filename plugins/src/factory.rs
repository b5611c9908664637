use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use otelflow_core::api::{
    AppConfig, CodebaseAnalysis, CompletionService, OutputRendererPlugin, RetryConfig,
    RetryStrategyPlugin, TaskWorker,
};

use crate::analyzer::CodebaseAnalyzer;
use crate::executor::{ExponentialBackoffPlugin, JsonlRendererPlugin, LinearRetryPlugin, TextRendererPlugin};
use crate::llm::AnthropicClient;
use crate::worker::LlmTaskWorker;

pub fn build_renderer(format: &str) -> Arc<dyn OutputRendererPlugin> {
    match format {
        "jsonl" => Arc::new(JsonlRendererPlugin::new(false)),
        // Anything other than jsonl renders as text.
        _ => Arc::new(TextRendererPlugin::new(false)),
    }
}

/// `None` when retries are disabled (`strategy = "none"` or a single attempt).
pub fn build_retry(cfg: &RetryConfig) -> Option<Arc<dyn RetryStrategyPlugin>> {
    if cfg.max_attempts <= 1 {
        return None;
    }
    match cfg.strategy.as_str() {
        "none" => None,
        "linear" => Some(Arc::new(LinearRetryPlugin::new(cfg.clone()))),
        "exponential-backoff" => Some(Arc::new(ExponentialBackoffPlugin::new(cfg.clone()))),
        other => {
            tracing::warn!("unknown retry strategy '{}', using exponential-backoff", other);
            Some(Arc::new(ExponentialBackoffPlugin::new(cfg.clone())))
        }
    }
}

pub fn build_completion(cfg: &AppConfig) -> Result<Arc<dyn CompletionService>> {
    Ok(Arc::new(AnthropicClient::from_config(&cfg.llm)?))
}

pub fn build_analyzer(cfg: &AppConfig) -> CodebaseAnalyzer {
    let required = cfg
        .instrumentation
        .required_packages
        .iter()
        .map(|p| p.name.clone())
        .collect();
    CodebaseAnalyzer::new(required).with_config_file(cfg.instrumentation.config_file.clone())
}

pub fn build_worker(
    cfg: &AppConfig,
    completion: Arc<dyn CompletionService>,
    source_root: &Path,
    analysis: &CodebaseAnalysis,
) -> Arc<dyn TaskWorker> {
    Arc::new(
        LlmTaskWorker::new(completion, source_root, cfg.instrumentation.clone()).with_analysis(analysis),
    )
}
