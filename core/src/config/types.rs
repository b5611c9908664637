use serde::{Deserialize, Serialize};

use crate::executor::types::ExecutorConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub instrumentation: InstrumentationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "otelflow_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

/// `[llm]` section: the completion endpoint used by the task worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_llm_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_llm_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_max_tokens() -> usize {
    4096
}

fn default_temperature() -> f32 {
    0.0
}

fn default_request_timeout_ms() -> u64 {
    120_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// A package the instrumented codebase must depend on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredPackage {
    pub name: String,
    pub version: String,
}

/// `[instrumentation]` section: what "instrumented" means for a codebase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Path of the generated SDK bootstrap file, relative to the codebase root
    #[serde(default = "default_config_file")]
    pub config_file: String,

    #[serde(default = "default_required_packages")]
    pub required_packages: Vec<RequiredPackage>,
}

fn default_service_name() -> String {
    "my-service".to_string()
}

fn default_config_file() -> String {
    "tracing.js".to_string()
}

fn default_required_packages() -> Vec<RequiredPackage> {
    [
        ("@opentelemetry/api", "^1.9.0"),
        ("@opentelemetry/sdk-node", "^0.52.0"),
        ("@opentelemetry/auto-instrumentations-node", "^0.48.0"),
        ("@opentelemetry/exporter-trace-otlp-http", "^0.52.0"),
    ]
    .into_iter()
    .map(|(name, version)| RequiredPackage {
        name: name.to_string(),
        version: version.to_string(),
    })
    .collect()
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            config_file: default_config_file(),
            required_packages: default_required_packages(),
        }
    }
}

impl InstrumentationConfig {
    pub fn version_of(&self, package: &str) -> Option<&str> {
        self.required_packages
            .iter()
            .find(|p| p.name == package)
            .map(|p| p.version.as_str())
    }
}
