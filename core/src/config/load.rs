use std::path::{Path, PathBuf};

use super::types::AppConfig;

const LOCAL_CONFIG: &str = "otelflow.toml";

/// Get the default data directory: ~/.otelflow
pub fn get_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".otelflow"))
}

/// Load the config with the usual precedence:
/// `~/.otelflow/config.toml`, then `./otelflow.toml`, then defaults, with
/// `OTELFLOW_*` environment variables applied on top.
pub fn load_default() -> anyhow::Result<AppConfig> {
    let user_config = get_data_dir().ok().map(|d| d.join("config.toml"));
    let local_config = Path::new(LOCAL_CONFIG);

    let mut cfg = match user_config.filter(|p| p.exists()) {
        Some(path) => load_from_path(&path)?,
        None if local_config.exists() => load_from_path(local_config)?,
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

/// Load an explicit config file, environment overrides applied.
pub fn load_file(path: &Path) -> anyhow::Result<AppConfig> {
    let mut cfg = load_from_path(path)?;
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    load_from_str(&s).map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))
}

pub fn load_from_str(s: &str) -> anyhow::Result<AppConfig> {
    Ok(toml::from_str::<AppConfig>(s)?)
}

/// Environment variable overrides (highest priority below CLI flags).
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, get: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("OTELFLOW_MODEL") {
        cfg.llm.model = v;
    }
    if let Some(v) = non_empty("OTELFLOW_LLM_BASE_URL") {
        cfg.llm.base_url = v;
    }
    if let Some(v) = non_empty("OTELFLOW_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = non_empty("OTELFLOW_SERVICE_NAME") {
        cfg.instrumentation.service_name = v;
    }
    if let Some(v) = non_empty("OTELFLOW_MAX_PARALLEL") {
        match v.trim().parse::<usize>() {
            Ok(n) => cfg.executor.max_parallel = Some(n),
            Err(_) => tracing::warn!("ignoring OTELFLOW_MAX_PARALLEL={v}: not a number"),
        }
    }
    if let Some(v) = non_empty("OTELFLOW_TASK_TIMEOUT_SECS") {
        match v.trim().parse::<u64>() {
            Ok(n) => cfg.executor.task_timeout_secs = n,
            Err(_) => tracing::warn!("ignoring OTELFLOW_TASK_TIMEOUT_SECS={v}: not a number"),
        }
    }
}
