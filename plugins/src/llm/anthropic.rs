use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use otelflow_core::api::{CompletionError, CompletionRequest, CompletionService, LlmConfig};

const API_VERSION: &str = "2023-06-01";
const BODY_PREVIEW_LIMIT: usize = 512;

/// Messages-API client for Anthropic-compatible endpoints.
pub struct AnthropicClient {
    http: reqwest::Client,
    url_messages: String,
    api_key: Option<String>,
    model: String,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout_ms: u64,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()?;
        let normalized = base_url.trim_end_matches('/');
        Ok(Self {
            http,
            url_messages: format!("{}/messages", normalized),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            max_tokens: 4096,
            temperature: 0.0,
        })
    }

    /// Build from the `[llm]` config section. The API key is read from the
    /// environment variable named by `api_key_env`; a missing key only fails
    /// once a completion is actually requested.
    pub fn from_config(cfg: &LlmConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env).ok();
        let mut client = Self::new(&cfg.base_url, api_key, cfg.model.clone(), cfg.request_timeout_ms)?;
        if client.api_key.is_none() {
            tracing::warn!("{} is not set; completion requests will fail", cfg.api_key_env);
        }
        client.max_tokens = cfg.max_tokens;
        client.temperature = cfg.temperature.clamp(0.0, 1.0);
        Ok(client)
    }
}

#[async_trait]
impl CompletionService for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CompletionError::MissingCredentials("no API key configured".into()))?;

        let mut payload = json!({
            "model": self.model,
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
            "temperature": request.temperature.unwrap_or(self.temperature),
            "messages": [{ "role": "user", "content": request.prompt }],
        });
        if let Some(system) = &request.system {
            payload["system"] = json!(system);
        }

        tracing::debug!(
            url = %self.url_messages,
            model = %self.model,
            prompt_len = request.prompt.len(),
            "completion request"
        );

        let resp = self
            .http
            .post(&self.url_messages)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(CompletionError::Http {
                status: status.as_u16(),
                body: preview_body(&body),
            });
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| CompletionError::InvalidResponse(format!("{e}: {}", preview_body(&body))))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect();

        if text.trim().is_empty() {
            return Err(CompletionError::InvalidResponse("no text content".into()));
        }

        tracing::debug!(status = %status, text_len = text.len(), "completion response");
        Ok(text)
    }
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    if trimmed.chars().count() <= BODY_PREVIEW_LIMIT {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    out.push_str("...");
    out
}
