//! Venice chat-completions client.
//!
//! - Model validated against the registry at construction
//! - `max_tokens` capped at the model's context size
//! - 429 waits for the server's `x-ratelimit-reset` hint when present
//! - 5xx, timeouts and connection failures retried with backoff
//! - Any other status fails immediately

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::config::LlmConfig;
use super::models::{available_models, model_spec, ModelSpec};
use super::provider::{Completion, CompletionRequest, LlmProvider};
use crate::error::{LlmError, RateLimitInfo};
use crate::retry::{RetryDecision, RetryError, RetryPolicy};

/// Default timeout for completion requests
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Nucleus sampling used for every request
const TOP_P: f32 = 0.95;

/// Slack added on top of the server's reset hint
const RESET_SLACK_MS: u64 = 100;

pub struct VeniceClient {
    api_key: String,
    base_url: String,
    spec: &'static ModelSpec,
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
    initial_delay: Duration,
}

impl std::fmt::Debug for VeniceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VeniceClient")
            .field("base_url", &self.base_url)
            .field("model", &self.spec.name)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl VeniceClient {
    /// Build a client, rejecting a missing key or unknown model.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                LlmError::Config(
                    "API key is required. Provide it in the config or set VENICE_API_KEY.".to_string(),
                )
            })?;

        let spec = model_spec(&config.model).ok_or_else(|| {
            LlmError::Config(format!(
                "Invalid model: {}. Available models: {}",
                config.model,
                available_models()
            ))
        })?;

        debug!(model = spec.name, base_url = %config.base_url, "Venice client configured");

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            spec,
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: config.retry.to_policy(),
            initial_delay: config.retry.initial_delay,
        })
    }

    /// Create from VENICE_API_KEY / VENICE_MODEL / VENICE_API_BASE_URL
    pub fn from_env() -> Result<Self, LlmError> {
        let mut config = LlmConfig::default();
        config.api_key = std::env::var("VENICE_API_KEY").ok();
        if let Ok(model) = std::env::var("VENICE_MODEL") {
            config.model = model;
        }
        if let Ok(base_url) = std::env::var("VENICE_API_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        Self::new(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model_spec(&self) -> &'static ModelSpec {
        self.spec
    }

    /// Delay before retrying a 429: reset hint (+slack) or the initial delay,
    /// never longer than the policy's `max_delay`.
    fn rate_limit_delay(&self, info: Option<RateLimitInfo>) -> Duration {
        let delay = match info {
            Some(info) if info.reset_in > 0 => {
                Duration::from_millis(info.reset_in.saturating_mul(1_000).saturating_add(RESET_SLACK_MS))
            }
            _ => self.initial_delay,
        };
        delay.min(self.retry.max_delay)
    }

    fn classify(&self, error: &LlmError) -> RetryDecision {
        match error {
            LlmError::Api { status: 429, rate_limit, .. } => {
                let delay = self.rate_limit_delay(*rate_limit);
                warn!(delay_ms = delay.as_millis() as u64, "Rate limit exceeded, waiting before retry");
                RetryDecision::After(delay)
            }
            e if e.is_retryable() => RetryDecision::Backoff,
            _ => RetryDecision::Stop,
        }
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let body = ChatRequest {
            model: self.spec.name,
            messages: [
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.prompt },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens.min(self.spec.available_context_tokens),
            top_p: TOP_P,
        };

        debug!(
            model = self.spec.name,
            prompt_chars = request.prompt.len(),
            max_tokens = body.max_tokens,
            "Sending completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        let rate_limit = parse_rate_limit(response.headers());

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .and_then(|b| b.error_message())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: format!("Venice API error: {}", message),
                rate_limit,
            });
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("Invalid response format from Venice API".to_string()))?;

        Ok(Completion::new(content, self.spec.name))
    }
}

#[async_trait]
impl LlmProvider for VeniceClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        self.retry
            .run("venice_completion", |_| self.send_once(request), |e| self.classify(e))
            .await
            .map_err(|e| match e {
                RetryError::Exhausted { attempts, last } => LlmError::MaxRetriesExceeded {
                    attempts,
                    last: Box::new(last),
                },
                RetryError::Aborted(e) => e,
            })
    }

    fn name(&self) -> &str {
        "venice"
    }

    fn model(&self) -> &str {
        self.spec.name
    }
}

/// All three headers must be present and numeric.
fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let read = |name: &str| -> Option<u64> { headers.get(name)?.to_str().ok()?.trim().parse().ok() };
    Some(RateLimitInfo {
        remaining: read("x-ratelimit-remaining")?,
        limit: read("x-ratelimit-limit")?,
        reset_in: read("x-ratelimit-reset")?,
    })
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<serde_json::Value>,
}

impl ApiErrorBody {
    fn error_message(self) -> Option<String> {
        match self.error? {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            other => Some(other.to_string()),
        }
    }
}
