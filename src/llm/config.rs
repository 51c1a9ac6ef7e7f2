//! LLM client configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::models::DEFAULT_MODEL;
use crate::retry::RetryPolicy;

/// Default Venice API root
pub const DEFAULT_BASE_URL: &str = "https://api.venice.ai/api/v1";

/// Retry behaviour for completion requests.
///
/// # Example
///
/// ```
/// use coreai_research::llm::LlmRetryConfig;
/// use std::time::Duration;
///
/// let retry = LlmRetryConfig::default();
/// assert_eq!(retry.max_attempts, 3);
/// assert_eq!(retry.initial_delay, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRetryConfig {
    /// Total attempts including the first
    pub max_attempts: usize,
    /// Delay before the first retry (and fallback delay on 429 without headers)
    #[serde(with = "duration_millis")]
    pub initial_delay: Duration,
    /// Double the delay on each retry; constant delay otherwise
    pub use_exponential_backoff: bool,
}

impl Default for LlmRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1_000),
            use_exponential_backoff: true,
        }
    }
}

impl LlmRetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_multiplier(if self.use_exponential_backoff { 2 } else { 1 })
            .with_base_delay(self.initial_delay)
    }
}

/// Configuration for a completion client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub retry: LlmRetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: LlmRetryConfig::default(),
        }
    }
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: LlmRetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
