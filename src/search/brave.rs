//! Brave Search API provider.
//!
//! - One shared [`RateLimiter`] slot before every HTTP call (free plan: 5s)
//! - 429 responses retried with exponential backoff, then reported as RATE_LIMIT
//! - Other HTTP failures reported as API_ERROR, unreadable bodies as UNKNOWN_ERROR

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ResultType, SearchProvider, SearchResult};
use crate::error::SearchError;
use crate::rate_limit::RateLimiter;
use crate::retry::{RetryDecision, RetryError, RetryPolicy};

/// Default Brave API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.search.brave.com/res/v1";

/// Default timeout for Brave API requests
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Minimum spacing between requests on the free plan
const DEFAULT_MIN_DELAY_MS: u64 = 5_000;

/// Retries after a 429
const MAX_RETRIES: usize = 3;

/// Base delay for 429 backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 2_000;

/// Results requested per query
const RESULT_COUNT: u32 = 10;

const PROVIDER: &str = "brave";
const UNTITLED: &str = "Untitled";
const NO_DESCRIPTION: &str = "No description available";

pub struct BraveSearchProvider {
    api_key: String,
    base_url: String,
    client: Client,
    timeout: Duration,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl BraveSearchProvider {
    /// Create a provider with the given subscription token.
    pub fn new(api_key: impl Into<String>) -> Result<Self, SearchError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SearchError::unknown(PROVIDER, "BRAVE_API_KEY is required"));
        }

        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            rate_limiter: RateLimiter::from_millis(DEFAULT_MIN_DELAY_MS),
            retry: RetryPolicy::with_retries(MAX_RETRIES, Duration::from_millis(RETRY_BASE_DELAY_MS)),
        })
    }

    /// Create from environment variable BRAVE_API_KEY
    pub fn from_env() -> Result<Self, SearchError> {
        let api_key = std::env::var("BRAVE_API_KEY")
            .map_err(|_| SearchError::unknown(PROVIDER, "BRAVE_API_KEY environment variable is required"))?;
        Self::new(api_key)
    }

    /// Point at a different API root (mock servers, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.rate_limiter = RateLimiter::new(min_delay);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    async fn make_request(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.rate_limiter.wait_for_next_slot().await;

        let url = format!("{}/web/search", self.base_url);
        debug!(url = %url, query = %query, "Sending Brave search request");

        let count = RESULT_COUNT.to_string();
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("offset", "0"),
                ("language", "en"),
                ("country", "US"),
                ("safesearch", "moderate"),
                ("format", "json"),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SearchError::api(PROVIDER, None, format!("Brave search failed: {}", e)))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            debug!(body = %body, "Rate limit response");
            return Err(SearchError::rate_limit(PROVIDER, "HTTP 429 Too Many Requests"));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Brave API error response");
            return Err(SearchError::api(
                PROVIDER,
                Some(status.as_u16()),
                format!("Brave search failed: HTTP {}", status),
            ));
        }

        let payload: BraveResponse = response
            .json()
            .await
            .map_err(|e| SearchError::unknown(PROVIDER, format!("Brave search failed: {}", e)))?;

        Ok(payload.into_results())
    }
}

#[async_trait]
impl SearchProvider for BraveSearchProvider {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        info!(query = %query, "Starting Brave search");

        let results = self
            .retry
            .run(
                "brave_search",
                |_| self.make_request(query),
                |e: &SearchError| {
                    if e.is_rate_limit() {
                        RetryDecision::Backoff
                    } else {
                        RetryDecision::Stop
                    }
                },
            )
            .await
            .map_err(|e| match e {
                RetryError::Exhausted { attempts, .. } => SearchError::rate_limit(
                    PROVIDER,
                    format!("Rate limit exceeded after {} retries", attempts.saturating_sub(1)),
                ),
                RetryError::Aborted(e) => e,
            })?;

        info!(query = %query, count = results.len(), "Search completed");
        Ok(results)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
}

impl BraveResponse {
    fn into_results(self) -> Vec<SearchResult> {
        self.web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .map(|r| SearchResult {
                title: r.title.filter(|t| !t.is_empty()).unwrap_or_else(|| UNTITLED.to_string()),
                content: Some(
                    r.description
                        .filter(|d| !d.is_empty())
                        .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                ),
                source: r.url,
                kind: ResultType::Web,
            })
            .collect()
    }
}
