//! Error types for the research engine and its capability providers.
//!
//! Every error exposes a `code()` so callers can branch on the kind of failure
//! without matching on messages. Rate limits in particular must stay
//! distinguishable all the way up to the research loop.

use std::fmt;
use thiserror::Error;

/// Search error discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchErrorCode {
    RateLimit,
    ApiError,
    UnknownError,
}

impl SearchErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchErrorCode::RateLimit => "RATE_LIMIT",
            SearchErrorCode::ApiError => "API_ERROR",
            SearchErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for SearchErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a [`SearchProvider`](crate::search::SearchProvider).
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    #[error("Rate limit exceeded ({provider}): {message}")]
    RateLimit { provider: String, message: String },

    #[error("Search API error ({provider}): {message}")]
    Api {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Search failed ({provider}): {message}")]
    Unknown { provider: String, message: String },
}

impl SearchError {
    pub fn rate_limit(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimit {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn api(provider: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn unknown(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unknown {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> SearchErrorCode {
        match self {
            SearchError::RateLimit { .. } => SearchErrorCode::RateLimit,
            SearchError::Api { .. } => SearchErrorCode::ApiError,
            SearchError::Unknown { .. } => SearchErrorCode::UnknownError,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        self.code() == SearchErrorCode::RateLimit
    }
}

/// LLM error discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorCode {
    ConfigError,
    ApiError,
    NetworkError,
    InvalidResponse,
    MaxRetriesExceeded,
}

impl LlmErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmErrorCode::ConfigError => "ConfigError",
            LlmErrorCode::ApiError => "APIError",
            LlmErrorCode::NetworkError => "NetworkError",
            LlmErrorCode::InvalidResponse => "InvalidResponse",
            LlmErrorCode::MaxRetriesExceeded => "MaxRetriesExceeded",
        }
    }
}

impl fmt::Display for LlmErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate limit headers reported by the completion API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub remaining: u64,
    pub limit: u64,
    /// Seconds until the window resets
    pub reset_in: u64,
}

/// Errors raised by an [`LlmProvider`](crate::llm::LlmProvider).
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        rate_limit: Option<RateLimitInfo>,
    },

    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed after {attempts} attempts")]
    MaxRetriesExceeded {
        attempts: usize,
        #[source]
        last: Box<LlmError>,
    },
}

impl LlmError {
    pub fn code(&self) -> LlmErrorCode {
        match self {
            LlmError::Config(_) => LlmErrorCode::ConfigError,
            LlmError::Api { .. } => LlmErrorCode::ApiError,
            LlmError::Timeout | LlmError::Connection(_) => LlmErrorCode::NetworkError,
            LlmError::InvalidResponse(_) => LlmErrorCode::InvalidResponse,
            LlmError::MaxRetriesExceeded { .. } => LlmErrorCode::MaxRetriesExceeded,
        }
    }

    /// 429, 5xx, timeouts and dropped connections are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::Timeout | LlmError::Connection(_) => true,
            _ => false,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::Api { status: 429, .. })
    }
}

/// Errors surfaced inside a research run.
///
/// The engine converts all of these into a degenerate result before returning
/// to its caller; they are only observable from the lower-level APIs.
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Invalid research configuration: {0}")]
    Config(String),

    #[error("Prompt store error: {0}")]
    Prompt(String),

    #[error("Response processing failed: {0}")]
    Processing(String),
}

impl ResearchError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ResearchError::Search(e) if e.is_rate_limit())
    }
}

impl From<std::io::Error> for ResearchError {
    fn from(e: std::io::Error) -> Self {
        ResearchError::Prompt(e.to_string())
    }
}
