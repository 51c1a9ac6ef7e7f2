//! Web search capability.
//!
//! The research loop only depends on [`SearchProvider`]; [`BraveSearchProvider`]
//! is the production implementation.

mod brave;

pub use brave::{BraveSearchProvider, DEFAULT_BASE_URL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Kind of content a search result came from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    #[default]
    Web,
}

/// A single search hit.
///
/// `content` and `source` may be missing; the research loop skips hits
/// without usable content and only records non-empty sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub content: Option<String>,
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub kind: ResultType,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: Some(content.into()),
            source: Some(source.into()),
            kind: ResultType::Web,
        }
    }

    /// Content if present and not blank.
    pub fn usable_content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Source if present and not blank.
    pub fn usable_source(&self) -> Option<&str> {
        self.source.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Anything that can answer a web query.
///
/// Implementations rate-limit themselves and report exhausted rate limits as
/// [`SearchError::RateLimit`] so callers can tell them apart from other failures.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;

    /// Provider name for logging/debugging
    fn name(&self) -> &str;
}
