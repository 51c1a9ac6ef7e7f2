//! # coreai-research
//!
//! Depth/breadth-bounded web research driven by an LLM.
//!
//! A run starts from one query, asks the LLM for `breadth` related search
//! queries, and follows each of them `depth` levels down: search, extract
//! learnings, pick a follow-up question, halve the breadth, repeat. Learnings
//! and sources from every branch are merged and deduplicated.
//!
//! ```no_run
//! use coreai_research::llm::{LlmConfig, VeniceClient};
//! use coreai_research::research::{ResearchConfig, ResearchEngine};
//! use coreai_research::search::BraveSearchProvider;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let search = Arc::new(BraveSearchProvider::new("brave-key")?);
//! let llm = Arc::new(VeniceClient::new(LlmConfig::new("venice-key"))?);
//!
//! let engine = ResearchEngine::new(search, llm);
//! let result = engine.research(ResearchConfig::new("quantum computing", 2, 3)).await;
//! for learning in &result.learnings {
//!     println!("- {learning}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod llm;
pub mod prompts;
pub mod rate_limit;
pub mod report;
pub mod research;
pub mod retry;
pub mod search;

pub use error::{LlmError, ResearchError, SearchError};
pub use prompts::{DefaultPrompts, FilePromptStore, PromptKind, PromptSource};
pub use rate_limit::RateLimiter;
pub use report::ResearchReport;
pub use research::{ResearchConfig, ResearchEngine, ResearchProgress, ResearchResult, ResearchSettings};
pub use retry::{RetryDecision, RetryError, RetryPolicy};
pub use search::{SearchProvider, SearchResult};
