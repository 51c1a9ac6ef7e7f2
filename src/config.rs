//! # Configuration Module
//!
//! This module loads the research CLI's configuration from environment
//! variables (and an optional `.env` file). It demonstrates:
//! - The Default trait for sensible defaults
//! - Layering environment overrides on top of defaults
//! - Fail-fast validation with anyhow

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use coreai_research::llm::{available_models, is_valid_model, DEFAULT_BASE_URL as VENICE_BASE_URL, DEFAULT_MODEL};
use coreai_research::search::DEFAULT_BASE_URL as BRAVE_BASE_URL;

/// Upper bound on depth; each level multiplies the number of searches.
pub const MAX_DEPTH: usize = 10;

/// Upper bound on breadth.
pub const MAX_BREADTH: usize = 20;

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Main configuration for a research run.
///
/// # Rust Concept: Option<T> for "maybe configured"
/// API keys are `Option<String>` because a missing key is only an error once
/// we actually build the provider that needs it. `validate()` checks this.
#[derive(Debug, Clone)]
pub struct Config {
    /// Venice API key (VENICE_API_KEY)
    pub venice_api_key: Option<String>,

    /// Venice model name, checked against the model registry
    pub model: String,

    /// Venice API base URL
    pub venice_base_url: String,

    /// Brave Search API key (BRAVE_API_KEY)
    pub brave_api_key: Option<String>,

    /// Brave Search API base URL
    pub brave_base_url: String,

    /// Follow-up levels per branch
    pub depth: usize,

    /// Initial query fan-out; halves at each deeper level
    pub breadth: usize,

    /// Root of the prompt store, if any
    pub prompts_dir: Option<PathBuf>,

    /// Log level for the application
    pub log_level: String,
}

// =============================================================================
// DEFAULT IMPLEMENTATION
// =============================================================================
impl Default for Config {
    fn default() -> Self {
        Self {
            venice_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            venice_base_url: VENICE_BASE_URL.to_string(),
            brave_api_key: None,
            brave_base_url: BRAVE_BASE_URL.to_string(),

            // Two levels of three branches: 3 + 2 = 5 searches
            depth: 2,
            breadth: 3,

            prompts_dir: None,
            log_level: "info".to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Rust Concept: The ? Operator with Context
    ///
    /// `.context()` wraps a parse error with a message naming the variable,
    /// and `?` returns it early. The user sees both:
    /// `RESEARCH_DEPTH must be a non-negative integer: invalid digit found in string`
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        config.venice_api_key = non_empty_var("VENICE_API_KEY");
        config.brave_api_key = non_empty_var("BRAVE_API_KEY");

        if let Some(val) = non_empty_var("VENICE_MODEL") {
            config.model = val;
        }

        if let Some(val) = non_empty_var("VENICE_API_BASE_URL") {
            config.venice_base_url = val;
        }

        if let Some(val) = non_empty_var("BRAVE_API_BASE_URL") {
            config.brave_base_url = val;
        }

        if let Some(val) = non_empty_var("RESEARCH_DEPTH") {
            config.depth = val
                .parse()
                .context("RESEARCH_DEPTH must be a non-negative integer")?;
        }

        if let Some(val) = non_empty_var("RESEARCH_BREADTH") {
            config.breadth = val
                .parse()
                .context("RESEARCH_BREADTH must be a positive integer")?;
        }

        config.prompts_dir = non_empty_var("PROMPTS_DIR").map(PathBuf::from);

        if let Ok(val) = env::var("RUST_LOG") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// Validate research parameters and the model name.
    ///
    /// Keys are checked separately by [`Config::require_keys`] so that
    /// parameter mistakes are reported even without credentials.
    pub fn validate(&self) -> Result<()> {
        if self.breadth == 0 {
            anyhow::bail!("Breadth must be at least 1");
        }

        if self.breadth > MAX_BREADTH {
            anyhow::bail!("Breadth must be at most {}, got: {}", MAX_BREADTH, self.breadth);
        }

        if self.depth > MAX_DEPTH {
            anyhow::bail!("Depth must be at most {}, got: {}", MAX_DEPTH, self.depth);
        }

        if !is_valid_model(&self.model) {
            anyhow::bail!(
                "Unknown model: {}. Available models: {}",
                self.model,
                available_models()
            );
        }

        Ok(())
    }

    /// Both API keys, or an error naming the missing one.
    pub fn require_keys(&self) -> Result<(&str, &str)> {
        let venice = self
            .venice_api_key
            .as_deref()
            .context("VENICE_API_KEY is not set")?;
        let brave = self
            .brave_api_key
            .as_deref()
            .context("BRAVE_API_KEY is not set")?;
        Ok((venice, brave))
    }
}

/// `Some(value)` if the variable is set to something other than whitespace.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
