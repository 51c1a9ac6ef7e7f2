//! Top-level research entry point.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::generator::ResearchAi;
use super::path::{dedupe, ResearchPath, ResearchSettings};
use super::progress::ProgressCallback;
use super::prompts::default_system_prompt;
use crate::error::ResearchError;
use crate::llm::LlmProvider;
use crate::prompts::{DefaultPrompts, PromptKind, PromptSource};
use crate::search::SearchProvider;

/// Input for one research run.
#[derive(Clone)]
pub struct ResearchConfig {
    pub query: String,
    pub depth: usize,
    pub breadth: usize,
    pub on_progress: Option<ProgressCallback>,
    /// Used as-is instead of the prompt store's active research prompt
    pub system_prompt: Option<String>,
}

impl std::fmt::Debug for ResearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchConfig")
            .field("query", &self.query)
            .field("depth", &self.depth)
            .field("breadth", &self.breadth)
            .field("on_progress", &self.on_progress.is_some())
            .field("system_prompt", &self.system_prompt.is_some())
            .finish()
    }
}

impl ResearchConfig {
    pub fn new(query: impl Into<String>, depth: usize, breadth: usize) -> Self {
        Self {
            query: query.into(),
            depth,
            breadth,
            on_progress: None,
            system_prompt: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn validate(&self) -> Result<(), ResearchError> {
        if self.query.trim().is_empty() {
            return Err(ResearchError::Config("query must not be empty".into()));
        }
        if self.breadth == 0 {
            return Err(ResearchError::Config("breadth must be at least 1".into()));
        }
        Ok(())
    }
}

/// Deduplicated learnings and sources from a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub learnings: Vec<String>,
    pub sources: Vec<String>,
}

impl ResearchResult {
    /// Placeholder result for a run that produced nothing usable.
    pub fn attempted(query: &str) -> Self {
        Self {
            learnings: vec![format!("Research attempted on: {}", query)],
            sources: Vec::new(),
        }
    }

    /// Flatten branch results, dropping duplicates.
    pub fn merge(branches: impl IntoIterator<Item = ResearchResult>) -> Self {
        let (learnings, sources): (Vec<_>, Vec<_>) = branches
            .into_iter()
            .map(|branch| (branch.learnings, branch.sources))
            .unzip();

        Self {
            learnings: dedupe(learnings.into_iter().flatten()),
            sources: dedupe(sources.into_iter().flatten()),
        }
    }
}

/// Runs research with injected search, LLM and prompt-store services.
pub struct ResearchEngine {
    search: Arc<dyn SearchProvider>,
    llm: Arc<dyn LlmProvider>,
    prompts: Arc<dyn PromptSource>,
    settings: ResearchSettings,
}

impl ResearchEngine {
    pub fn new(search: Arc<dyn SearchProvider>, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            search,
            llm,
            prompts: Arc::new(DefaultPrompts),
            settings: ResearchSettings::default(),
        }
    }

    pub fn with_prompt_source(mut self, prompts: Arc<dyn PromptSource>) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_settings(mut self, settings: ResearchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Explicit override, else the store's active research prompt, else the built-in one.
    pub async fn resolve_system_prompt(&self, config: &ResearchConfig) -> String {
        if let Some(prompt) = config.system_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
            return prompt.to_string();
        }

        match self.prompts.active_prompt(PromptKind::Research).await {
            Ok(Some(prompt)) if !prompt.trim().is_empty() => {
                debug!(chars = prompt.len(), "Using active research prompt");
                prompt
            }
            Ok(_) => default_system_prompt().to_string(),
            Err(e) => {
                warn!(error = %e, "Could not load research prompt, using built-in default");
                default_system_prompt().to_string()
            }
        }
    }

    /// Run one research job. Always returns a result.
    pub async fn research(&self, config: ResearchConfig) -> ResearchResult {
        if let Err(e) = config.validate() {
            error!(error = %e, "Rejected research request");
            return ResearchResult::attempted(&config.query);
        }

        let system_prompt = self.resolve_system_prompt(&config).await;
        let ai = ResearchAi::new(Arc::clone(&self.llm)).with_system_prompt(system_prompt);

        let mut path = ResearchPath::new(
            config.query.as_str(),
            config.depth,
            config.breadth,
            Arc::clone(&self.search),
            ai,
        )
        .with_settings(self.settings.clone());
        if let Some(callback) = config.on_progress.clone() {
            path = path.with_progress_callback(callback);
        }

        match path.research().await {
            Ok(result) => result,
            Err(e) => {
                error!(query = %config.query, error = %e, "Research run aborted");
                ResearchResult::attempted(&config.query)
            }
        }
    }

    /// Narrative summary of a finished run's learnings.
    pub async fn summarize(&self, config: &ResearchConfig, learnings: &[String]) -> String {
        let system_prompt = self.resolve_system_prompt(config).await;
        info!(learnings = learnings.len(), "Generating summary");
        ResearchAi::new(Arc::clone(&self.llm))
            .with_system_prompt(system_prompt)
            .generate_summary(&config.query, learnings)
            .await
    }
}
