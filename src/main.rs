//! # COREAI Research
//!
//! Command-line front end for the research engine.
//!
//! This binary demonstrates:
//! - Wiring trait objects (search, LLM, prompt store) into an engine
//! - CLI design with clap, including env-var fallbacks
//! - Structured logging with tracing
//! - Application-level error handling with anyhow
//!
//! ## Quick Start
//! ```bash
//! export VENICE_API_KEY=... BRAVE_API_KEY=...
//! cargo run -- --depth 2 --breadth 3 "quantum error correction"
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Configuration management
mod config;

// =============================================================================
// IMPORTS
// =============================================================================
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use coreai_research::llm::{LlmConfig, VeniceClient};
use coreai_research::prompts::{DefaultPrompts, FilePromptStore, PromptSource};
use coreai_research::research::{ProgressCallback, ResearchConfig, ResearchEngine, ResearchProgress};
use coreai_research::search::BraveSearchProvider;
use coreai_research::ResearchReport;

use crate::config::Config;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
/// # Rust Concept: Option<T> for overrides
///
/// Every tuning flag is an `Option`. `None` means "keep whatever the
/// environment / defaults said", so the CLI only overrides what the user typed.
#[derive(Parser, Debug)]
#[command(
    name = "coreai-research",
    version,
    about = "Recursive web research: search, extract learnings, follow up, summarize",
    long_about = r#"
COREAI Research - iterative web research with an LLM.

Starting from your query, the tool generates BREADTH search queries and follows
each one DEPTH levels deep. At every level it searches the web (Brave), extracts
learnings and follow-up questions (Venice), and continues with half the breadth.

REQUIRED ENVIRONMENT:
  VENICE_API_KEY   Venice chat completions
  BRAVE_API_KEY    Brave web search

EXAMPLES:
  # Default depth 2, breadth 3
  coreai-research "history of the transistor"

  # Wider, shallower, saved to ./research
  coreai-research -d 1 -b 6 -o research "battery chemistry trends"
"#
)]
struct Args {
    /// The research topic or question to investigate
    #[arg(value_name = "QUERY")]
    query: String,

    /// Follow-up levels per branch (overrides RESEARCH_DEPTH)
    #[arg(short = 'd', long = "depth")]
    depth: Option<usize>,

    /// Initial number of queries (overrides RESEARCH_BREADTH)
    #[arg(short = 'b', long = "breadth")]
    breadth: Option<usize>,

    /// Venice model to use
    #[arg(short = 'm', long = "model", env = "VENICE_MODEL")]
    model: Option<String>,

    /// Directory holding <kind>/active.md prompt files
    #[arg(long = "prompts-dir", env = "PROMPTS_DIR", value_name = "DIR")]
    prompts_dir: Option<PathBuf>,

    /// Also write the markdown report into this directory
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    output: Option<PathBuf>,

    /// Skip the narrative summary
    #[arg(long = "no-summary")]
    no_summary: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Args {
    /// Command-line values win over the environment.
    fn apply(&self, config: &mut Config) {
        if let Some(depth) = self.depth {
            config.depth = depth;
        }
        if let Some(breadth) = self.breadth {
            config.breadth = breadth;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(dir) = &self.prompts_dir {
            config.prompts_dir = Some(dir.clone());
        }
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    args.apply(&mut config);

    init_logging(args.verbose, &config.log_level)?;

    config.validate()?;
    let (venice_key, brave_key) = config.require_keys()?;

    info!(
        model = %config.model,
        depth = config.depth,
        breadth = config.breadth,
        "Configuration loaded"
    );

    // Build the services the engine depends on
    let search = BraveSearchProvider::new(brave_key)
        .context("Failed to create Brave search provider")?
        .with_base_url(&config.brave_base_url);

    let llm = VeniceClient::new(
        LlmConfig::new(venice_key)
            .with_model(&config.model)
            .with_base_url(&config.venice_base_url),
    )
    .context("Failed to create Venice client")?;

    let prompts: Arc<dyn PromptSource> = match &config.prompts_dir {
        Some(dir) => Arc::new(FilePromptStore::new(dir)),
        None => Arc::new(DefaultPrompts),
    };

    let engine = ResearchEngine::new(Arc::new(search), Arc::new(llm)).with_prompt_source(prompts);

    let research = ResearchConfig::new(&args.query, config.depth, config.breadth)
        .with_progress_callback(progress_logger());

    info!(query = %args.query, "Starting research");
    let result = engine.research(research.clone()).await;

    let mut report = ResearchReport::new(&args.query, config.depth, config.breadth, result);
    if !args.no_summary {
        let summary = engine.summarize(&research, &report.learnings).await;
        report = report.with_summary(summary);
    }

    println!("{}", report.to_markdown());

    if let Some(dir) = &args.output {
        let path = report
            .save(dir)
            .await
            .with_context(|| format!("Failed to write report to {}", dir.display()))?;
        eprintln!("Report saved to {}", path.display());
    }

    info!(
        learnings = report.learnings.len(),
        sources = report.sources.len(),
        "Research completed"
    );
    Ok(())
}

/// Progress callback that logs each update.
fn progress_logger() -> ProgressCallback {
    Arc::new(|progress: &ResearchProgress| {
        info!(
            percent = progress.percent(),
            completed = progress.completed_queries,
            total = progress.total_queries,
            depth = progress.current_depth,
            breadth = progress.current_breadth,
            query = progress.current_query.as_deref().unwrap_or(""),
            "Research progress"
        );
    })
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber for structured logging.
///
/// `--verbose` forces debug output; otherwise RUST_LOG (or its config value)
/// decides. Logs go to stderr so stdout carries only the report.
fn init_logging(verbose: bool, log_level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["test", "What is Rust?"]);
        assert_eq!(args.query, "What is Rust?");
        assert_eq!(args.depth, None);
        assert!(!args.no_summary);
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_with_flags() {
        let args = Args::parse_from([
            "test",
            "-d",
            "1",
            "--breadth",
            "5",
            "--model",
            "qwen32b",
            "--output",
            "out",
            "--no-summary",
            "--verbose",
            "Test query",
        ]);

        assert_eq!(args.query, "Test query");
        assert_eq!(args.depth, Some(1));
        assert_eq!(args.breadth, Some(5));
        assert_eq!(args.model.as_deref(), Some("qwen32b"));
        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert!(args.no_summary);
        assert!(args.verbose);
    }

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from(["test", "-d", "0", "-b", "7", "--prompts-dir", "prompts", "q"]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.depth, 0);
        assert_eq!(config.breadth, 7);
        assert_eq!(config.prompts_dir, Some(PathBuf::from("prompts")));
    }
}
