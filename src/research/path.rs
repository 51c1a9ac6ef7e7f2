//! One research run: initial query fan-out, then a depth-first chain of
//! search, extract and follow-up per branch.
//!
//! Everything runs strictly in sequence. Results from branch `i`, including
//! its whole follow-up chain, are resolved before branch `i + 1` starts, so a
//! single search rate limit is respected across the run.

use regex::Regex;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::engine::ResearchResult;
use super::generator::ResearchAi;
use super::progress::{ProgressCallback, ResearchProgress};
use crate::error::{ResearchError, SearchError};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::search::SearchProvider;

static QUERY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(what are |tell me about |explain |describe )").expect("valid query prefix regex")
});
static TRAILING_QUESTION_MARKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?+$").expect("valid question mark regex"));

/// Timing and sizing knobs for a research run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchSettings {
    /// Pause between top-level branches (not after the last one)
    pub inter_query_delay: Duration,

    /// Retries for a search that keeps hitting the rate limit
    pub query_retry: RetryPolicy,

    /// Each search result's content is cut to this many characters
    pub max_content_chars: usize,

    /// Learnings requested from each batch of search results
    pub learnings_per_query: usize,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            inter_query_delay: Duration::from_secs(5),
            query_retry: RetryPolicy::with_retries(3, Duration::from_secs(10)),
            max_content_chars: 25_000,
            learnings_per_query: 3,
        }
    }
}

/// What one query contributed to its branch.
struct QueryOutcome {
    learnings: Vec<String>,
    sources: Vec<String>,
    follow_up_questions: Vec<String>,
}

/// Controller for one research run.
pub struct ResearchPath {
    query: String,
    depth: usize,
    breadth: usize,
    search: Arc<dyn SearchProvider>,
    ai: ResearchAi,
    settings: ResearchSettings,
    progress: ResearchProgress,
    on_progress: Option<ProgressCallback>,
}

impl ResearchPath {
    pub fn new(
        query: impl Into<String>,
        depth: usize,
        breadth: usize,
        search: Arc<dyn SearchProvider>,
        ai: ResearchAi,
    ) -> Self {
        Self {
            query: query.into(),
            depth,
            breadth,
            search,
            ai,
            settings: ResearchSettings::default(),
            progress: ResearchProgress::new(depth, breadth),
            on_progress: None,
        }
    }

    pub fn with_settings(mut self, settings: ResearchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn progress(&self) -> &ResearchProgress {
        &self.progress
    }

    /// Run every branch and merge their results.
    ///
    /// Branch failures become placeholder learnings. An exhausted search rate
    /// limit is the only error returned, and it stops the run.
    pub async fn research(&mut self) -> Result<ResearchResult, ResearchError> {
        info!(query = %self.query, depth = self.depth, breadth = self.breadth, "Starting research");

        let queries = self.ai.generate_queries(&self.query, self.breadth, &[]).await;
        if queries.is_empty() {
            warn!(query = %self.query, "No initial queries generated");
            return Ok(ResearchResult::attempted(&self.query));
        }

        self.progress.current_query = Some(queries[0].query.clone());
        self.notify();

        let mut branches = Vec::with_capacity(queries.len());
        for (i, query) in queries.iter().enumerate() {
            debug!(index = i, query = %query.query, goal = %query.research_goal, "Starting branch");
            let result = self
                .process_query(&query.query, self.depth, self.breadth, Vec::new(), Vec::new())
                .await?;
            branches.push(result);

            if i + 1 < queries.len() && !self.settings.inter_query_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_query_delay).await;
            }
        }

        let result = ResearchResult::merge(branches);
        info!(
            learnings = result.learnings.len(),
            sources = result.sources.len(),
            "Research finished"
        );
        Ok(result)
    }

    /// Follow one branch from `query` down to depth 0.
    ///
    /// `learnings` and `sources` are what shallower levels already found; each
    /// level appends to them. A non-rate-limit failure at any level ends the
    /// branch with a single `Error researching: <query>` learning.
    pub async fn process_query(
        &mut self,
        query: &str,
        depth: usize,
        breadth: usize,
        learnings: Vec<String>,
        sources: Vec<String>,
    ) -> Result<ResearchResult, ResearchError> {
        let mut query = query.to_string();
        let mut depth = depth;
        let mut breadth = breadth;
        let mut learnings = learnings;
        let mut sources = sources;

        loop {
            let next_breadth = breadth.div_ceil(2);
            let next_depth = depth.saturating_sub(1);

            let outcome = match self.run_query(&query, next_breadth).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_rate_limit() => return Err(e),
                Err(e) => {
                    error!(query = %query, error = %e, "Research branch failed");
                    return Ok(ResearchResult {
                        learnings: vec![format!("Error researching: {}", query)],
                        sources: Vec::new(),
                    });
                }
            };

            learnings.extend(outcome.learnings);
            sources.extend(outcome.sources);
            self.progress.record_completed(&query, depth, breadth);
            self.notify();

            if next_depth == 0 {
                return Ok(ResearchResult { learnings, sources });
            }

            let next_query = outcome
                .follow_up_questions
                .into_iter()
                .next()
                .unwrap_or_else(|| format!("Tell me more about {}", clean_query(&query)));
            info!(depth = next_depth, breadth = next_breadth, next = %next_query, "Researching deeper");

            query = next_query;
            depth = next_depth;
            breadth = next_breadth;
        }
    }

    /// Search for `query` and extract learnings plus `num_follow_ups` questions.
    async fn run_query(&self, query: &str, num_follow_ups: usize) -> Result<QueryOutcome, ResearchError> {
        let results = self
            .settings
            .query_retry
            .run(
                "research_search",
                |_| self.search.search(query),
                |e: &SearchError| {
                    if e.is_rate_limit() {
                        warn!(query = %query, "Rate limited at research level");
                        RetryDecision::Backoff
                    } else {
                        RetryDecision::Stop
                    }
                },
            )
            .await
            .map_err(|e| ResearchError::Search(e.into_inner()))?;

        let contents: Vec<String> = results
            .iter()
            .filter_map(|r| r.usable_content())
            .map(|c| trim_prompt(c, self.settings.max_content_chars).to_string())
            .collect();
        let sources: Vec<String> = results
            .iter()
            .filter_map(|r| r.usable_source())
            .map(str::to_string)
            .collect();
        info!(query = %query, results = contents.len(), "Ran search");

        let processed = self
            .ai
            .process_results(query, &contents, self.settings.learnings_per_query, num_follow_ups)
            .await;

        Ok(QueryOutcome {
            learnings: processed.learnings,
            sources,
            follow_up_questions: processed.follow_up_questions,
        })
    }

    fn notify(&self) {
        if let Some(callback) = &self.on_progress {
            if catch_unwind(AssertUnwindSafe(|| callback(&self.progress))).is_err() {
                warn!("Progress callback panicked; continuing research");
            }
        }
    }
}

/// Strip a leading "what are" / "tell me about" / "explain" / "describe" and
/// trailing question marks.
pub fn clean_query(query: &str) -> String {
    let query = QUERY_PREFIX.replace(query, "");
    let query = TRAILING_QUESTION_MARKS.replace(&query, "");
    query.trim().to_string()
}

/// At most `max_chars` characters of `text`.
pub fn trim_prompt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Remove duplicates, keeping the first occurrence of each item.
pub fn dedupe(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{Completion, CompletionRequest, LlmProvider};
    use crate::search::SearchResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&str) -> Result<Vec<SearchResult>, SearchError> + Send + Sync>;

    struct StubSearch {
        respond: Responder,
        calls: Mutex<Vec<String>>,
    }

    impl StubSearch {
        fn new(respond: impl Fn(&str) -> Result<Vec<SearchResult>, SearchError> + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                respond: Box::new(respond),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn one_hit() -> Arc<Self> {
            Self::new(|q| Ok(vec![SearchResult::new(q, format!("Content for {q}"), format!("https://example.com/{}", q.len()))]))
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchProvider for StubSearch {
        async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
            self.calls.lock().unwrap().push(query.to_string());
            (self.respond)(query)
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    /// Answers query-expansion prompts with `initial` and extraction prompts
    /// with one learning per query, plus a follow-up when `follow_ups` is set.
    struct StubLlm {
        initial: String,
        follow_ups: bool,
    }

    impl StubLlm {
        fn new(initial: &str, follow_ups: bool) -> Arc<Self> {
            Arc::new(Self {
                initial: initial.to_string(),
                follow_ups,
            })
        }
    }

    fn quoted(prompt: &str) -> &str {
        prompt.split('"').nth(1).unwrap_or_default()
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
            let content = if request.prompt.starts_with("Expand the research scope") {
                self.initial.clone()
            } else {
                let query = quoted(&request.prompt).trim_end_matches('?');
                let mut answer = format!("Key Learnings:\nLearned fact regarding {query}");
                if self.follow_ups {
                    answer.push_str(&format!("\nFollow-up Questions:\nWhat follows {query}?"));
                }
                answer
            };
            Ok(Completion::new(content, "stub"))
        }

        fn name(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-v1"
        }
    }

    fn path(query: &str, depth: usize, breadth: usize, search: Arc<StubSearch>, llm: Arc<StubLlm>) -> ResearchPath {
        ResearchPath::new(query, depth, breadth, search, ResearchAi::new(llm))
    }

    #[tokio::test(start_paused = true)]
    async fn test_branch_failure_is_isolated() {
        let search = StubSearch::new(|q| {
            if q.contains("broken") {
                Err(SearchError::api("stub", Some(500), "boom"))
            } else {
                Ok(vec![SearchResult::new(q, "Some content", format!("https://example.com/{q}"))])
            }
        });
        let llm = StubLlm::new("What is alpha?\nWhat is broken?\nWhat is gamma?", false);

        let result = path("topic", 1, 3, search.clone(), llm).research().await.unwrap();

        assert_eq!(
            result.learnings,
            vec![
                "Learned fact regarding What is alpha",
                "Error researching: What is broken?",
                "Learned fact regarding What is gamma",
            ]
        );
        assert_eq!(result.sources.len(), 2);
        assert_eq!(search.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_up_chain_accumulates() {
        let search = StubSearch::one_hit();
        let llm = StubLlm::new("What is alpha?", true);
        let mut path = path("topic", 2, 1, search.clone(), llm);

        let result = path.process_query("What is alpha?", 2, 1, vec!["seed learning".into()], Vec::new()).await.unwrap();

        assert_eq!(search.calls(), vec!["What is alpha?", "What follows What is alpha?"]);
        assert_eq!(
            result.learnings,
            vec![
                "seed learning",
                "Learned fact regarding What is alpha",
                "Learned fact regarding What follows What is alpha",
            ]
        );
        assert_eq!(result.sources.len(), 2);
        assert_eq!(path.progress().completed_queries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_follow_up_uses_cleaned_query() {
        let search = StubSearch::one_hit();
        let llm = StubLlm::new("", false);
        let mut path = path("topic", 2, 2, search.clone(), llm);

        path.process_query("What are quantum computers??", 2, 2, Vec::new(), Vec::new()).await.unwrap();

        assert_eq!(search.calls()[1], "Tell me more about quantum computers");
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_reported_and_capped() {
        let search = StubSearch::one_hit();
        let llm = StubLlm::new("What is alpha?\nWhat is beta?", true);
        let seen: Arc<Mutex<Vec<ResearchProgress>>> = Arc::default();
        let sink = seen.clone();

        let mut path = path("topic", 2, 2, search.clone(), llm)
            .with_progress_callback(Arc::new(move |p: &ResearchProgress| sink.lock().unwrap().push(p.clone())));
        assert_eq!(path.progress().total_queries, 3);

        path.research().await.unwrap();

        let seen = seen.lock().unwrap();
        // initial notification plus one per executed query
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[0].completed_queries, 0);
        assert_eq!(seen[0].current_query.as_deref(), Some("What is alpha?"));
        let completed: Vec<usize> = seen.iter().map(|p| p.completed_queries).collect();
        assert_eq!(completed, vec![0, 1, 2, 3, 3]);
        assert!(seen.iter().all(|p| p.completed_queries <= p.total_queries));
        assert_eq!(search.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_callback_does_not_abort() {
        let llm = StubLlm::new("What is alpha?", false);
        let mut path = path("topic", 1, 1, StubSearch::one_hit(), llm)
            .with_progress_callback(Arc::new(|_: &ResearchProgress| panic!("listener bug")));

        let result = path.research().await.unwrap();
        assert_eq!(result.learnings, vec!["Learned fact regarding What is alpha"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retried_then_recovers() {
        let attempts: Arc<Mutex<HashMap<String, usize>>> = Arc::default();
        let counter = attempts.clone();
        let search = StubSearch::new(move |q| {
            let mut counts = counter.lock().unwrap();
            let n = counts.entry(q.to_string()).or_default();
            *n += 1;
            if *n <= 2 {
                Err(SearchError::rate_limit("stub", "slow down"))
            } else {
                Ok(vec![SearchResult::new(q, "Recovered content", "https://example.com")])
            }
        });
        let llm = StubLlm::new("What is alpha?", false);

        let start = tokio::time::Instant::now();
        let result = path("topic", 1, 1, search.clone(), llm).research().await.unwrap();

        assert_eq!(result.learnings, vec!["Learned fact regarding What is alpha"]);
        assert_eq!(search.calls().len(), 3);
        // 10s + 20s of backoff
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_rate_limit_propagates() {
        let search = StubSearch::new(|_| Err(SearchError::rate_limit("stub", "slow down")));
        let llm = StubLlm::new("What is alpha?\nWhat is beta?", false);

        let err = path("topic", 1, 2, search.clone(), llm).research().await.unwrap_err();

        assert!(err.is_rate_limit());
        // first branch only: one attempt plus three retries
        assert_eq!(search.calls(), vec!["What is alpha?"; 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_initial_queries_is_degenerate() {
        let llm = StubLlm::new("", false);
        let search = StubSearch::one_hit();

        let result = path("quantum computing", 2, 2, search.clone(), llm).research().await.unwrap();

        assert_eq!(result.learnings, vec!["Research attempted on: quantum computing"]);
        assert!(result.sources.is_empty());
        assert!(search.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_is_trimmed_and_blank_hits_skipped() {
        let search = StubSearch::new(|_| {
            let mut blank = SearchResult::new("Blank", "", "");
            blank.content = None;
            Ok(vec![SearchResult::new("Long", "x".repeat(100), "https://long.example"), blank])
        });
        let path = path("topic", 1, 1, search, StubLlm::new("", false)).with_settings(ResearchSettings {
            max_content_chars: 10,
            ..Default::default()
        });

        let outcome = path.run_query("What is alpha?", 1).await.unwrap();
        assert_eq!(outcome.sources, vec!["https://long.example"]);
        assert_eq!(outcome.learnings, vec!["Learned fact regarding What is alpha"]);
    }

    #[test]
    fn test_clean_query() {
        assert_eq!(clean_query("What are black holes?"), "black holes");
        assert_eq!(clean_query("tell me about Rust???"), "Rust");
        assert_eq!(clean_query("Describe the moon"), "the moon");
        assert_eq!(clean_query("How do magnets work?"), "How do magnets work");
    }

    #[test]
    fn test_trim_prompt_respects_char_boundaries() {
        assert_eq!(trim_prompt("héllo wörld", 5), "héllo");
        assert_eq!(trim_prompt("short", 100), "short");
        assert_eq!(trim_prompt("", 3), "");
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let items: Vec<String> = ["b", "a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        let once = dedupe(items);
        assert_eq!(once, vec!["b", "a", "c"]);
        assert_eq!(dedupe(once.clone()), once);
    }
}
