//! LLM-backed research steps: query generation, learning extraction and
//! summary writing.
//!
//! None of these fail outward. LLM and parsing failures are logged and turned
//! into empty (or placeholder) results so the research loop can keep going.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::processor::{ProcessedResponse, Query, ResponseKind};
use super::prompts::{self, STRUCTURE_REMINDER};
use crate::error::ResearchError;
use crate::llm::{CompletionRequest, LlmProvider};

/// Returned by [`ResearchAi::generate_summary`] when no summary could be produced.
pub const SUMMARY_FALLBACK: &str = "Failed to generate summary.";

const QUERY_TEMPERATURE: f32 = 0.7;
const QUERY_MAX_TOKENS: u32 = 1_000;
const EXTRACTION_TEMPERATURE: f32 = 0.5;
const SUMMARY_TEMPERATURE: f32 = 0.7;
const SUMMARY_MAX_TOKENS: u32 = 4_000;
const RETRY_TEMPERATURE: f32 = 0.5;

/// Learnings and follow-up questions extracted from one batch of search content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedResults {
    pub learnings: Vec<String>,
    pub follow_up_questions: Vec<String>,
}

/// Research-specific LLM operations.
#[derive(Clone)]
pub struct ResearchAi {
    llm: Arc<dyn LlmProvider>,
    system_prompt: String,
}

impl std::fmt::Debug for ResearchAi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchAi")
            .field("provider", &self.llm.name())
            .field("model", &self.llm.model())
            .field("system_prompt_chars", &self.system_prompt.len())
            .finish()
    }
}

impl ResearchAi {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            system_prompt: prompts::default_system_prompt().to_string(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Complete `prompt` and parse it as `kind`.
    ///
    /// An unparseable first answer gets one more attempt with a reminder to
    /// keep the output line-structured.
    async fn generate(
        &self,
        kind: ResponseKind,
        prompt: String,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<ProcessedResponse, ResearchError> {
        let mut request = CompletionRequest::new(&self.system_prompt, prompt).with_temperature(temperature);
        if let Some(max_tokens) = max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let completion = self.llm.complete(&request).await?;
        let first = kind.process(&completion.content);
        if first.success {
            return Ok(first.response);
        }

        debug!(?kind, error = ?first.error, "Unparseable response, asking again with structure reminder");
        let retry = CompletionRequest::new(
            &self.system_prompt,
            format!("{}\n\n{}", request.prompt, STRUCTURE_REMINDER),
        )
        .with_temperature(RETRY_TEMPERATURE);

        let completion = self.llm.complete(&retry).await?;
        let second = kind.process(&completion.content);
        if second.success {
            return Ok(second.response);
        }

        Err(ResearchError::Processing(format!(
            "Failed to process response: {}",
            first.error.unwrap_or_default()
        )))
    }

    /// Up to `num_queries` follow-up queries for `query`. Empty on any failure.
    pub async fn generate_queries(&self, query: &str, num_queries: usize, learnings: &[String]) -> Vec<Query> {
        let prompt = prompts::query_expansion_prompt(query, learnings);

        match self
            .generate(ResponseKind::Query, prompt, QUERY_TEMPERATURE, Some(QUERY_MAX_TOKENS))
            .await
        {
            Ok(ProcessedResponse::Queries { mut queries }) => {
                queries.truncate(num_queries);
                debug!(query = %query, count = queries.len(), "Generated queries");
                queries
            }
            Ok(other) => {
                warn!(kind = ?other.kind(), "Query generation returned the wrong response kind");
                Vec::new()
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Query generation failed");
                Vec::new()
            }
        }
    }

    /// Learnings and follow-up questions from `contents`, each capped at the
    /// requested count. Empty on any failure.
    pub async fn process_results(
        &self,
        query: &str,
        contents: &[String],
        num_learnings: usize,
        num_follow_up_questions: usize,
    ) -> ProcessedResults {
        let prompt = prompts::extraction_prompt(query, contents, num_learnings, num_follow_up_questions);
        debug!(query = %query, chunks = contents.len(), prompt_chars = prompt.len(), "Extracting learnings");

        match self
            .generate(ResponseKind::Learning, prompt, EXTRACTION_TEMPERATURE, None)
            .await
        {
            Ok(ProcessedResponse::Learnings {
                mut learnings,
                mut follow_up_questions,
            }) => {
                learnings.truncate(num_learnings);
                follow_up_questions.truncate(num_follow_up_questions);
                ProcessedResults {
                    learnings,
                    follow_up_questions,
                }
            }
            Ok(other) => {
                warn!(kind = ?other.kind(), "Result processing returned the wrong response kind");
                ProcessedResults::default()
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Result processing failed");
                ProcessedResults::default()
            }
        }
    }

    /// Narrative summary of `learnings`, or [`SUMMARY_FALLBACK`].
    pub async fn generate_summary(&self, query: &str, learnings: &[String]) -> String {
        let prompt = prompts::summary_prompt(query, learnings);

        match self
            .generate(ResponseKind::Report, prompt, SUMMARY_TEMPERATURE, Some(SUMMARY_MAX_TOKENS))
            .await
        {
            Ok(ProcessedResponse::Report { report_markdown }) => report_markdown,
            Ok(other) => {
                warn!(kind = ?other.kind(), "Summary generation returned the wrong response kind");
                SUMMARY_FALLBACK.to_string()
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Summary generation failed");
                SUMMARY_FALLBACK.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::Completion;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned answers in order and records every request.
    struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()));
            reply.map(|content| Completion::new(content, "scripted"))
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-v1"
        }
    }

    #[tokio::test]
    async fn test_generate_queries_truncates() {
        let llm = ScriptedLlm::new(vec![Ok("What is A?\nHow is B?\nWhy C?".into())]);
        let ai = ResearchAi::new(llm.clone());

        let queries = ai.generate_queries("topic", 2, &[]).await;

        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].query, "What is A?");
        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, QUERY_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_generate_queries_uses_learnings_and_system_prompt() {
        let llm = ScriptedLlm::new(vec![Ok("What next?".into())]);
        let ai = ResearchAi::new(llm.clone()).with_system_prompt("custom system");

        ai.generate_queries("topic", 3, &["known fact".to_string()]).await;

        let request = &llm.requests()[0];
        assert_eq!(request.system, "custom system");
        assert!(request.prompt.contains("• known fact"));
    }

    #[tokio::test]
    async fn test_generate_queries_llm_error_is_empty() {
        let llm = ScriptedLlm::new(vec![Err(LlmError::Timeout)]);
        let ai = ResearchAi::new(llm);
        assert!(ai.generate_queries("topic", 3, &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_generate_queries_unparseable_twice_is_empty() {
        let llm = ScriptedLlm::new(vec![Ok("\n  \n".into()), Ok("   ".into())]);
        let ai = ResearchAi::new(llm.clone());

        let queries = ai.generate_queries("topic", 3, &[]).await;

        assert!(queries.is_empty());
        assert_eq!(llm.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_unparseable_answer_retried_with_reminder() {
        let llm = ScriptedLlm::new(vec![
            Ok("   ".into()),
            Ok("Key Learnings:\nThe second answer contains a real learning.".into()),
        ]);
        let ai = ResearchAi::new(llm.clone());

        let results = ai.process_results("topic", &["content".into()], 3, 2).await;

        assert_eq!(results.learnings, vec!["The second answer contains a real learning."]);
        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].prompt.ends_with(STRUCTURE_REMINDER));
        assert!((requests[1].temperature - RETRY_TEMPERATURE).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_process_results_caps_counts() {
        let answer = "Key Learnings:\n\
            1. First learning statement that is long enough.\n\
            2. Second learning statement that is long enough.\n\
            Follow-up Questions:\n\
            - What is first?\n\
            - What is second?";
        let ai = ResearchAi::new(ScriptedLlm::new(vec![Ok(answer.into())]));

        let results = ai.process_results("topic", &["content".into()], 1, 1).await;

        assert_eq!(results.learnings, vec!["First learning statement that is long enough."]);
        assert_eq!(results.follow_up_questions, vec!["What is first?"]);
    }

    #[tokio::test]
    async fn test_process_results_failure_is_empty() {
        let ai = ResearchAi::new(ScriptedLlm::new(vec![Ok("meh".into()), Ok("nope".into())]));
        let results = ai.process_results("topic", &[], 3, 3).await;
        assert_eq!(results, ProcessedResults::default());
    }

    #[tokio::test]
    async fn test_generate_summary() {
        let ai = ResearchAi::new(ScriptedLlm::new(vec![Ok("A narrative summary.".into())]));
        assert_eq!(ai.generate_summary("topic", &["x".into()]).await, "A narrative summary.");

        let failing = ResearchAi::new(ScriptedLlm::new(vec![Err(LlmError::Timeout)]));
        assert_eq!(failing.generate_summary("topic", &[]).await, SUMMARY_FALLBACK);
    }
}
