//! Turns raw LLM text into typed research data.
//!
//! LLM output is only loosely structured, so every processor works line by
//! line with forgiving heuristics. Malformed input never errors: it yields an
//! empty response of the right kind with `success == false` and a reason.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Leading list markers: `1.`, `-`, `*`, `•`, `12)` style prefixes.
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\-\*•]+[.)]?\s*").expect("valid list marker regex"));
static NUMBERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]?\.\s*").expect("valid numbered marker regex"));
static INTERROGATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(what|how|why|when|where|which)\b").expect("valid interrogative regex"));

/// Lines at or below this length are not treated as learnings.
const MIN_LEARNING_CHARS: usize = 20;

const LEARNING_HEADINGS: [&str; 3] = ["key learning", "insight", "finding"];
const QUESTION_HEADINGS: [&str; 2] = ["follow-up", "question"];

/// A generated search query and why it is worth running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub query: String,
    pub research_goal: String,
}

impl Query {
    pub fn new(query: impl Into<String>, research_goal: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            research_goal: research_goal.into(),
        }
    }
}

/// Which processor to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Query,
    Learning,
    Report,
}

impl ResponseKind {
    pub fn process(self, content: &str) -> ProcessorOutput {
        match self {
            ResponseKind::Query => QueryProcessor.process(content),
            ResponseKind::Learning => LearningProcessor.process(content),
            ResponseKind::Report => ReportProcessor.process(content),
        }
    }
}

/// Typed payload extracted from a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessedResponse {
    Queries {
        queries: Vec<Query>,
    },
    Learnings {
        learnings: Vec<String>,
        follow_up_questions: Vec<String>,
    },
    Report {
        report_markdown: String,
    },
}

impl ProcessedResponse {
    pub fn kind(&self) -> ResponseKind {
        match self {
            ProcessedResponse::Queries { .. } => ResponseKind::Query,
            ProcessedResponse::Learnings { .. } => ResponseKind::Learning,
            ProcessedResponse::Report { .. } => ResponseKind::Report,
        }
    }
}

/// Result of running a processor over one response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessorOutput {
    pub raw_content: String,
    pub success: bool,
    pub error: Option<String>,
    pub response: ProcessedResponse,
}

impl ProcessorOutput {
    fn ok(raw: &str, response: ProcessedResponse) -> Self {
        Self {
            raw_content: raw.to_string(),
            success: true,
            error: None,
            response,
        }
    }

    fn failed(raw: &str, error: &str, response: ProcessedResponse) -> Self {
        Self {
            raw_content: raw.to_string(),
            success: false,
            error: Some(error.to_string()),
            response,
        }
    }
}

pub trait ResponseProcessor {
    fn process(&self, content: &str) -> ProcessorOutput;
}

/// Strip list markers and surrounding whitespace from one line.
pub fn clean_line(line: &str) -> String {
    let line = line.trim();
    let line = LIST_MARKER.replace(line, "");
    let line = NUMBERED_MARKER.replace(&line, "");
    let line = line.strip_prefix('-').unwrap_or(&*line);
    line.trim().to_string()
}

/// Cleaned, non-empty lines.
pub fn extract_lines(text: &str) -> Vec<String> {
    text.lines().map(clean_line).filter(|l| !l.is_empty()).collect()
}

fn strip_trailing_question_mark(s: &str) -> &str {
    s.strip_suffix('?').unwrap_or(s)
}

/// Pulls interrogative questions out of a query-expansion answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryProcessor;

impl ResponseProcessor for QueryProcessor {
    fn process(&self, content: &str) -> ProcessorOutput {
        let lines = extract_lines(content);

        let questions: Vec<Query> = lines
            .iter()
            .filter(|l| l.contains('?') && INTERROGATIVE.is_match(l))
            .map(|q| Query::new(q.as_str(), format!("Research and analyze: {}", strip_trailing_question_mark(q))))
            .collect();

        if !questions.is_empty() {
            return ProcessorOutput::ok(content, ProcessedResponse::Queries { queries: questions });
        }

        // No questions: treat each statement as a topic to ask about.
        let synthesized: Vec<Query> = lines
            .iter()
            .filter(|l| !l.contains('?'))
            .map(|s| {
                Query::new(
                    format!("What are the details of {}?", s),
                    format!("Research and analyze: {}", s),
                )
            })
            .collect();

        if !synthesized.is_empty() {
            return ProcessorOutput::ok(content, ProcessedResponse::Queries { queries: synthesized });
        }

        ProcessorOutput::failed(
            content,
            "No valid questions or statements found",
            ProcessedResponse::Queries { queries: Vec::new() },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Learnings,
    Questions,
}

/// Recognize "Key Learnings:", "## Follow-up Questions" and similar headings.
fn section_heading(line: &str) -> Option<Section> {
    if line.contains('?') {
        return None;
    }

    let bare = line
        .trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim()
        .trim_end_matches(':')
        .trim_matches('*')
        .trim();

    let looks_like_heading = line.starts_with('#')
        || line.trim_end_matches('*').ends_with(':')
        || bare.split_whitespace().count() <= 4;
    if !looks_like_heading {
        return None;
    }

    let lower = bare.to_lowercase();
    if LEARNING_HEADINGS.iter().any(|k| lower.contains(k)) {
        Some(Section::Learnings)
    } else if QUESTION_HEADINGS.iter().any(|k| lower.contains(k)) {
        Some(Section::Questions)
    } else {
        None
    }
}

fn classify_line(line: &str, learnings: &mut Vec<String>, questions: &mut Vec<String>) {
    if line.contains('?') {
        questions.push(line.to_string());
    } else if line.chars().count() > MIN_LEARNING_CHARS {
        learnings.push(line.to_string());
    }
}

/// Splits an extraction answer into learnings and follow-up questions.
#[derive(Debug, Clone, Copy, Default)]
pub struct LearningProcessor;

impl ResponseProcessor for LearningProcessor {
    fn process(&self, content: &str) -> ProcessorOutput {
        let lines = extract_lines(content);
        let has_headings = lines.iter().any(|l| section_heading(l).is_some());

        let mut learnings = Vec::new();
        let mut questions = Vec::new();
        let mut section = None;

        for line in &lines {
            if let Some(heading) = section_heading(line) {
                section = Some(heading);
                continue;
            }
            // with headings present, text before the first one is preamble
            if has_headings && section.is_none() {
                continue;
            }
            classify_line(line, &mut learnings, &mut questions);
        }

        if learnings.is_empty() && questions.is_empty() {
            return ProcessorOutput::failed(
                content,
                "No valid learnings or questions found",
                ProcessedResponse::Learnings {
                    learnings,
                    follow_up_questions: questions,
                },
            );
        }

        ProcessorOutput::ok(
            content,
            ProcessedResponse::Learnings {
                learnings,
                follow_up_questions: questions,
            },
        )
    }
}

/// Passes narrative text through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportProcessor;

impl ResponseProcessor for ReportProcessor {
    fn process(&self, content: &str) -> ProcessorOutput {
        if content.trim().is_empty() {
            return ProcessorOutput::failed(
                content,
                "Empty content",
                ProcessedResponse::Report {
                    report_markdown: String::new(),
                },
            );
        }

        ProcessorOutput::ok(
            content,
            ProcessedResponse::Report {
                report_markdown: content.to_string(),
            },
        )
    }
}
