//! Markdown research reports.

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;

use crate::research::ResearchResult;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

const MAX_SLUG_CHARS: usize = 50;

/// Slug for queries with no ASCII letters or digits
const FALLBACK_SLUG: &str = "query";

/// A finished run plus its parameters, ready to be saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    pub query: String,
    pub depth: usize,
    pub breadth: usize,
    pub summary: Option<String>,
    pub learnings: Vec<String>,
    pub sources: Vec<String>,
    pub tags: Vec<String>,
    pub date: DateTime<Utc>,
}

impl ResearchReport {
    pub fn new(query: impl Into<String>, depth: usize, breadth: usize, result: ResearchResult) -> Self {
        let query = query.into();
        let tags = vec![
            "research".to_string(),
            query.split_whitespace().next().unwrap_or_default().to_lowercase(),
            "ai-generated".to_string(),
        ];

        Self {
            query,
            depth,
            breadth,
            summary: None,
            learnings: result.learnings,
            sources: result.sources,
            tags,
            date: Utc::now(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    /// Query reduced to lowercase alphanumeric words joined by `-`.
    pub fn slug(&self) -> String {
        let lower = self.query.to_lowercase();
        let slug = NON_ALPHANUMERIC.replace_all(&lower, "-");
        let slug: String = slug.trim_matches('-').chars().take(MAX_SLUG_CHARS).collect();
        let slug = slug.trim_end_matches('-');
        if slug.is_empty() {
            FALLBACK_SLUG.to_string()
        } else {
            slug.to_string()
        }
    }

    /// `<slug>-<timestamp>`, unique per run.
    pub fn id(&self) -> String {
        let timestamp = self
            .date
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        format!("{}-{}", self.slug(), timestamp)
    }

    pub fn file_name(&self) -> String {
        format!("research-{}.md", self.id())
    }

    pub fn to_markdown(&self) -> String {
        let mut lines = vec![
            "# Research Results".to_string(),
            "----------------\n".to_string(),
            "## Research Parameters".to_string(),
            format!("- Query: {}", self.query),
            format!("- Depth: {}", self.depth),
            format!("- Breadth: {}", self.breadth),
            format!("- Date: {}", self.date.to_rfc3339_opts(SecondsFormat::Millis, true)),
            String::new(),
        ];

        if let Some(summary) = &self.summary {
            lines.push("## Summary".to_string());
            lines.push(summary.clone());
            lines.push(String::new());
        }

        lines.push("## Key Learnings".to_string());
        lines.extend(self.learnings.iter().enumerate().map(|(i, l)| format!("{}. {}", i + 1, l)));
        lines.push(String::new());

        lines.push("## Sources".to_string());
        lines.extend(self.sources.iter().map(|s| format!("- {}", s)));
        lines.push(String::new());

        lines.push("## Tags".to_string());
        lines.push(self.tags.join(", "));

        lines.join("\n")
    }

    /// Write the markdown report into `dir`, creating it if needed.
    pub async fn save(&self, dir: &Path) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(self.file_name());
        tokio::fs::write(&path, self.to_markdown()).await?;
        info!(path = %path.display(), "Research saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report(query: &str) -> ResearchReport {
        let result = ResearchResult {
            learnings: vec!["Qubits exploit superposition.".into(), "Error correction is costly.".into()],
            sources: vec!["https://example.com/a".into()],
        };
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        ResearchReport::new(query, 2, 3, result).with_date(date)
    }

    #[test]
    fn test_tags() {
        assert_eq!(report("Quantum computing basics").tags, vec!["research", "quantum", "ai-generated"]);
    }

    #[test]
    fn test_slug_and_file_name() {
        let r = report("  What's new in Rust 2024?! ");
        assert_eq!(r.slug(), "what-s-new-in-rust-2024");
        assert_eq!(r.file_name(), "research-what-s-new-in-rust-2024-2024-03-01T12-30-05-000Z.md");

        let long = report(&"abc ".repeat(30));
        assert_eq!(long.slug().len(), MAX_SLUG_CHARS);
        assert!(!long.slug().starts_with('-'));
    }

    #[test]
    fn test_slug_without_ascii_alphanumerics() {
        let r = report("量子计算");
        assert_eq!(r.slug(), "query");
        assert_eq!(r.file_name(), "research-query-2024-03-01T12-30-05-000Z.md");

        assert_eq!(report("?!? ...").slug(), "query");
    }

    #[test]
    fn test_markdown_sections() {
        let md = report("Quantum computing").with_summary("A short narrative.").to_markdown();
        assert!(md.starts_with("# Research Results"));
        assert!(md.contains("- Query: Quantum computing\n- Depth: 2\n- Breadth: 3"));
        assert!(md.contains("## Summary\nA short narrative.\n"));
        assert!(md.contains("## Key Learnings\n1. Qubits exploit superposition.\n2. Error correction is costly."));
        assert!(md.contains("## Sources\n- https://example.com/a"));
        assert!(md.ends_with("## Tags\nresearch, quantum, ai-generated"));
    }

    #[test]
    fn test_markdown_without_summary() {
        let md = report("Quantum computing").to_markdown();
        assert!(!md.contains("## Summary"));
    }

    #[tokio::test]
    async fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let r = report("Quantum computing");
        let path = r.save(&dir.path().join("out")).await.unwrap();
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), r.file_name());
        assert_eq!(std::fs::read_to_string(path).unwrap(), r.to_markdown());
    }
}
