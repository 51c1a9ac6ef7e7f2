//! Prompt selection.
//!
//! Prompts are plain markdown files read as text. Nothing loaded here is ever
//! executed.
//!
//! Layout of a [`FilePromptStore`] root:
//!
//! ```text
//! prompts/
//! ├── research/
//! │   ├── active.md      <- selected by default
//! │   └── academic.md
//! └── terminal/
//!     └── active.md
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ResearchError;

/// Name of the prompt used when none has been selected for a kind.
pub const DEFAULT_SELECTION: &str = "active";

const PROMPT_EXTENSION: &str = "md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Research,
    Terminal,
}

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKind::Research => "research",
            PromptKind::Terminal => "terminal",
        }
    }
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supplies the active prompt text for a kind.
///
/// `Ok(None)` means nothing is configured; callers fall back to a built-in prompt.
#[async_trait]
pub trait PromptSource: Send + Sync {
    async fn active_prompt(&self, kind: PromptKind) -> Result<Option<String>, ResearchError>;
}

/// Never has a prompt configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPrompts;

#[async_trait]
impl PromptSource for DefaultPrompts {
    async fn active_prompt(&self, _kind: PromptKind) -> Result<Option<String>, ResearchError> {
        Ok(None)
    }
}

/// Prompts stored as `<root>/<kind>/<name>.md`.
#[derive(Debug, Clone)]
pub struct FilePromptStore {
    root: PathBuf,
    selected: HashMap<PromptKind, String>,
}

impl FilePromptStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            selected: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Select `name` as the active prompt for `kind`.
    ///
    /// Names are bare file stems; anything that could escape the kind's
    /// directory is rejected.
    pub fn with_selected(mut self, kind: PromptKind, name: impl Into<String>) -> Result<Self, ResearchError> {
        let name = name.into();
        validate_name(&name)?;
        self.selected.insert(kind, name);
        Ok(self)
    }

    pub fn selected(&self, kind: PromptKind) -> &str {
        self.selected.get(&kind).map(String::as_str).unwrap_or(DEFAULT_SELECTION)
    }

    pub fn prompt_path(&self, kind: PromptKind) -> PathBuf {
        self.root
            .join(kind.as_str())
            .join(format!("{}.{}", self.selected(kind), PROMPT_EXTENSION))
    }

    /// Names of the prompts stored for `kind`, sorted. Empty if the directory is missing.
    pub async fn list(&self, kind: PromptKind) -> Result<Vec<String>, ResearchError> {
        let dir = self.root.join(kind.as_str());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PROMPT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl PromptSource for FilePromptStore {
    async fn active_prompt(&self, kind: PromptKind) -> Result<Option<String>, ResearchError> {
        let path = self.prompt_path(kind);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                debug!(path = %path.display(), chars = text.len(), "Loaded prompt");
                Ok(Some(text))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No prompt file");
                Ok(None)
            }
            Err(e) => Err(ResearchError::Prompt(format!("{}: {}", path.display(), e))),
        }
    }
}

fn validate_name(name: &str) -> Result<(), ResearchError> {
    let bad = name.trim().is_empty()
        || name.contains(['/', '\\'])
        || name == "."
        || name == ".."
        || name.starts_with('.');
    if bad {
        return Err(ResearchError::Prompt(format!("invalid prompt name: {:?}", name)));
    }
    Ok(())
}
