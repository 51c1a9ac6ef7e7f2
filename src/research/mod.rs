//! The research core.
//!
//! ```text
//! ResearchEngine::research(config)
//!   └─ ResearchPath::research()
//!        ├─ ResearchAi::generate_queries(query, breadth)
//!        └─ for each query, in order:
//!             process_query ── search ─▶ process_results ─▶ follow-up (depth - 1, ceil(breadth / 2))
//! ```

pub mod engine;
pub mod generator;
pub mod path;
pub mod processor;
pub mod progress;
pub mod prompts;

pub use engine::{ResearchConfig, ResearchEngine, ResearchResult};
pub use generator::{ProcessedResults, ResearchAi, SUMMARY_FALLBACK};
pub use path::{clean_query, dedupe, trim_prompt, ResearchPath, ResearchSettings};
pub use processor::{
    LearningProcessor, ProcessedResponse, ProcessorOutput, Query, QueryProcessor, ReportProcessor, ResponseKind,
    ResponseProcessor,
};
pub use progress::{total_queries_for, ProgressCallback, ResearchProgress};
