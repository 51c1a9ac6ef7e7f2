//! LLM completion capability.
//!
//! ```text
//! ResearchAi ──uses──▶ LlmProvider (trait) ◀──implements── VeniceClient
//!                                                   │
//!                                                   ├─ model registry (context caps)
//!                                                   └─ RetryPolicy (429 hints, 5xx backoff)
//! ```

mod config;
mod models;
mod provider;
mod venice;

pub use config::{LlmConfig, LlmRetryConfig, DEFAULT_BASE_URL};
pub use models::{
    available_models, is_valid_model, model_spec, suggest_model, ModelRequirements, ModelSpec,
    DEFAULT_MODEL, VENICE_MODELS,
};
pub use provider::{Completion, CompletionRequest, LlmProvider, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
pub use venice::VeniceClient;
