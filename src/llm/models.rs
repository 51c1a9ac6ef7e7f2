//! Registry of models served by the Venice API.

/// Static description of a supported model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: &'static str,
    /// Largest token budget a request may ask for
    pub available_context_tokens: u32,
    pub traits: &'static [&'static str],
    pub model_source: &'static str,
}

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b";

pub const VENICE_MODELS: &[ModelSpec] = &[
    ModelSpec {
        name: "llama-3.3-70b",
        available_context_tokens: 65_536,
        traits: &["function_calling_default", "default"],
        model_source: "https://huggingface.co/meta-llama/Llama-3.3-70B-Instruct",
    },
    ModelSpec {
        name: "llama-3.2-3b",
        available_context_tokens: 131_072,
        traits: &["fastest"],
        model_source: "https://huggingface.co/meta-llama/Llama-3.2-3B",
    },
    ModelSpec {
        name: "dolphin-2.9.2-qwen2-72b",
        available_context_tokens: 32_768,
        traits: &["most_uncensored"],
        model_source: "https://huggingface.co/cognitivecomputations/dolphin-2.9.2-qwen2-72b",
    },
    ModelSpec {
        name: "llama-3.1-405b",
        available_context_tokens: 63_920,
        traits: &["most_intelligent"],
        model_source: "https://huggingface.co/meta-llama/Meta-Llama-3.1-405B-Instruct",
    },
    ModelSpec {
        name: "qwen32b",
        available_context_tokens: 131_072,
        traits: &["default_code"],
        model_source: "https://huggingface.co/Qwen/Qwen2.5-Coder-32B-Instruct-GGUF",
    },
    ModelSpec {
        name: "deepseek-r1-llama-70b",
        available_context_tokens: 65_536,
        traits: &[],
        model_source: "https://huggingface.co/deepseek-ai/DeepSeek-R1-Distill-Llama-70B",
    },
    ModelSpec {
        name: "deepseek-r1-671b",
        available_context_tokens: 131_072,
        traits: &[],
        model_source: "https://huggingface.co/deepseek-ai/DeepSeek-R1",
    },
];

pub fn model_spec(name: &str) -> Option<&'static ModelSpec> {
    VENICE_MODELS.iter().find(|m| m.name == name)
}

pub fn is_valid_model(name: &str) -> bool {
    model_spec(name).is_some()
}

/// Comma-separated list of known model names, for error messages.
pub fn available_models() -> String {
    VENICE_MODELS.iter().map(|m| m.name).collect::<Vec<_>>().join(", ")
}

/// What a task needs from a model.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelRequirements {
    pub needs_function_calling: bool,
    pub needs_large_context: bool,
    pub needs_speed: bool,
    pub is_code_task: bool,
}

/// Pick a model for the given requirements.
///
/// Priority: code, then speed, then function calling, then large context.
pub fn suggest_model(req: ModelRequirements) -> &'static str {
    if req.is_code_task {
        "qwen32b"
    } else if req.needs_speed {
        "llama-3.2-3b"
    } else if req.needs_function_calling {
        "llama-3.3-70b"
    } else if req.needs_large_context {
        "llama-3.2-3b"
    } else {
        DEFAULT_MODEL
    }
}
