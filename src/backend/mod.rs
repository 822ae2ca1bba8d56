//! Text-generation backends.
//!
//! - **[`OllamaBackend`]** calls a local Ollama server (`POST /api/generate`).
//! - **[`OpenAIBackend`]** calls the OpenAI chat completions API. It is off by
//!   default and reports `[cloud disabled] ...` until enabled and given a key.
//!
//! Both are plain [`SourceAdapter`](crate::traits::SourceAdapter)s; the
//! orchestrator calls them outside the pipeline. Neither retries: a failed
//! call is a failed attempt and the waterfall moves on.
//!
//! # Confidence
//!
//! Models expose no usable probability, so the local backend scores its
//! reply with [`local_confidence`]. The cloud backend uses a fixed 0.9.

mod ollama;
mod openai;

pub use ollama::OllamaBackend;
pub use openai::OpenAIBackend;

pub const LOCAL_LABEL: &str = "local_model";
pub const CLOUD_LABEL: &str = "cloud_model";

const SHORT_REPLY_CHARS: usize = 40;

/// Heuristic confidence of a local model reply.
///
/// | Reply | Confidence |
/// |-------|-----------|
/// | empty | 0.0 |
/// | under 40 characters | 0.2 |
/// | contains "i don't know" | 0.3 |
/// | anything else | 0.75 |
pub fn local_confidence(reply: &str) -> f64 {
    let reply = reply.trim();
    if reply.is_empty() {
        return 0.0;
    }
    if reply.chars().count() < SHORT_REPLY_CHARS {
        return 0.2;
    }
    let lower = reply.to_lowercase().replace('\u{2019}', "'");
    if lower.contains("i don't know") || lower.contains("i do not know") {
        return 0.3;
    }
    0.75
}
