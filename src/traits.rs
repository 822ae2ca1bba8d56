//! The source adapter seam.
//!
//! Every lookup strategy (knowledge file, notes, encyclopedia, web snippet,
//! news feeds, research feed, local and cloud models) implements
//! [`SourceAdapter`]. The pipeline and the orchestrator only ever see this
//! trait, so tests can swap any source for an in-memory fake.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │                  Pipeline                  │
//! │ ┌──────────┐ ┌──────────┐ ┌──────────────┐ │
//! │ │knowledge │ │wikipedia │ │ news / arxiv │ │
//! │ │notes     │ │web       │ │  (gated)     │ │
//! │ └──────────┘ └──────────┘ └──────────────┘ │
//! └──────────────────┬─────────────────────────┘
//!                    ▼
//!        Vec<Candidate> → select → aggregate
//! ```
//!
//! Adapters never panic and never return `Err`: every failure is folded
//! into [`Attempt::Failed`] with a typed [`SourceError`] so the chain keeps
//! going while the reason stays inspectable.

use std::collections::BTreeSet;

use crate::intent::Intent;
use crate::models::{clamp_confidence, AttemptOutcome, AttemptRecord, Candidate, Metadata};

/// Why a source could not produce an answer.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The backend is switched off or missing credentials. Renders as a
    /// tagged placeholder such as `[cloud disabled] OPENAI_API_KEY not set`.
    #[error("[{0} disabled] {1}")]
    Disabled(String, String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0}: {1}")]
    Http(u16, String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else if let Some(status) = e.status() {
            SourceError::Http(status.as_u16(), e.to_string())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(e: std::io::Error) -> Self {
        SourceError::Io(e.to_string())
    }
}

/// A successful answer from one source.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub confidence: f64,
    pub metadata: Option<Metadata>,
}

/// Typed outcome of one [`SourceAdapter::try_resolve`] call.
#[derive(Debug)]
pub enum Attempt {
    Answered(Answer),
    /// The source ran but had nothing relevant.
    NoAnswer(String),
    Failed(SourceError),
}

impl Attempt {
    /// Build an answered attempt, or [`Attempt::NoAnswer`] if `text` is blank.
    pub fn answered(text: impl Into<String>, confidence: f64) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            return Attempt::NoAnswer("empty response".to_string());
        }
        Attempt::Answered(Answer {
            text,
            confidence: clamp_confidence(confidence),
            metadata: None,
        })
    }

    pub fn no_answer(reason: impl Into<String>) -> Self {
        Attempt::NoAnswer(reason.into())
    }

    /// Attach metadata to an answered attempt; other variants pass through.
    pub fn with_metadata(self, metadata: Metadata) -> Self {
        match self {
            Attempt::Answered(mut a) => {
                a.metadata = Some(metadata);
                Attempt::Answered(a)
            }
            other => other,
        }
    }

    pub fn answer(&self) -> Option<&Answer> {
        match self {
            Attempt::Answered(a) => Some(a),
            _ => None,
        }
    }

    /// Split into an optional candidate for scoring and a trace record.
    pub fn into_candidate(self, source: &str) -> (Option<Candidate>, AttemptRecord) {
        match self {
            Attempt::Answered(a) => {
                let record = AttemptRecord {
                    source: source.to_string(),
                    outcome: AttemptOutcome::Answered,
                    reason: None,
                };
                (
                    Candidate::new(source, a.text, a.confidence, a.metadata),
                    record,
                )
            }
            Attempt::NoAnswer(reason) => (
                None,
                AttemptRecord {
                    source: source.to_string(),
                    outcome: AttemptOutcome::NoAnswer,
                    reason: Some(reason),
                },
            ),
            Attempt::Failed(e) => (
                None,
                AttemptRecord {
                    source: source.to_string(),
                    outcome: AttemptOutcome::Failed,
                    reason: Some(e.to_string()),
                },
            ),
        }
    }
}

/// Per-call context handed to every adapter.
#[derive(Debug, Clone, Default)]
pub struct AskContext {
    /// Intent tags gating optional pipeline stages. Empty means "detect
    /// from the query".
    pub intents: BTreeSet<Intent>,
    /// Preamble prepended to model prompts (e.g. recent conversation).
    pub prompt_context: Option<String>,
}

impl AskContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_intents(intents: impl IntoIterator<Item = Intent>) -> Self {
        Self {
            intents: intents.into_iter().collect(),
            prompt_context: None,
        }
    }

    /// The prompt sent to a model backend: context preamble, then the query.
    pub fn prompt_for(&self, query: &str) -> String {
        match self.prompt_context.as_deref().map(str::trim) {
            Some(ctx) if !ctx.is_empty() => format!("{}\n\nUser query:\n{}", ctx, query),
            _ => query.to_string(),
        }
    }
}

/// A single lookup strategy.
///
/// # Example
///
/// ```rust
/// use raya::traits::{AskContext, Attempt, SourceAdapter};
///
/// struct Echo;
///
/// impl SourceAdapter for Echo {
///     fn label(&self) -> &str { "echo" }
///     fn description(&self) -> &str { "Repeats the query" }
///     fn try_resolve(&self, query: &str, _ctx: &AskContext) -> Attempt {
///         Attempt::answered(query, 0.5)
///     }
/// }
///
/// let attempt = Echo.try_resolve("hello", &AskContext::new());
/// assert_eq!(attempt.answer().unwrap().text, "hello");
/// ```
pub trait SourceAdapter: Send + Sync {
    /// Source label used for candidates, headings and cache `sources`
    /// (e.g. `"wikipedia"`).
    fn label(&self) -> &str;

    /// One-line description, shown by `raya sources`.
    fn description(&self) -> &str;

    /// Resolve `query`. Must not panic; failures are returned as
    /// [`Attempt::Failed`].
    fn try_resolve(&self, query: &str, ctx: &AskContext) -> Attempt;
}

/// Call an adapter and log the outcome.
pub fn run_attempt(adapter: &dyn SourceAdapter, query: &str, ctx: &AskContext) -> Attempt {
    let attempt = adapter.try_resolve(query, ctx);
    match &attempt {
        Attempt::Answered(a) => tracing::debug!(
            source = adapter.label(),
            chars = a.text.chars().count(),
            confidence = a.confidence,
            "source answered"
        ),
        Attempt::NoAnswer(reason) => {
            tracing::debug!(source = adapter.label(), %reason, "source had no answer")
        }
        Attempt::Failed(e) => tracing::debug!(source = adapter.label(), error = %e, "source failed"),
    }
    attempt
}
