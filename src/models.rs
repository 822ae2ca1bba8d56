//! Core data models used throughout RAYA.
//!
//! These types represent the candidate answers, the per-source attempt
//! records, and the final [`EngineResult`] that flow through the
//! orchestration waterfall.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Open key/value metadata attached to answers, cache entries and results.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One source's proposed answer, awaiting scoring.
///
/// Built only through [`Candidate::new`], which refuses empty text, so a
/// blank answer can never reach the scorer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub source: String,
    pub text: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Candidate {
    /// Returns `None` when `text` is empty or whitespace. Confidence is
    /// clamped into `[0, 1]`.
    pub fn new(
        source: impl Into<String>,
        text: impl Into<String>,
        confidence: f64,
        metadata: Option<Metadata>,
    ) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }
        Some(Self {
            source: source.into(),
            text,
            confidence: clamp_confidence(confidence),
            metadata,
        })
    }
}

/// Clamp a confidence into `[0, 1]`, mapping NaN to `0`.
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// How a single source call ended, as recorded in result metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Answered,
    NoAnswer,
    Failed,
}

/// Inspectable trace of one source call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub source: String,
    pub outcome: AttemptOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The answer returned by [`Orchestrator::ask`](crate::orchestrator::Orchestrator::ask).
///
/// Immutable once built: fields are private and only readable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineResult {
    text: String,
    sources: BTreeMap<String, bool>,
    confidence: f64,
    meta: Metadata,
}

impl EngineResult {
    pub fn new(
        text: impl Into<String>,
        sources: BTreeMap<String, bool>,
        confidence: f64,
        meta: Metadata,
    ) -> Self {
        Self {
            text: text.into(),
            sources,
            confidence: clamp_confidence(confidence),
            meta,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sources(&self) -> &BTreeMap<String, bool> {
        &self.sources
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    /// True when this result was served from the answer cache.
    pub fn from_cache(&self) -> bool {
        self.meta
            .get("cache")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}
