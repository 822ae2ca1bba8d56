//! Curated knowledge lookup.
//!
//! The knowledge file is JSON, either `{"knowledge": {key: entry}}` or a
//! flat `{key: entry}` map. An entry is a string or an object carrying its
//! text in `summary`, `answer` or `text`. Keys are matched against the
//! question-stripped query: exactly first, then by the closest key whose
//! similarity reaches the configured cutoff.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::KnowledgeConfig;
use crate::text::{similarity, strip_question_prefix};
use crate::traits::{AskContext, Attempt, SourceAdapter};

pub const LABEL: &str = "knowledge";

const EXACT_CONFIDENCE: f64 = 0.95;
const FUZZY_CONFIDENCE: f64 = 0.85;

pub struct KnowledgeSource {
    entries: BTreeMap<String, String>,
    fuzzy_cutoff: f64,
}

impl KnowledgeSource {
    /// Load the knowledge file. A missing or malformed file yields an empty
    /// source rather than an error.
    pub fn from_config(config: &KnowledgeConfig) -> Self {
        let entries = load_knowledge(&config.path);
        debug!(path = %config.path.display(), entries = entries.len(), "knowledge loaded");
        Self {
            entries,
            fuzzy_cutoff: config.fuzzy_cutoff,
        }
    }

    pub fn from_entries(entries: BTreeMap<String, String>, fuzzy_cutoff: f64) -> Self {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v))
            .collect();
        Self {
            entries,
            fuzzy_cutoff,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the matched key, its text and the confidence.
    pub fn lookup(&self, query: &str) -> Option<(&str, &str, f64)> {
        let q = strip_question_prefix(query);
        if q.is_empty() {
            return None;
        }
        if let Some((key, text)) = self.entries.get_key_value(&q) {
            return Some((key.as_str(), text.as_str(), EXACT_CONFIDENCE));
        }

        let mut best: Option<(&String, &String, f64)> = None;
        for (key, text) in &self.entries {
            let score = similarity(&q, key);
            if score >= self.fuzzy_cutoff && best.map_or(true, |(_, _, s)| score > s) {
                best = Some((key, text, score));
            }
        }
        best.map(|(key, text, _)| (key.as_str(), text.as_str(), FUZZY_CONFIDENCE))
    }
}

fn load_knowledge(path: &Path) -> BTreeMap<String, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "knowledge file unreadable");
            }
            return BTreeMap::new();
        }
    };
    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(value) => parse_knowledge(&value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "knowledge file is not valid JSON");
            BTreeMap::new()
        }
    }
}

/// Flatten a knowledge document into `key → text`.
pub fn parse_knowledge(value: &serde_json::Value) -> BTreeMap<String, String> {
    let root = value
        .get("knowledge")
        .filter(|k| k.is_object())
        .unwrap_or(value);
    let mut out = BTreeMap::new();
    if let Some(map) = root.as_object() {
        for (key, entry) in map {
            let text = match entry {
                serde_json::Value::String(s) => Some(s.as_str()),
                serde_json::Value::Object(o) => ["summary", "answer", "text"]
                    .iter()
                    .find_map(|f| o.get(*f).and_then(|v| v.as_str()))
                    .filter(|s| !s.trim().is_empty()),
                _ => None,
            };
            if let Some(text) = text {
                out.insert(key.trim().to_lowercase(), text.to_string());
            }
        }
    }
    out
}

impl SourceAdapter for KnowledgeSource {
    fn label(&self) -> &str {
        LABEL
    }

    fn description(&self) -> &str {
        "Curated knowledge file (exact, then fuzzy key match)"
    }

    fn try_resolve(&self, query: &str, _ctx: &AskContext) -> Attempt {
        if self.entries.is_empty() {
            return Attempt::no_answer("knowledge file is empty");
        }
        match self.lookup(query) {
            Some((key, text, confidence)) => {
                let mut meta = crate::models::Metadata::new();
                meta.insert("matched_key".to_string(), key.into());
                Attempt::answered(text, confidence).with_metadata(meta)
            }
            None => Attempt::no_answer("no matching knowledge key"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> KnowledgeSource {
        let value = json!({
            "knowledge": {
                "Eiffel Tower": {"summary": "A wrought-iron tower in Paris."},
                "rct": {"answer": "Relative Cosmological Time."},
                "photosynthesis": "How plants make sugar from light.",
                "empty": {"summary": ""}
            }
        });
        KnowledgeSource::from_entries(parse_knowledge(&value), 0.7)
    }

    #[test]
    fn parse_accepts_nested_and_flat_layouts() {
        assert_eq!(source().len(), 3);
        let flat = parse_knowledge(&json!({"gravity": {"text": "Attraction."}}));
        assert_eq!(flat.get("gravity").map(String::as_str), Some("Attraction."));
    }

    #[test]
    fn exact_match_beats_fuzzy() {
        let src = source();
        let (key, text, conf) = src.lookup("What is the Eiffel Tower").unwrap();
        assert_eq!(key, "eiffel tower");
        assert_eq!(text, "A wrought-iron tower in Paris.");
        assert!((conf - EXACT_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn fuzzy_match_has_lower_confidence() {
        let src = source();
        let (key, _, conf) = src.lookup("eifel towr").unwrap();
        assert_eq!(key, "eiffel tower");
        assert!((conf - FUZZY_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn unrelated_query_misses() {
        assert!(source().lookup("quantum chromodynamics").is_none());
        let attempt = source().try_resolve("quantum chromodynamics", &AskContext::new());
        assert!(matches!(attempt, Attempt::NoAnswer(_)));
    }

    #[test]
    fn missing_file_is_empty_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = KnowledgeConfig {
            enabled: true,
            path: dir.path().join("none.json"),
            fuzzy_cutoff: 0.7,
        };
        assert!(KnowledgeSource::from_config(&config).is_empty());
    }
}
