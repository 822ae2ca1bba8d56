//! Coarse query intent detection.
//!
//! Intents gate the optional pipeline stages: `news` enables the topic news
//! feeds, `research` enables the arXiv feed. `fact` is the default and is
//! always present when nothing else matches.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Fact,
    News,
    Research,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Fact => "fact",
            Intent::News => "news",
            Intent::Research => "research",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fact" => Ok(Intent::Fact),
            "news" => Ok(Intent::News),
            "research" => Ok(Intent::Research),
            other => Err(format!(
                "unknown intent '{}': expected fact, news or research",
                other
            )),
        }
    }
}

const QUESTION_WORDS: &[&str] = &[
    "who", "what", "when", "where", "why", "how", "which", "whom", "whose",
];

const RECENCY_HINTS: &[&str] = &[
    "latest",
    "today",
    "tonight",
    "this week",
    "this month",
    "breaking",
    "update",
    "yesterday",
    "recent",
    "newest",
    "current",
];

const MONTHS: &[&str] = &[
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const RESEARCH_HINTS: &[&str] = &[
    "paper",
    "preprint",
    "arxiv",
    "study",
    "studies",
    "research",
    "doi",
    "journal",
    "conference",
    "proceedings",
    "benchmark",
];

const YESNO_PREFIXES: &[&str] = &[
    "is ", "are ", "was ", "were ", "did ", "do ", "does ", "can ", "could ", "will ", "would ",
    "has ", "have ", "had ",
];

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b20\d{2}\b").expect("static regex"));
static FACT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(who|what|when|where|why|how)\b|\bdefine\b|\bmeaning of\b|\bhistory of\b|\bsummary of\b",
    )
    .expect("static regex")
});

/// Lightweight check for a factual question shape.
pub fn is_factual_question(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    if t.is_empty() || matches!(t.as_str(), "date" | "time" | "news") {
        return false;
    }
    let first = t.split_whitespace().next().unwrap_or("");
    t.contains('?')
        || QUESTION_WORDS.contains(&first)
        || YESNO_PREFIXES.iter().any(|p| t.starts_with(p))
}

/// Detect the intent tags of a query. Never returns an empty set.
pub fn detect_intents(text: &str) -> BTreeSet<Intent> {
    let q = text.trim().to_lowercase();
    let mut intents = BTreeSet::new();
    if q.is_empty() {
        intents.insert(Intent::Fact);
        return intents;
    }

    if RESEARCH_HINTS.iter().any(|h| q.contains(h)) {
        intents.insert(Intent::Research);
    }

    let recency = RECENCY_HINTS.iter().any(|h| q.contains(h));
    let month = MONTHS.iter().any(|m| q.contains(m));
    if q.contains("news") || YEAR.is_match(&q) || month || recency {
        intents.insert(Intent::News);
    }

    if FACT_PATTERN.is_match(&q) || is_factual_question(&q) {
        intents.insert(Intent::Fact);
    }

    if intents.is_empty() {
        intents.insert(Intent::Fact);
    }
    intents
}

/// Render an intent set as a comma-separated list.
pub fn format_intents(intents: &BTreeSet<Intent>) -> String {
    intents
        .iter()
        .map(Intent::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
