//! Recent research papers from the arXiv Atom API.

use anyhow::Result;
use reqwest::blocking::Client;

use crate::config::ResearchConfig;
use crate::feed::{parse_feed, FeedEntry};
use crate::http;
use crate::models::Metadata;
use crate::text::{clean_query, normalize_query};
use crate::traits::{AskContext, Attempt, SourceAdapter, SourceError};

pub const LABEL: &str = "arxiv";

const CONFIDENCE: f64 = 0.5;
const MIN_KEYWORD_CHARS: usize = 4;

/// Words that gate the research stage rather than describe the topic.
const IGNORED_KEYWORDS: &[&str] = &[
    "paper", "papers", "study", "studies", "arxiv", "research", "about", "latest", "recent",
    "what", "which", "show", "find",
];

/// Topic keywords of a query: normalized words of at least four characters.
pub fn keywords(query: &str) -> Vec<String> {
    normalize_query(query)
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_KEYWORD_CHARS && !IGNORED_KEYWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Keep entries sharing a keyword with their title or summary and render
/// them as `title (updated)\nlink`. No keywords means no filtering.
pub fn render_entries(entries: &[FeedEntry], keywords: &[String], max_results: usize) -> Vec<String> {
    entries
        .iter()
        .filter(|e| !e.title.is_empty())
        .filter(|e| {
            if keywords.is_empty() {
                return true;
            }
            let haystack = format!("{} {}", e.title, e.summary).to_lowercase();
            keywords.iter().any(|k| haystack.contains(k.as_str()))
        })
        .take(max_results)
        .map(|e| format!("{} ({})\n{}", e.title, e.updated, e.link))
        .collect()
}

pub struct ResearchSource {
    client: Client,
    api_url: String,
    max_results: usize,
}

impl ResearchSource {
    pub fn new(config: &ResearchConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_url: config.api_url.clone(),
            max_results: config.max_results,
        })
    }

    fn fetch(&self, query: &str) -> Result<Vec<FeedEntry>, SourceError> {
        let search = format!("all:{}", query);
        let max = self.max_results.to_string();
        let request = self.client.get(&self.api_url).query(&[
            ("search_query", search.as_str()),
            ("sortBy", "lastUpdatedDate"),
            ("sortOrder", "descending"),
            ("max_results", max.as_str()),
        ]);
        parse_feed(&http::send_text(request)?)
    }
}

impl SourceAdapter for ResearchSource {
    fn label(&self) -> &str {
        LABEL
    }

    fn description(&self) -> &str {
        "Recently updated arXiv papers (gated on research intent)"
    }

    fn try_resolve(&self, query: &str, _ctx: &AskContext) -> Attempt {
        let q = clean_query(query);
        if q.is_empty() {
            return Attempt::no_answer("empty query");
        }
        let entries = match self.fetch(&q) {
            Ok(e) => e,
            Err(e) => return Attempt::Failed(e),
        };
        let lines = render_entries(&entries, &keywords(&q), self.max_results);
        if lines.is_empty() {
            return Attempt::no_answer("no matching papers");
        }
        let mut meta = Metadata::new();
        meta.insert("papers".to_string(), lines.len().into());
        Attempt::answered(lines.join("\n"), CONFIDENCE).with_metadata(meta)
    }
}
