//! Encyclopedia summaries from the MediaWiki API.
//!
//! Lookup order for a cleaned query `q`:
//!
//! 1. search for up to `search_results` titles; the first title equal to or
//!    containing `q` gives a `sentences`-long summary at 0.85
//! 2. otherwise the first title with a usable summary gives 2 sentences at 0.80
//! 3. otherwise a direct lookup of `q` gives 2 sentences at 0.75
//!
//! Summaries that look like entertainment articles (films, albums, bands...)
//! are rejected as off-topic for a factual assistant.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::WikipediaConfig;
use crate::http;
use crate::models::Metadata;
use crate::text::{clean_query, first_sentences};
use crate::traits::{AskContext, Attempt, SourceAdapter, SourceError};

pub const LABEL: &str = "wikipedia";

const TITLE_MATCH_CONFIDENCE: f64 = 0.85;
const FIRST_RESULT_CONFIDENCE: f64 = 0.80;
const DIRECT_CONFIDENCE: f64 = 0.75;
const SHORT_SENTENCES: usize = 2;

static ENTERTAINMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(film|filmmaker|filmography|album|song|soundtrack|television|sitcom|episode|novel|character|fictional|video game|band|music|musical|movie|drama)s?\b",
    )
    .expect("static regex")
});

/// True when a summary reads like an entertainment-media article.
pub fn is_entertainment(summary: &str) -> bool {
    ENTERTAINMENT.is_match(summary)
}

pub struct WikipediaSource {
    client: Client,
    api_url: String,
    sentences: usize,
    search_results: usize,
}

impl WikipediaSource {
    pub fn new(config: &WikipediaConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_url: config.api_url.clone(),
            sentences: config.sentences,
            search_results: config.search_results,
        })
    }

    /// Full-text search for article titles.
    pub fn search_titles(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let limit = self.search_results.to_string();
        let request = self.client.get(&self.api_url).query(&[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", query),
            ("srlimit", limit.as_str()),
            ("format", "json"),
            ("formatversion", "2"),
        ]);
        Ok(parse_search_titles(&http::send_json(request)?))
    }

    /// Plain-text intro of `title` (redirects followed).
    pub fn extract(&self, title: &str) -> Result<Option<String>, SourceError> {
        let request = self.client.get(&self.api_url).query(&[
            ("action", "query"),
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("redirects", "1"),
            ("titles", title),
            ("format", "json"),
            ("formatversion", "2"),
        ]);
        Ok(parse_extract(&http::send_json(request)?))
    }

    /// First `sentences` sentences of `title`'s intro, if the article exists
    /// and is not an entertainment article.
    pub fn summary(&self, title: &str, sentences: usize) -> Result<Option<String>, SourceError> {
        let Some(extract) = self.extract(title)? else {
            return Ok(None);
        };
        let summary = first_sentences(&extract, sentences);
        if summary.is_empty() {
            return Ok(None);
        }
        if is_entertainment(&summary) {
            debug!(title, "skipping entertainment article");
            return Ok(None);
        }
        Ok(Some(summary))
    }

    fn best_summary(&self, q: &str) -> Result<Option<(String, String, f64)>, SourceError> {
        let mut last_error = None;

        let titles = match self.search_titles(q) {
            Ok(t) => t,
            Err(e) => {
                debug!(error = %e, "wikipedia search failed, trying direct lookup");
                last_error = Some(e);
                Vec::new()
            }
        };

        let q_lower = q.to_lowercase();
        for title in &titles {
            if !title.to_lowercase().contains(&q_lower) {
                continue;
            }
            match self.summary(title, self.sentences) {
                Ok(Some(s)) => return Ok(Some((title.clone(), s, TITLE_MATCH_CONFIDENCE))),
                Ok(None) => {}
                Err(e) => last_error = Some(e),
            }
        }

        for title in &titles {
            match self.summary(title, SHORT_SENTENCES) {
                Ok(Some(s)) => return Ok(Some((title.clone(), s, FIRST_RESULT_CONFIDENCE))),
                Ok(None) => {}
                Err(e) => last_error = Some(e),
            }
        }

        match self.summary(q, SHORT_SENTENCES) {
            Ok(Some(s)) => Ok(Some((q.to_string(), s, DIRECT_CONFIDENCE))),
            Ok(None) => Ok(None),
            Err(e) => Err(last_error.unwrap_or(e)),
        }
    }
}

/// Titles from a `list=search` response.
pub fn parse_search_titles(body: &Value) -> Vec<String> {
    body.pointer("/query/search")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|r| r.get("title").and_then(Value::as_str))
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// First non-empty extract from a `prop=extracts` response. Accepts both the
/// array (`formatversion=2`) and the keyed-object page layouts.
pub fn parse_extract(body: &Value) -> Option<String> {
    let pages = body.pointer("/query/pages")?;
    let mut iter: Box<dyn Iterator<Item = &Value>> = match pages {
        Value::Array(a) => Box::new(a.iter()),
        Value::Object(o) => Box::new(o.values()),
        _ => return None,
    };
    iter.find_map(|page| {
        if page.get("missing").is_some() {
            return None;
        }
        page.get("extract")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

impl SourceAdapter for WikipediaSource {
    fn label(&self) -> &str {
        LABEL
    }

    fn description(&self) -> &str {
        "Wikipedia article summaries (MediaWiki API)"
    }

    fn try_resolve(&self, query: &str, _ctx: &AskContext) -> Attempt {
        let q = clean_query(query);
        if q.is_empty() {
            return Attempt::no_answer("empty query");
        }
        match self.best_summary(&q) {
            Ok(Some((title, summary, confidence))) => {
                let mut meta = Metadata::new();
                meta.insert("title".to_string(), title.into());
                Attempt::answered(summary, confidence).with_metadata(meta)
            }
            Ok(None) => Attempt::no_answer("no relevant article"),
            Err(e) => Attempt::Failed(e),
        }
    }
}
