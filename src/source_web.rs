//! Web snippet lookup via DuckDuckGo.
//!
//! The instant-answer JSON API is tried first (`AbstractText`, then the
//! first `RelatedTopics[].Text`). When it has nothing, the HTML results page
//! is scraped for the first `.result__snippet`.

use anyhow::Result;
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::config::WebConfig;
use crate::http;
use crate::models::Metadata;
use crate::text::clean_query;
use crate::traits::{AskContext, Attempt, SourceAdapter, SourceError};

pub const LABEL: &str = "web";

const CONFIDENCE: f64 = 0.7;

pub struct WebSource {
    client: Client,
    instant_url: String,
    html_url: String,
}

impl WebSource {
    pub fn new(config: &WebConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            instant_url: config.instant_url.clone(),
            html_url: config.html_url.clone(),
        })
    }

    fn instant_answer(&self, query: &str) -> Result<Option<String>, SourceError> {
        let request = self.client.get(&self.instant_url).query(&[
            ("q", query),
            ("format", "json"),
            ("no_redirect", "1"),
            ("no_html", "1"),
        ]);
        Ok(parse_instant_answer(&http::send_json(request)?))
    }

    fn html_snippet(&self, query: &str) -> Result<Option<String>, SourceError> {
        let request = self.client.get(&self.html_url).query(&[("q", query)]);
        parse_html_snippet(&http::send_text(request)?)
    }
}

/// Text from an instant-answer response.
pub fn parse_instant_answer(body: &Value) -> Option<String> {
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if let Some(text) = non_empty(body.get("AbstractText")) {
        return Some(text);
    }
    body.get("RelatedTopics")
        .and_then(Value::as_array)?
        .iter()
        .find_map(|topic| non_empty(topic.get("Text")))
}

/// First result snippet from the HTML results page.
pub fn parse_html_snippet(html: &str) -> Result<Option<String>, SourceError> {
    let selector =
        Selector::parse(".result__snippet").map_err(|e| SourceError::Parse(e.to_string()))?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).find_map(|el| {
        let text = el.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        (!text.is_empty()).then_some(text)
    }))
}

impl SourceAdapter for WebSource {
    fn label(&self) -> &str {
        LABEL
    }

    fn description(&self) -> &str {
        "DuckDuckGo instant answer, then HTML result snippet"
    }

    fn try_resolve(&self, query: &str, _ctx: &AskContext) -> Attempt {
        let q = clean_query(query);
        if q.is_empty() {
            return Attempt::no_answer("empty query");
        }

        let mut meta = Metadata::new();
        let instant = match self.instant_answer(&q) {
            Ok(found) => found,
            Err(e) => {
                debug!(error = %e, "instant answer failed, scraping results page");
                None
            }
        };
        if let Some(text) = instant {
            meta.insert("via".to_string(), "instant_answer".into());
            return Attempt::answered(text, CONFIDENCE).with_metadata(meta);
        }

        match self.html_snippet(&q) {
            Ok(Some(text)) => {
                meta.insert("via".to_string(), "html_snippet".into());
                Attempt::answered(text, CONFIDENCE).with_metadata(meta)
            }
            Ok(None) => Attempt::no_answer("no web snippet"),
            Err(e) => Attempt::Failed(e),
        }
    }
}
