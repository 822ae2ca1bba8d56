//! Topic news across several RSS feeds.
//!
//! The topic is what is left of the query once news phrasing ("latest news
//! on", "news about", ...) is removed. Feeds are scanned in configured order;
//! only entries whose title contains the topic (case-insensitive) are kept,
//! deduplicated, up to `max_items`. When no feed has a matching headline the
//! encyclopedia summary of the topic is split into pseudo-headlines.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::config::{FeedConfig, NewsConfig};
use crate::feed::{parse_feed, FeedEntry};
use crate::http;
use crate::models::Metadata;
use crate::source_wikipedia::WikipediaSource;
use crate::traits::{AskContext, Attempt, SourceAdapter, SourceError};

pub const LABEL: &str = "news";

const CONFIDENCE: f64 = 0.55;
/// Headlines joined into the pipeline candidate.
const CANDIDATE_HEADLINES: usize = 6;
const FALLBACK_SENTENCES: usize = 3;

// Longest phrases first so "latest news on" is removed before "news".
static NEWS_PHRASES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(latest news on|latest news about|latest news of|recent news on|recent news|news today|news on|news about|news of|latest news|news)\b",
    )
    .expect("static regex")
});

const FILLER: &[&str] = &[
    "what", "whats", "what's", "is", "are", "the", "any", "give", "me", "show", "tell", "get",
    "about", "on", "of", "for", "some",
];

/// Reduce a news request to its topic. Falls back to `"latest"`.
pub fn extract_topic(query: &str) -> String {
    let stripped = NEWS_PHRASES.replace_all(query, " ");
    let words: Vec<&str> = stripped
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-'))
        .filter(|w| !w.is_empty())
        .collect();

    let is_filler = |w: &&str| FILLER.contains(&w.to_lowercase().as_str());
    let start = words.iter().position(|w| !is_filler(w)).unwrap_or(words.len());
    let end = words.iter().rposition(|w| !is_filler(w)).map_or(start, |i| i + 1);

    let topic = words[start..end.max(start)].join(" ");
    if topic.is_empty() {
        "latest".to_string()
    } else {
        topic
    }
}

/// Collect matching headlines from feeds, stopping once `max_items` is
/// reached. Feeds are pulled lazily so later feeds are never fetched when
/// earlier ones fill the cap.
pub fn collect_headlines<I>(feeds: I, topic: &str, scan_per_feed: usize, max_items: usize) -> Vec<String>
where
    I: IntoIterator<Item = Vec<FeedEntry>>,
{
    let needle = topic.to_lowercase();
    let mut out: Vec<String> = Vec::new();
    for entries in feeds {
        for entry in entries.iter().take(scan_per_feed) {
            let title = entry.title.trim();
            if title.is_empty() || !title.to_lowercase().contains(&needle) {
                continue;
            }
            if !out.iter().any(|h| h == title) {
                out.push(title.to_string());
            }
            if out.len() >= max_items {
                return out;
            }
        }
    }
    out
}

/// Split an encyclopedia summary into headline-like lines.
pub fn summary_lines(summary: &str, max_items: usize) -> Vec<String> {
    summary
        .split(". ")
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(max_items)
        .map(str::to_string)
        .collect()
}

pub struct NewsSource {
    client: Client,
    feeds: Vec<FeedConfig>,
    max_items: usize,
    scan_per_feed: usize,
    wikipedia: Option<WikipediaSource>,
}

impl NewsSource {
    /// `wikipedia` provides the summary fallback; `None` disables it.
    pub fn new(config: &NewsConfig, wikipedia: Option<WikipediaSource>) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            feeds: config.feeds.clone(),
            max_items: config.max_items,
            scan_per_feed: config.scan_per_feed,
            wikipedia,
        })
    }

    fn fetch(&self, feed: &FeedConfig) -> Result<Vec<FeedEntry>, SourceError> {
        let body = http::send_text(self.client.get(&feed.url))?;
        parse_feed(&body)
    }

    /// Headlines about `topic`, live feeds first, then the summary fallback.
    pub fn topic_headlines(&self, topic: &str) -> Vec<String> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Vec::new();
        }

        let fetched = self.feeds.iter().map(|feed| match self.fetch(feed) {
            Ok(entries) => {
                debug!(feed = %feed.name, entries = entries.len(), "feed fetched");
                entries
            }
            Err(e) => {
                warn!(feed = %feed.name, error = %e, "feed unavailable");
                Vec::new()
            }
        });
        let headlines = collect_headlines(fetched, topic, self.scan_per_feed, self.max_items);
        if !headlines.is_empty() {
            return headlines;
        }

        let Some(wiki) = &self.wikipedia else {
            return Vec::new();
        };
        debug!(topic, "no live headlines, using encyclopedia summary");
        match wiki.summary(topic, FALLBACK_SENTENCES) {
            Ok(Some(summary)) => summary_lines(&summary, self.max_items),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(topic, error = %e, "summary fallback failed");
                Vec::new()
            }
        }
    }
}

impl SourceAdapter for NewsSource {
    fn label(&self) -> &str {
        LABEL
    }

    fn description(&self) -> &str {
        "Topic headlines from RSS feeds (gated on news intent)"
    }

    fn try_resolve(&self, query: &str, _ctx: &AskContext) -> Attempt {
        let topic = extract_topic(query);
        let headlines = self.topic_headlines(&topic);
        if headlines.is_empty() {
            return Attempt::no_answer(format!("no headlines for '{}'", topic));
        }
        let mut meta = Metadata::new();
        meta.insert("topic".to_string(), topic.into());
        meta.insert("headlines".to_string(), headlines.len().into());
        let text = headlines
            .iter()
            .take(CANDIDATE_HEADLINES)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        Attempt::answered(text, CONFIDENCE).with_metadata(meta)
    }
}
