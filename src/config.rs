//! TOML configuration.
//!
//! Every section is optional; an empty file (or no file at all) yields the
//! built-in defaults, which match a local-only setup with the cloud model
//! switched off.
//!
//! ```toml
//! [cache]
//! path = "./data/raya_cache.json"
//!
//! [router]
//! cloud_min_length = 350
//!
//! [cloud]
//! enabled = true
//! model = "gpt-4o-mini"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub router: RouterConfig,
    pub orchestrator: OrchestratorConfig,
    pub knowledge: KnowledgeConfig,
    pub notes: NotesConfig,
    pub wikipedia: WikipediaConfig,
    pub web: WebConfig,
    pub news: NewsConfig,
    pub research: ResearchConfig,
    pub local_model: LocalModelConfig,
    pub cloud: CloudConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub path: PathBuf,
    /// Results below this confidence are not written back. `0.0` caches
    /// everything, including fallback answers.
    pub min_confidence: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/raya_cache.json"),
            min_confidence: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RouterConfig {
    pub cloud_min_length: usize,
    /// Upgrade rule-based local decisions to hybrid (cloud enabled only).
    pub hybrid: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cloud_min_length: 350,
            hybrid: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Local model answers below this confidence still run the pipeline.
    pub min_local_confidence: f64,
    pub fallback_text: String,
    pub fallback_confidence: f64,
    pub answer_confidence: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            min_local_confidence: 0.5,
            fallback_text: "Sorry, I don't know the answer to that.".to_string(),
            fallback_confidence: 0.2,
            answer_confidence: 0.9,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub fuzzy_cutoff: f64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("./data/knowledge.json"),
            fuzzy_cutoff: 0.7,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotesConfig {
    pub enabled: bool,
    pub root: PathBuf,
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub follow_symlinks: bool,
    pub max_chars: usize,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: PathBuf::from("./notes"),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
            max_chars: 1000,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WikipediaConfig {
    pub enabled: bool,
    pub api_url: String,
    pub sentences: usize,
    pub search_results: usize,
    pub timeout_secs: u64,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            sentences: 3,
            search_results: 3,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub instant_url: String,
    pub html_url: String,
    pub timeout_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            instant_url: "https://api.duckduckgo.com/".to_string(),
            html_url: "https://html.duckduckgo.com/html/".to_string(),
            timeout_secs: 6,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NewsConfig {
    pub enabled: bool,
    pub feeds: Vec<FeedConfig>,
    pub max_items: usize,
    pub scan_per_feed: usize,
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        let feed = |name: &str, url: &str| FeedConfig {
            name: name.to_string(),
            url: url.to_string(),
        };
        Self {
            enabled: true,
            feeds: vec![
                feed("ndtv", "https://feeds.feedburner.com/ndtvnews-top-stories"),
                feed("bbc", "http://feeds.bbci.co.uk/news/rss.xml"),
                feed("cnn", "http://rss.cnn.com/rss/edition.rss"),
                feed("aljazeera", "https://www.aljazeera.com/xml/rss/all.xml"),
            ],
            max_items: 10,
            scan_per_feed: 30,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ResearchConfig {
    pub enabled: bool,
    pub api_url: String,
    pub max_results: usize,
    pub timeout_secs: u64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://export.arxiv.org/api/query".to_string(),
            max_results: 3,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LocalModelConfig {
    pub enabled: bool,
    /// Ollama base URL. Overridden by `OLLAMA_HOST` when set.
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            timeout_secs: 30,
        }
    }
}

impl LocalModelConfig {
    /// Base URL with the `OLLAMA_HOST` override applied.
    pub fn effective_url(&self) -> String {
        std::env::var("OLLAMA_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| self.url.clone())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CloudConfig {
    pub enabled: bool,
    pub api_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 800,
            temperature: 0.2,
            timeout_secs: 30,
        }
    }
}

impl CloudConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Read and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    check_unit("cache.min_confidence", config.cache.min_confidence)?;
    check_unit(
        "orchestrator.min_local_confidence",
        config.orchestrator.min_local_confidence,
    )?;
    check_unit(
        "orchestrator.fallback_confidence",
        config.orchestrator.fallback_confidence,
    )?;
    check_unit(
        "orchestrator.answer_confidence",
        config.orchestrator.answer_confidence,
    )?;
    check_unit("knowledge.fuzzy_cutoff", config.knowledge.fuzzy_cutoff)?;

    if config.orchestrator.fallback_text.trim().is_empty() {
        bail!("orchestrator.fallback_text must not be empty");
    }
    if config.router.cloud_min_length == 0 {
        bail!("router.cloud_min_length must be > 0");
    }
    if config.notes.max_chars == 0 {
        bail!("notes.max_chars must be > 0");
    }
    if config.wikipedia.sentences == 0 {
        bail!("wikipedia.sentences must be > 0");
    }
    if config.wikipedia.search_results == 0 {
        bail!("wikipedia.search_results must be > 0");
    }
    if config.news.max_items == 0 {
        bail!("news.max_items must be > 0");
    }
    if config.news.scan_per_feed == 0 {
        bail!("news.scan_per_feed must be > 0");
    }
    if config.research.max_results == 0 {
        bail!("research.max_results must be > 0");
    }
    if config.cloud.max_tokens == 0 {
        bail!("cloud.max_tokens must be > 0");
    }
    if !(0.0..=2.0).contains(&config.cloud.temperature) {
        bail!("cloud.temperature must be in [0.0, 2.0]");
    }

    let timeouts = [
        ("wikipedia.timeout_secs", config.wikipedia.timeout_secs),
        ("web.timeout_secs", config.web.timeout_secs),
        ("news.timeout_secs", config.news.timeout_secs),
        ("research.timeout_secs", config.research.timeout_secs),
        ("local_model.timeout_secs", config.local_model.timeout_secs),
        ("cloud.timeout_secs", config.cloud.timeout_secs),
    ];
    for (name, secs) in timeouts {
        if secs == 0 {
            bail!("{} must be > 0", name);
        }
    }

    Ok(())
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{} must be in [0.0, 1.0]", name);
    }
    Ok(())
}
