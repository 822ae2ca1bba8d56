//! Persistent answer cache keyed by normalized query text.
//!
//! The on-disk form is a single pretty-printed JSON object mapping each
//! normalized query to `{source, text, confidence, meta, sources}`. The file
//! is read once when the cache is opened and rewritten in full on every
//! [`put`](AnswerCache::put). There is no locking: two processes writing the
//! same file race and the last writer wins.
//!
//! Durability is best-effort. A missing or corrupt file opens as an empty
//! cache, and a failed write is logged and otherwise ignored.
//!
//! Entries whose text starts with a [stale marker](STALE_MARKERS) (a
//! disabled or failed backend placeholder) are never served: `get` treats
//! them as a miss so the answer is recomputed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::{clamp_confidence, Metadata};
use crate::text::normalize_query;

/// Text prefixes of placeholder answers that must never be served from cache.
pub const STALE_MARKERS: &[&str] = &[
    "[cloud disabled]",
    "[cloud error]",
    "[local error]",
    "[local_error]",
];

/// A stored answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Normalized query; this is the JSON object key, not a field.
    #[serde(skip)]
    pub key: String,
    #[serde(default = "default_source")]
    pub source: String,
    /// Older cache files stored the answer under `answer`.
    #[serde(default, alias = "answer")]
    pub text: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(rename = "meta", default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub sources: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
}

fn default_source() -> String {
    "cache".to_string()
}

fn default_confidence() -> f64 {
    0.8
}

impl CacheEntry {
    pub fn new(
        text: impl Into<String>,
        source: impl Into<String>,
        confidence: f64,
        metadata: Metadata,
    ) -> Self {
        let source = source.into();
        let mut sources = BTreeMap::new();
        sources.insert(source.clone(), true);
        Self {
            key: String::new(),
            source,
            text: text.into(),
            confidence: clamp_confidence(confidence),
            metadata,
            sources,
            cached_at: None,
        }
    }

    pub fn with_sources(mut self, sources: BTreeMap<String, bool>) -> Self {
        if !sources.is_empty() {
            self.sources = sources;
        }
        self
    }

    /// True when the text is a disabled/error placeholder.
    pub fn is_stale(&self) -> bool {
        let t = self.text.trim_start();
        t.is_empty() || STALE_MARKERS.iter().any(|m| t.starts_with(m))
    }
}

/// Read-through/write-through answer store.
pub trait AnswerCache {
    /// Look up `query` (normalized internally). Stale entries are a miss.
    fn get(&self, query: &str) -> Option<CacheEntry>;

    /// Store `entry` under the normalized `query`, replacing any previous
    /// entry for the same key.
    fn put(&mut self, query: &str, entry: CacheEntry);

    /// All stored entries, stale ones included, sorted by key.
    fn entries(&self) -> Vec<CacheEntry>;

    fn len(&self) -> usize {
        self.entries().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lookup(map: &BTreeMap<String, CacheEntry>, query: &str) -> Option<CacheEntry> {
    let key = normalize_query(query);
    let entry = map.get(&key)?;
    if entry.is_stale() {
        debug!(key = %key, "ignoring stale cache entry");
        return None;
    }
    Some(entry.clone())
}

fn insert(map: &mut BTreeMap<String, CacheEntry>, query: &str, mut entry: CacheEntry) {
    let key = normalize_query(query);
    entry.key = key.clone();
    if entry.cached_at.is_none() {
        entry.cached_at = Some(Utc::now());
    }
    map.insert(key, entry);
}

// ============ JSON file cache ============

/// Cache backed by a single JSON document.
pub struct JsonFileCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl JsonFileCache {
    /// Open the cache at `path`. Never fails: unreadable or corrupt files
    /// start empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        debug!(path = %path.display(), entries = entries.len(), "cache loaded");
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) {
        if let Err(e) = write_entries(&self.path, &self.entries) {
            warn!(path = %self.path.display(), error = %e, "cache write failed");
        }
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, CacheEntry> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cache unreadable, starting empty");
            return BTreeMap::new();
        }
    };

    let raw: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(&content) {
        Ok(m) => m,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cache is not a JSON object, starting empty");
            return BTreeMap::new();
        }
    };

    let mut entries = BTreeMap::new();
    for (key, value) in raw {
        match serde_json::from_value::<CacheEntry>(value) {
            Ok(mut entry) => {
                entry.key = key.clone();
                entries.insert(key, entry);
            }
            Err(e) => warn!(key = %key, error = %e, "skipping malformed cache entry"),
        }
    }
    entries
}

fn write_entries(path: &Path, entries: &BTreeMap<String, CacheEntry>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(entries)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl AnswerCache for JsonFileCache {
    fn get(&self, query: &str) -> Option<CacheEntry> {
        lookup(&self.entries, query)
    }

    fn put(&mut self, query: &str, entry: CacheEntry) {
        insert(&mut self.entries, query, entry);
        self.save();
    }

    fn entries(&self) -> Vec<CacheEntry> {
        self.entries.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// ============ In-memory cache ============

/// Process-local cache with no persistence (`raya ask --no-cache`, tests).
#[derive(Default)]
pub struct MemoryCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnswerCache for MemoryCache {
    fn get(&self, query: &str) -> Option<CacheEntry> {
        lookup(&self.entries, query)
    }

    fn put(&mut self, query: &str, entry: CacheEntry) {
        insert(&mut self.entries, query, entry);
    }

    fn entries(&self) -> Vec<CacheEntry> {
        self.entries.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = JsonFileCache::open(&path);
        assert!(cache.is_empty());
        cache.put("What is X?", CacheEntry::new("X", "src", 0.8, Metadata::new()));

        let hit = cache.get("what is x").unwrap();
        assert_eq!(hit.text, "X");
        assert_eq!(hit.source, "src");
        assert_eq!(hit.key, "what is x");

        let reopened = JsonFileCache::open(&path);
        let hit = reopened.get("WHAT IS X").unwrap();
        assert_eq!(hit.text, "X");
        assert!((hit.confidence - 0.8).abs() < 1e-9);
        assert_eq!(hit.sources.get("src"), Some(&true));
    }

    #[test]
    fn last_write_wins() {
        let mut cache = MemoryCache::new();
        cache.put("q", CacheEntry::new("first", "a", 0.5, Metadata::new()));
        cache.put("Q!", CacheEntry::new("second", "b", 0.6, Metadata::new()));
        assert_eq!(cache.len(), 1);
        let hit = cache.get("q").unwrap();
        assert_eq!(hit.text, "second");
        assert_eq!(hit.source, "b");
    }

    #[test]
    fn stale_entries_are_misses() {
        let mut cache = MemoryCache::new();
        cache.put(
            "q",
            CacheEntry::new("[cloud disabled] OPENAI_API_KEY not set", "cloud_model", 0.9, Metadata::new()),
        );
        assert!(cache.get("q").is_none());
        assert_eq!(cache.entries().len(), 1);

        cache.put("r", CacheEntry::new("[local error] timeout", "local_model", 0.0, Metadata::new()));
        assert!(cache.get("r").is_none());
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::open(dir.path().join("absent.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();
        let cache = JsonFileCache::open(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn reads_legacy_answer_field_and_skips_bad_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(
            &path,
            r#"{
  "capital of france": {"answer": "Paris", "sources": {"wikipedia": true}},
  "broken": 42
}"#,
        )
        .unwrap();
        let cache = JsonFileCache::open(&path);
        assert_eq!(cache.len(), 1);
        let hit = cache.get("Capital of France?").unwrap();
        assert_eq!(hit.text, "Paris");
        assert_eq!(hit.source, "cache");
        assert!((hit.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn file_is_pretty_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let mut cache = JsonFileCache::open(&path);
        cache.put("café", CacheEntry::new("Un café noir", "knowledge", 0.95, Metadata::new()));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Un café noir"));
        assert!(raw.contains("\n  \"café\": {"));
        assert!(raw.contains("\"meta\""));
    }

    #[test]
    fn write_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("cache.json");
        std::fs::create_dir_all(&path).unwrap();
        let mut cache = JsonFileCache::open(&path);
        cache.put("q", CacheEntry::new("kept in memory", "web", 0.7, Metadata::new()));
        assert_eq!(cache.get("q").unwrap().text, "kept in memory");
    }
}
