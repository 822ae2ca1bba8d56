//! Local notes search.
//!
//! Walks the configured notes directory, keeps files matching the include
//! globs (and none of the exclude globs), and returns the most recently
//! modified note whose body contains the question-stripped query,
//! case-insensitively. The directory is re-scanned on every call so edits
//! are picked up without a restart.

use anyhow::Result;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use std::time::SystemTime;
use walkdir::WalkDir;

use crate::config::NotesConfig;
use crate::models::Metadata;
use crate::text::{strip_question_prefix, truncate_chars};
use crate::traits::{AskContext, Attempt, SourceAdapter, SourceError};

pub const LABEL: &str = "custom_db";

const CONFIDENCE: f64 = 0.9;

/// A note that matched a query.
#[derive(Debug, Clone)]
pub struct NoteHit {
    pub relative_path: String,
    pub modified: SystemTime,
    pub body: String,
}

pub struct NotesSource {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
    follow_symlinks: bool,
    max_chars: usize,
}

impl NotesSource {
    pub fn new(config: &NotesConfig) -> Result<Self> {
        let include = build_globset(&config.include_globs)?;

        let mut excludes = vec![
            "**/.git/**".to_string(),
            "**/target/**".to_string(),
            "**/node_modules/**".to_string(),
        ];
        excludes.extend(config.exclude_globs.iter().cloned());
        let exclude = build_globset(&excludes)?;

        Ok(Self {
            root: config.root.clone(),
            include,
            exclude,
            follow_symlinks: config.follow_symlinks,
            max_chars: config.max_chars,
        })
    }

    /// Newest note containing `needle` (already lower-cased).
    pub fn search(&self, needle: &str) -> Result<Option<NoteHit>, SourceError> {
        if !self.root.is_dir() {
            return Ok(None);
        }

        let mut best: Option<NoteHit> = None;
        let walker = WalkDir::new(&self.root).follow_links(self.follow_symlinks);
        for entry in walker {
            let entry = entry.map_err(|e| SourceError::Io(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if self.exclude.is_match(&rel_str) || !self.include.is_match(&rel_str) {
                continue;
            }

            // Non-UTF-8 files are skipped.
            let Ok(body) = std::fs::read_to_string(path) else {
                continue;
            };
            if !body.to_lowercase().contains(needle) {
                continue;
            }

            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);

            let newer = match &best {
                None => true,
                Some(b) => {
                    modified > b.modified
                        || (modified == b.modified && rel_str < b.relative_path)
                }
            };
            if newer {
                best = Some(NoteHit {
                    relative_path: rel_str,
                    modified,
                    body,
                });
            }
        }
        Ok(best)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

impl SourceAdapter for NotesSource {
    fn label(&self) -> &str {
        LABEL
    }

    fn description(&self) -> &str {
        "Local notes directory (substring match, newest first)"
    }

    fn try_resolve(&self, query: &str, _ctx: &AskContext) -> Attempt {
        let needle = strip_question_prefix(query);
        if needle.is_empty() {
            return Attempt::no_answer("empty query");
        }

        match self.search(&needle) {
            Ok(Some(hit)) => {
                let mut meta = Metadata::new();
                meta.insert("path".to_string(), hit.relative_path.into());
                let modified: DateTime<Utc> = hit.modified.into();
                meta.insert("modified".to_string(), modified.to_rfc3339().into());
                Attempt::answered(truncate_chars(&hit.body, self.max_chars), CONFIDENCE)
                    .with_metadata(meta)
            }
            Ok(None) => Attempt::no_answer("no note mentions the query"),
            Err(e) => Attempt::Failed(e),
        }
    }
}
