//! Formats the selected answer and its extras into one display string.
//!
//! ```text
//! Main Answer (Reference):
//! <winner text>
//!
//! Local notes:
//! <first extra from custom_db>
//! ```
//!
//! At most one block is emitted per source label; later candidates from an
//! already-used label are skipped.

use std::collections::HashSet;

use crate::models::Candidate;
use crate::text::{title_case, truncate_chars};

pub const NO_ANSWER: &str = "I couldn't find an answer.";
pub const BLOCK_CHARS: usize = 1200;

/// Human-readable heading for a source label. Unknown labels are
/// title-cased.
pub fn heading(label: &str) -> String {
    let known = match label {
        "custom_db" => "Local notes",
        "wikipedia" => "Reference",
        "news" => "News hits",
        "arxiv" => "Research",
        "knowledge" | "cache" => "Curated Knowledge",
        "web" => "Web Search",
        "local_model" => "Local Model",
        "cloud_model" => "Cloud Model",
        other => return title_case(other),
    };
    known.to_string()
}

pub fn aggregate(winner: Option<&Candidate>, extras: &[Candidate]) -> String {
    let Some(winner) = winner else {
        return NO_ANSWER.to_string();
    };

    let mut blocks = vec![format!(
        "Main Answer ({}):\n{}",
        heading(&winner.source),
        truncate_chars(&winner.text, BLOCK_CHARS)
    )];

    let mut used: HashSet<&str> = HashSet::new();
    used.insert(winner.source.as_str());
    for extra in extras {
        if extra.text.trim().is_empty() || !used.insert(extra.source.as_str()) {
            continue;
        }
        blocks.push(format!(
            "{}:\n{}",
            heading(&extra.source),
            truncate_chars(&extra.text, BLOCK_CHARS)
        ));
    }

    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(source: &str, text: &str) -> Candidate {
        Candidate::new(source, text, 0.8, None).unwrap()
    }

    #[test]
    fn no_winner_gives_fixed_message() {
        assert_eq!(aggregate(None, &[]), NO_ANSWER);
    }

    #[test]
    fn headings_map_known_and_title_case_unknown() {
        assert_eq!(heading("custom_db"), "Local notes");
        assert_eq!(heading("knowledge"), "Curated Knowledge");
        assert_eq!(heading("my_source"), "My_Source");
        assert_eq!(heading("forum"), "Forum");
    }

    #[test]
    fn one_block_per_label() {
        let winner = cand("knowledge", "Short fact.");
        let extras = vec![
            cand("wikipedia", "First article."),
            cand("wikipedia", "Second article."),
            cand("knowledge", "Duplicate of winner label."),
            cand("news", "Headline"),
        ];
        let out = aggregate(Some(&winner), &extras);
        assert_eq!(
            out,
            "Main Answer (Curated Knowledge):\nShort fact.\n\nReference:\nFirst article.\n\nNews hits:\nHeadline"
        );
        assert_eq!(out.matches("Reference").count(), 1);
    }

    #[test]
    fn winner_label_suppresses_same_label_extras() {
        let winner = cand("wikipedia", "Paris is the capital of France.");
        let extras = vec![
            cand("wikipedia", "Paris (disambiguation)."),
            cand("wikipedia", "Île-de-France is a region."),
        ];
        let out = aggregate(Some(&winner), &extras);
        assert_eq!(out, "Main Answer (Reference):\nParis is the capital of France.");
        assert_eq!(out.matches("Reference").count(), 1);
    }

    #[test]
    fn long_text_is_truncated_with_ellipsis() {
        let winner = cand("wikipedia", &"a".repeat(1500));
        let out = aggregate(Some(&winner), &[]);
        let body = out.strip_prefix("Main Answer (Reference):\n").unwrap();
        assert_eq!(body, format!("{}...", "a".repeat(1200)));
    }
}
