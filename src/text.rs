//! Text helpers shared by the cache, the lookup sources and the aggregator.
//!
//! | Function | Used by |
//! |----------|---------|
//! | [`normalize_query`] | cache keys, router length rule |
//! | [`strip_question_prefix`] | knowledge and notes lookups |
//! | [`clean_query`] | encyclopedia and web lookups |
//! | [`first_sentences`] | encyclopedia summaries |
//! | [`title_case`] | aggregator headings for unknown labels |
//! | [`truncate_chars`] | aggregator blocks, notes excerpts |
//! | [`similarity`] | fuzzy knowledge matching |

use once_cell::sync::Lazy;
use regex::Regex;

static QUESTION_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(what is|who is|define|tell me about|explain|how old is)\s+")
        .expect("static regex")
});
static LEADING_ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(a|an|the)\s+").expect("static regex"));
static WHO_IS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(who|whos|who's)\s+(is|was)\s+").expect("static regex"));
static WHAT_IS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^what\s+(is|are)\s+").expect("static regex"));

/// Normalize a query into its cache key form.
///
/// Lowercases, drops every character that is not alphanumeric, `_` or
/// whitespace, and collapses runs of whitespace into single spaces. The
/// result is a fixed point: `normalize_query(normalize_query(x)) ==
/// normalize_query(x)`.
pub fn normalize_query(query: &str) -> String {
    let kept: String = query
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase and remove a leading question phrase, then a leading article.
///
/// `"What is the Eiffel Tower"` becomes `"eiffel tower"`.
pub fn strip_question_prefix(query: &str) -> String {
    let q = query.trim().to_lowercase();
    let q = QUESTION_PREFIX.replace(&q, "");
    let q = LEADING_ARTICLE.replace(&q, "");
    q.trim().to_string()
}

/// Tidy a query for title-based lookups, keeping its original casing.
pub fn clean_query(query: &str) -> String {
    let collapsed = query.split_whitespace().collect::<Vec<_>>().join(" ");
    let q = WHO_IS.replace(&collapsed, "");
    let q = WHAT_IS.replace(&q, "");
    q.trim_matches(|c: char| matches!(c, ' ' | '?' | '!' | '.' | ','))
        .to_string()
}

/// Return the first `n` sentences of `text`.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace or the end of
/// the text. If fewer than `n` sentences exist the whole text is returned.
pub fn first_sentences(text: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let mut count = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = match chars.peek() {
            None => true,
            Some((_, next)) => next.is_whitespace(),
        };
        if at_boundary {
            count += 1;
            if count == n {
                return text[..i + c.len_utf8()].trim().to_string();
            }
        }
    }
    text.trim().to_string()
}

/// Upper-case each letter that follows a non-letter, lower-case the rest.
pub fn title_case(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut prev_letter = false;
    for c in label.chars() {
        if c.is_alphabetic() {
            if prev_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(c);
            prev_letter = false;
        }
    }
    out
}

/// Trim `text` and bound it to `limit` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    let t = text.trim();
    if t.chars().count() <= limit {
        return t.to_string();
    }
    let mut out: String = t.chars().take(limit).collect();
    out.push_str("...");
    out
}

/// Similarity ratio in `[0, 1]` derived from the Levenshtein distance.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64 / max_len as f64)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in dp[0].iter_mut().enumerate() {
        *val = j;
    }
    for i in 1..=m {
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[m][n]
}
