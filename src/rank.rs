//! Candidate scoring and selection.
//!
//! `score = confidence × min(chars / 100, 3.0)`: confidence dominates, short
//! answers are penalized in proportion to their length, and length stops
//! counting past 300 characters. Sorting is stable, so equal scores keep
//! discovery order.

use crate::models::Candidate;

const LENGTH_UNIT: f64 = 100.0;
const LENGTH_CAP: f64 = 3.0;

pub fn score(candidate: &Candidate) -> f64 {
    let chars = candidate.text.chars().count() as f64;
    candidate.confidence * (chars / LENGTH_UNIT).min(LENGTH_CAP)
}

/// Pick the best candidate; the rest are returned as extras in score order.
pub fn select(candidates: Vec<Candidate>) -> Option<(Candidate, Vec<Candidate>)> {
    let mut scored: Vec<(f64, Candidate)> =
        candidates.into_iter().map(|c| (score(&c), c)).collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranked = scored.into_iter().map(|(_, c)| c);
    let winner = ranked.next()?;
    Some((winner, ranked.collect()))
}
