//! # Matcher
//!
//! Pairs each observed title with at most one canonical catalog movie.
//! Exact normalized equality wins outright; otherwise a containment match
//! applies when one normalized title is a substantial substring of the
//! other. Two floors keep containment honest:
//!
//! - absolute: the shorter title must be at least 5 characters, so "up"
//!   can never ride along inside a longer title;
//! - relative: the shorter must be at least half the longer, so "bond"
//!   padded out to a re-release banner does not match.
//!
//! When several catalog entries qualify, the highest score wins; equal
//! scores fall back to catalog iteration order.

use crate::catalog::MovieRef;
use crate::normalize::normalize;
use crate::scrape::types::ObservedMovie;

/// Shorter side of a containment pair must be at least this long.
const CONTAINMENT_MIN_LEN: usize = 5;
/// ... and at least this fraction of the longer side.
const CONTAINMENT_MIN_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Partial,
    None,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MatchResult {
    pub observed: ObservedMovie,
    pub movie_id: Option<i64>,
    pub movie_title: Option<String>,
    pub kind: MatchKind,
    pub score: f64,
}

impl MatchResult {
    fn none(observed: &ObservedMovie) -> Self {
        Self {
            observed: observed.clone(),
            movie_id: None,
            movie_title: None,
            kind: MatchKind::None,
            score: 0.0,
        }
    }

    pub fn is_match(&self) -> bool {
        self.kind != MatchKind::None
    }
}

/// Catalog refs with their normalized titles computed once per run.
/// Entries whose titles normalize to empty are unmatchable and dropped.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    entries: Vec<IndexEntry>,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    id: i64,
    title: String,
    normalized: String,
}

impl CatalogIndex {
    pub fn build(refs: &[MovieRef]) -> Self {
        let entries = refs
            .iter()
            .filter_map(|r| {
                let normalized = normalize(&r.title);
                if normalized.is_empty() {
                    tracing::warn!(id = r.id, title = %r.title, "catalog title normalizes to empty, skipping");
                    return None;
                }
                Some(IndexEntry {
                    id: r.id,
                    title: r.title.clone(),
                    normalized,
                })
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Find the best canonical movie for one observation, or declare no match.
/// Callers must have run the reject filter first; an empty normalized title
/// always yields `MatchKind::None`.
pub fn match_observed(observed: &ObservedMovie, index: &CatalogIndex) -> MatchResult {
    if observed.normalized.is_empty() {
        return MatchResult::none(observed);
    }

    let mut best = MatchResult::none(observed);
    for entry in &index.entries {
        if entry.normalized == observed.normalized {
            return MatchResult {
                observed: observed.clone(),
                movie_id: Some(entry.id),
                movie_title: Some(entry.title.clone()),
                kind: MatchKind::Exact,
                score: 1.0,
            };
        }
        if let Some(score) = containment_score(&observed.normalized, &entry.normalized) {
            if score > best.score {
                best = MatchResult {
                    observed: observed.clone(),
                    movie_id: Some(entry.id),
                    movie_title: Some(entry.title.clone()),
                    kind: MatchKind::Partial,
                    score,
                };
            }
        }
    }
    best
}

/// Length-ratio score when one normalized title contains the other and
/// both floors hold, else `None`.
fn containment_score(a: &str, b: &str) -> Option<f64> {
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = shorter.chars().count();
    let long_len = longer.chars().count();
    if short_len < CONTAINMENT_MIN_LEN {
        return None;
    }
    if !longer.contains(shorter) {
        return None;
    }
    let ratio = short_len as f64 / long_len as f64;
    if ratio < CONTAINMENT_MIN_RATIO {
        return None;
    }
    Some(ratio)
}
