//! # Reconciler
//!
//! Recomputes every canonical movie's showing status from this run's match
//! results. The sources are the sole ground truth: a movie no source
//! mentioned this run ends the run not-showing with an empty source set.
//!
//! The full next-state is computed in memory first and applied as a
//! minimal diff, so only rows whose source set or showing flag actually
//! changed are written. That keeps the observable semantics of a
//! reset-then-apply sweep while narrowing the window in which concurrent
//! readers can see a half-reconciled catalog.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use chrono::Utc;

use crate::catalog::{CatalogStore, StatusUpdate};
use crate::matcher::MatchResult;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ReconcileSummary {
    pub observed: usize,
    pub matched: usize,
    pub updated: usize,
    pub errors: usize,
    /// Capped sample of titles that matched nothing. Informational only;
    /// unmatched titles never create catalog rows.
    pub unmatched: Vec<String>,
}

/// Apply one run's match results to the catalog. A write failure on one
/// movie is logged, counted, and skipped; a catalog read failure is fatal.
pub async fn reconcile(
    matches: &[MatchResult],
    catalog: &dyn CatalogStore,
    unmatched_cap: usize,
) -> Result<ReconcileSummary> {
    // Next state: canonical id -> set of sources reporting it this run.
    // Matches from different sources accumulate; set semantics make a
    // repeat sighting from the same source a no-op.
    let mut desired: BTreeMap<i64, BTreeSet<String>> = BTreeMap::new();
    let mut unmatched = Vec::new();
    let mut matched = 0usize;

    for m in matches {
        match m.movie_id {
            Some(id) if m.is_match() => {
                matched += 1;
                desired
                    .entry(id)
                    .or_default()
                    .insert(m.observed.source_key.clone());
            }
            _ => {
                if unmatched.len() < unmatched_cap
                    && !unmatched.contains(&m.observed.raw_title)
                {
                    unmatched.push(m.observed.raw_title.clone());
                }
            }
        }
    }

    let current = catalog
        .load_all()
        .await
        .context("loading catalog for reconciliation")?;

    let now = Utc::now();
    let mut updated = 0usize;
    let mut errors = 0usize;

    for movie in &current {
        let next_sources = desired.remove(&movie.id).unwrap_or_default();
        let next_showing = !next_sources.is_empty();
        if movie.sources == next_sources && movie.currently_showing == next_showing {
            continue;
        }
        let update = StatusUpdate {
            sources: next_sources,
            currently_showing: next_showing,
            last_reconciled: now,
        };
        match catalog.update_status(movie.id, &update).await {
            Ok(()) => updated += 1,
            Err(e) => {
                tracing::warn!(error = ?e, id = movie.id, title = %movie.title, "status write failed, skipping movie");
                errors += 1;
            }
        }
    }

    // Matches against rows that vanished between the read and the write.
    for (id, _) in desired {
        tracing::debug!(id, "matched movie no longer in catalog");
    }

    Ok(ReconcileSummary {
        observed: matches.len(),
        matched,
        updated,
        errors,
        unmatched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CanonicalMovie, MemoryCatalog};
    use crate::matcher::{CatalogIndex, match_observed};
    use crate::scrape::types::ObservedMovie;

    async fn run(catalog: &MemoryCatalog, sightings: &[(&str, &str)]) -> ReconcileSummary {
        let refs = crate::catalog::CatalogStore::list_refs(catalog).await.unwrap();
        let index = CatalogIndex::build(&refs);
        let matches: Vec<MatchResult> = sightings
            .iter()
            .map(|(src, title)| match_observed(&ObservedMovie::new(src, title), &index))
            .collect();
        reconcile(&matches, catalog, 20).await.unwrap()
    }

    #[tokio::test]
    async fn sources_accumulate_across_adapters() {
        let cat = MemoryCatalog::seeded([CanonicalMovie::new(1, "Oppenheimer")]);
        let s = run(&cat, &[("vox", "Oppenheimer"), ("cineco", "OPPENHEIMER (IMAX)")]).await;
        assert_eq!(s.matched, 2);
        assert_eq!(s.updated, 1);

        let m = cat.get(1).unwrap();
        assert!(m.currently_showing);
        assert_eq!(
            m.sources,
            BTreeSet::from(["vox".to_string(), "cineco".to_string()])
        );
    }

    #[tokio::test]
    async fn rerun_with_same_input_is_idempotent() {
        let cat = MemoryCatalog::seeded([CanonicalMovie::new(1, "Barbie")]);
        let first = run(&cat, &[("vox", "Barbie")]).await;
        let after_first = cat.get(1).unwrap();
        let second = run(&cat, &[("vox", "Barbie")]).await;
        let after_second = cat.get(1).unwrap();

        assert_eq!(first.updated, 1);
        // Nothing changed, so the diff writes nothing the second time.
        assert_eq!(second.updated, 0);
        assert_eq!(after_first.sources, after_second.sources);
        assert_eq!(after_first.currently_showing, after_second.currently_showing);
    }

    #[tokio::test]
    async fn disappearance_clears_status_next_run() {
        let cat = MemoryCatalog::seeded([CanonicalMovie::new(1, "Barbie")]);
        run(&cat, &[("vox", "Barbie")]).await;
        assert!(cat.get(1).unwrap().currently_showing);

        let s = run(&cat, &[]).await;
        let m = cat.get(1).unwrap();
        assert_eq!(s.updated, 1);
        assert!(!m.currently_showing);
        assert!(m.sources.is_empty());
    }

    #[tokio::test]
    async fn unmatched_sample_is_capped_and_deduped() {
        let cat = MemoryCatalog::seeded([CanonicalMovie::new(1, "Oppenheimer")]);
        let refs = crate::catalog::CatalogStore::list_refs(&cat).await.unwrap();
        let index = CatalogIndex::build(&refs);
        let matches: Vec<MatchResult> = (0..30)
            .map(|i| {
                match_observed(
                    &ObservedMovie::new("vox", &format!("Unknown Feature {i}")),
                    &index,
                )
            })
            .chain(std::iter::once(match_observed(
                &ObservedMovie::new("cineco", "Unknown Feature 0"),
                &index,
            )))
            .collect();
        let s = reconcile(&matches, &cat, 20).await.unwrap();
        assert_eq!(s.unmatched.len(), 20);
        assert_eq!(s.matched, 0);
    }

    #[tokio::test]
    async fn coming_soon_is_never_clobbered() {
        let cat = MemoryCatalog::seeded([CanonicalMovie {
            coming_soon: true,
            ..CanonicalMovie::new(1, "Wonka")
        }]);
        run(&cat, &[("vox", "Wonka")]).await;
        assert!(cat.get(1).unwrap().coming_soon);
    }
}
