// src/scrape/mod.rs
//! The scrape pipeline: fan out to source adapters, aggregate their raw
//! titles into run-scoped observations, match those against the catalog,
//! and reconcile showing status. One run at a time; the external trigger
//! is responsible for not overlapping runs.

pub mod adapters;
pub mod config;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use metrics::{counter, gauge};

use crate::catalog::CatalogStore;
use crate::denylist::RejectList;
use crate::matcher::{match_observed, CatalogIndex, MatchResult};
use crate::reconcile::{reconcile, ReconcileSummary};
use crate::runlog::{RunCounts, RunKind, RunLogStore};
use crate::scrape::config::ScrapeConfig;
use crate::scrape::types::{ObservedMovie, SourceAdapter, SourceFetch};

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateCounts {
    pub titles: usize,
    pub kept: usize,
    pub skipped: usize,
    pub duplicates: usize,
}

/// Merge raw adapter results into the run's observation list. Within one
/// source the same normalized title is kept once (pagination and carousel
/// repeats), first occurrence wins. Across sources nothing is deduplicated:
/// the reconciler needs every source reporting a movie.
pub fn aggregate(fetches: &[SourceFetch], reject: &RejectList) -> (Vec<ObservedMovie>, AggregateCounts) {
    let mut counts = AggregateCounts::default();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out = Vec::new();

    for fetch in fetches {
        for raw in &fetch.titles {
            counts.titles += 1;
            let obs = ObservedMovie::new(&fetch.source_key, raw);
            if obs.normalized.is_empty() || reject.should_skip_normalized(&obs.normalized) {
                counts.skipped += 1;
                continue;
            }
            if !seen.insert((obs.source_key.clone(), obs.normalized.clone())) {
                counts.duplicates += 1;
                continue;
            }
            counts.kept += 1;
            out.push(obs);
        }
    }

    counter!("scrape_kept_total").increment(counts.kept as u64);
    counter!("scrape_skipped_total").increment(counts.skipped as u64);
    counter!("scrape_dupes_total").increment(counts.duplicates as u64);

    (out, counts)
}

/// Fetch from all adapters concurrently, each bounded by `timeout`. A
/// timed-out adapter is indistinguishable from a failed one: empty titles,
/// error flagged.
pub async fn fan_out(adapters: &[Arc<dyn SourceAdapter>], timeout: Duration) -> Vec<SourceFetch> {
    let mut handles = Vec::with_capacity(adapters.len());
    for adapter in adapters {
        let adapter = Arc::clone(adapter);
        let key = adapter.key();
        handles.push((
            key,
            tokio::spawn(async move { tokio::time::timeout(timeout, adapter.fetch()).await }),
        ));
    }

    let mut out = Vec::with_capacity(handles.len());
    for (key, handle) in handles {
        let fetch = match handle.await {
            Ok(Ok(fetch)) => fetch,
            Ok(Err(_elapsed)) => {
                tracing::warn!(source = key, timeout_secs = timeout.as_secs(), "adapter timed out");
                counter!("scrape_source_errors_total").increment(1);
                SourceFetch::failed(key, format!("timed out after {}s", timeout.as_secs()))
            }
            Err(e) => {
                tracing::warn!(error = ?e, source = key, "adapter task panicked");
                counter!("scrape_source_errors_total").increment(1);
                SourceFetch::failed(key, e)
            }
        };
        out.push(fetch);
    }
    out
}

/// Synchronous result of one triggered scrape run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScrapeSummary {
    pub run_id: u64,
    pub observed: usize,
    pub matched: usize,
    pub updated: usize,
    pub errors: usize,
    pub source_errors: usize,
    pub unmatched: Vec<String>,
}

struct PipelineOutcome {
    reconcile: ReconcileSummary,
    source_errors: usize,
}

/// Run the whole pipeline once. The run-log entry is opened before any
/// scraping and finalized exactly once on every path, including the
/// wall-clock budget expiring mid-run.
pub async fn run_once(
    adapters: &[Arc<dyn SourceAdapter>],
    catalog: &dyn CatalogStore,
    runs: &dyn RunLogStore,
    cfg: &ScrapeConfig,
) -> Result<ScrapeSummary> {
    crate::metrics::describe_scrape_series();
    counter!("scrape_runs_total").increment(1);

    let run_id = runs.start(RunKind::Scrape).await.context("opening run log")?;

    match tokio::time::timeout(cfg.run_budget(), run_pipeline(adapters, catalog, cfg)).await {
        Ok(Ok(outcome)) => {
            let counts = RunCounts {
                observed: outcome.reconcile.observed,
                matched: outcome.reconcile.matched,
                updated: outcome.reconcile.updated,
                errors: outcome.reconcile.errors + outcome.source_errors,
            };
            runs.complete(run_id, counts, outcome.reconcile.unmatched.clone())
                .await?;
            gauge!("scrape_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
            tracing::info!(
                run_id,
                observed = counts.observed,
                matched = counts.matched,
                updated = counts.updated,
                errors = counts.errors,
                "scrape run completed"
            );
            Ok(ScrapeSummary {
                run_id,
                observed: counts.observed,
                matched: counts.matched,
                updated: counts.updated,
                errors: counts.errors,
                source_errors: outcome.source_errors,
                unmatched: outcome.reconcile.unmatched,
            })
        }
        Ok(Err(e)) => {
            tracing::error!(run_id, error = ?e, "scrape run failed");
            runs.fail(run_id, &format!("{e:#}")).await?;
            Err(e)
        }
        Err(_) => {
            let msg = format!("run budget of {}s exceeded", cfg.run_budget_secs);
            tracing::error!(run_id, "{msg}");
            runs.fail(run_id, &msg).await?;
            Err(anyhow!(msg))
        }
    }
}

async fn run_pipeline(
    adapters: &[Arc<dyn SourceAdapter>],
    catalog: &dyn CatalogStore,
    cfg: &ScrapeConfig,
) -> Result<PipelineOutcome> {
    // Catalog read failure is fatal: no partial reconciliation.
    let refs = catalog
        .list_refs()
        .await
        .context("loading catalog for matching")?;
    let index = CatalogIndex::build(&refs);

    let fetches = fan_out(adapters, cfg.adapter_timeout()).await;
    let source_errors = fetches.iter().filter(|f| f.error.is_some()).count();
    for f in fetches.iter().filter(|f| f.error.is_some()) {
        tracing::warn!(source = %f.source_key, error = %f.error.as_deref().unwrap_or(""), "source contributed nothing");
    }

    let reject = RejectList::with_extra(&cfg.extra_denylist);
    let (observed, agg) = aggregate(&fetches, &reject);
    tracing::debug!(
        titles = agg.titles,
        kept = agg.kept,
        skipped = agg.skipped,
        duplicates = agg.duplicates,
        "aggregated observations"
    );

    let matches: Vec<MatchResult> = observed
        .iter()
        .map(|o| match_observed(o, &index))
        .collect();

    let summary = reconcile(&matches, catalog, cfg.unmatched_sample_cap).await?;
    Ok(PipelineOutcome {
        reconcile: summary,
        source_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_dedups_within_source_only() {
        let reject = RejectList::builtin();
        let fetches = vec![
            SourceFetch::ok("vox", vec!["Barbie".into(), "Barbie (IMAX)".into()]),
            SourceFetch::ok("cineco", vec!["Barbie".into()]),
        ];
        let (obs, counts) = aggregate(&fetches, &reject);
        // "Barbie" and "Barbie (IMAX)" normalize identically: one kept for
        // vox, and cineco's sighting stays separate.
        assert_eq!(obs.len(), 2);
        assert_eq!(counts.duplicates, 1);
        assert_eq!(obs[0].source_key, "vox");
        assert_eq!(obs[1].source_key, "cineco");
    }

    #[test]
    fn aggregate_applies_reject_filter() {
        let reject = RejectList::builtin();
        let fetches = vec![SourceFetch::ok(
            "vox",
            vec!["Book Now".into(), "Oppenheimer".into(), "12".into()],
        )];
        let (obs, counts) = aggregate(&fetches, &reject);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].normalized, "oppenheimer");
        assert_eq!(counts.skipped, 2);
    }

    #[test]
    fn failed_fetch_contributes_nothing() {
        let reject = RejectList::builtin();
        let fetches = vec![
            SourceFetch::failed("vox", "connection refused"),
            SourceFetch::ok("cineco", vec!["Oppenheimer".into()]),
        ];
        let (obs, _) = aggregate(&fetches, &reject);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].source_key, "cineco");
    }
}
