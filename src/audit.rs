//! # Staleness auditor
//!
//! Corrective passes that run independently of scraping and are safe at any
//! time. All of them work off one catalog snapshot:
//!
//! - showing repair: `currently_showing` with an empty source set violates
//!   the catalog invariant (a partial run failure can leave it behind) and
//!   gets cleared;
//! - coming-soon repair: a `coming_soon` flag with no live source behind it
//!   is stale promotion and gets cleared;
//! - orphan purge: a movie that is not showing, not coming soon, and has no
//!   sources is leftover ingestion data and is deleted. Because the purge
//!   is destructive it always supports a dry run that reports the exact
//!   candidate set without committing.
//!
//! A movie a repair pass just cleared still counts as showing or coming-soon
//! in this snapshot, so it is purged no earlier than the next audit.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};

use crate::catalog::{CatalogStore, MovieRef, StatusUpdate};
use crate::runlog::{RunCounts, RunKind, RunLogStore};

/// Run-log records left `Running` longer than this are reported as stuck.
const STUCK_RUN_AGE_SECS: i64 = 3600;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AuditReport {
    pub dry_run: bool,
    /// Movies scanned from the catalog snapshot.
    pub scanned: usize,
    /// Movies marked showing with an empty source set, now cleared.
    pub showing_cleared: Vec<MovieRef>,
    /// Movies whose stale coming-soon flag was (or would be) cleared.
    pub coming_soon_cleared: Vec<MovieRef>,
    /// Movies deleted (or, in a dry run, that would be deleted).
    pub purge_candidates: Vec<MovieRef>,
    pub purged: usize,
    pub errors: usize,
    /// Run-log entries stuck in `running`; reported, never auto-repaired.
    pub stuck_runs: usize,
}

/// Execute the corrective passes. With `dry_run` set, nothing is written
/// or deleted and no run-log entry is appended; the report carries exactly
/// what a real pass would change.
pub async fn run_audit(
    catalog: &dyn CatalogStore,
    runs: &dyn RunLogStore,
    dry_run: bool,
) -> Result<AuditReport> {
    let run_id = if dry_run {
        None
    } else {
        Some(runs.start(RunKind::Audit).await?)
    };

    let report = match audit_catalog(catalog, runs, dry_run).await {
        Ok(report) => report,
        Err(e) => {
            if let Some(id) = run_id {
                runs.fail(id, &format!("{e:#}")).await?;
            }
            return Err(e);
        }
    };

    if let Some(id) = run_id {
        let counts = RunCounts {
            observed: report.scanned,
            matched: 0,
            updated: report.showing_cleared.len()
                + report.coming_soon_cleared.len()
                + report.purged,
            errors: report.errors,
        };
        runs.complete(id, counts, Vec::new()).await?;
    }
    Ok(report)
}

async fn audit_catalog(
    catalog: &dyn CatalogStore,
    runs: &dyn RunLogStore,
    dry_run: bool,
) -> Result<AuditReport> {
    let snapshot = catalog
        .load_all()
        .await
        .context("loading catalog for audit")?;

    let mut report = AuditReport {
        dry_run,
        scanned: snapshot.len(),
        ..AuditReport::default()
    };

    for movie in &snapshot {
        let r = MovieRef {
            id: movie.id,
            title: movie.title.clone(),
        };
        if movie.currently_showing && movie.sources.is_empty() {
            if dry_run {
                report.showing_cleared.push(r);
                continue;
            }
            let update = StatusUpdate {
                sources: BTreeSet::new(),
                currently_showing: false,
                last_reconciled: Utc::now(),
            };
            match catalog.update_status(movie.id, &update).await {
                Ok(()) => report.showing_cleared.push(r),
                Err(e) => {
                    tracing::warn!(error = ?e, id = movie.id, "showing repair failed, skipping");
                    report.errors += 1;
                }
            }
        } else if movie.coming_soon && movie.sources.is_empty() {
            if dry_run {
                report.coming_soon_cleared.push(r);
                continue;
            }
            match catalog.set_coming_soon(movie.id, false).await {
                Ok(()) => report.coming_soon_cleared.push(r),
                Err(e) => {
                    tracing::warn!(error = ?e, id = movie.id, "coming-soon repair failed, skipping");
                    report.errors += 1;
                }
            }
        } else if !movie.currently_showing && !movie.coming_soon && movie.sources.is_empty() {
            report.purge_candidates.push(r.clone());
            if dry_run {
                continue;
            }
            match catalog.delete(movie.id).await {
                Ok(()) => {
                    tracing::info!(id = movie.id, title = %movie.title, "purged orphan movie");
                    report.purged += 1;
                }
                Err(e) => {
                    tracing::warn!(error = ?e, id = movie.id, "orphan purge failed, skipping");
                    report.errors += 1;
                }
            }
        }
    }

    let stuck = runs.stuck(Duration::seconds(STUCK_RUN_AGE_SECS)).await?;
    for rec in &stuck {
        tracing::warn!(run_id = rec.id, started_at = %rec.started_at, "run log entry stuck in running state");
    }
    report.stuck_runs = stuck.len();

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CanonicalMovie, MemoryCatalog};
    use crate::runlog::{MemoryRunLog, RunStatus};
    use std::collections::BTreeSet;

    fn showing(id: i64, title: &str, source: &str) -> CanonicalMovie {
        CanonicalMovie {
            sources: BTreeSet::from([source.to_string()]),
            currently_showing: true,
            ..CanonicalMovie::new(id, title)
        }
    }

    #[tokio::test]
    async fn clears_sourceless_coming_soon_only() {
        let cat = MemoryCatalog::seeded([
            CanonicalMovie {
                coming_soon: true,
                ..CanonicalMovie::new(1, "Wonka")
            },
            CanonicalMovie {
                coming_soon: true,
                ..showing(2, "Dune Part Two", "vox")
            },
        ]);
        let runs = MemoryRunLog::default();

        let report = run_audit(&cat, &runs, false).await.unwrap();
        assert_eq!(report.coming_soon_cleared.len(), 1);
        assert_eq!(report.coming_soon_cleared[0].id, 1);
        assert!(!cat.get(1).unwrap().coming_soon);
        assert!(cat.get(2).unwrap().coming_soon, "sourced coming-soon must survive");
    }

    #[tokio::test]
    async fn clears_showing_flag_left_without_sources() {
        let cat = MemoryCatalog::seeded([
            CanonicalMovie {
                currently_showing: true,
                ..CanonicalMovie::new(1, "Ghost Listing")
            },
            showing(2, "Oppenheimer", "vox"),
        ]);
        let runs = MemoryRunLog::default();

        let report = run_audit(&cat, &runs, false).await.unwrap();
        assert_eq!(report.showing_cleared.len(), 1);
        assert_eq!(report.showing_cleared[0].id, 1);
        assert!(!cat.get(1).unwrap().currently_showing);
        assert!(cat.get(2).unwrap().currently_showing);
        // Cleared in this snapshot means purge-eligible only next audit.
        assert_eq!(report.purged, 0);
        assert!(cat.get(1).is_some());
    }

    #[tokio::test]
    async fn dry_run_previews_purge_without_mutating() {
        let cat = MemoryCatalog::seeded([
            CanonicalMovie::new(1, "Forgotten Film"),
            showing(2, "Oppenheimer", "vox"),
        ]);
        let runs = MemoryRunLog::default();

        let preview = run_audit(&cat, &runs, true).await.unwrap();
        assert!(preview.dry_run);
        assert_eq!(preview.purged, 0);
        assert_eq!(preview.purge_candidates.len(), 1);
        assert_eq!(preview.purge_candidates[0].id, 1);
        assert_eq!(cat.len(), 2, "dry run must not delete");
        assert!(runs.recent(10).await.unwrap().is_empty(), "dry run must not log");

        let real = run_audit(&cat, &runs, false).await.unwrap();
        assert_eq!(real.purge_candidates, preview.purge_candidates);
        assert_eq!(real.purged, 1);
        assert_eq!(cat.len(), 1);
        assert!(cat.get(1).is_none());
    }

    #[tokio::test]
    async fn repaired_movie_not_purged_in_same_pass() {
        let cat = MemoryCatalog::seeded([CanonicalMovie {
            coming_soon: true,
            ..CanonicalMovie::new(1, "Stale Promo")
        }]);
        let runs = MemoryRunLog::default();

        let first = run_audit(&cat, &runs, false).await.unwrap();
        assert_eq!(first.coming_soon_cleared.len(), 1);
        assert_eq!(first.purged, 0);
        assert!(cat.get(1).is_some());

        let second = run_audit(&cat, &runs, false).await.unwrap();
        assert_eq!(second.purged, 1);
        assert!(cat.get(1).is_none());
    }

    #[tokio::test]
    async fn audit_is_recorded_in_run_log() {
        let cat = MemoryCatalog::seeded([CanonicalMovie::new(1, "Forgotten Film")]);
        let runs = MemoryRunLog::default();
        run_audit(&cat, &runs, false).await.unwrap();

        let recent = runs.recent(1).await.unwrap();
        assert_eq!(recent[0].kind, RunKind::Audit);
        assert_eq!(recent[0].status, RunStatus::Completed);
        assert_eq!(recent[0].counts.updated, 1);
    }

    #[tokio::test]
    async fn stuck_runs_are_reported_not_repaired() {
        let cat = MemoryCatalog::new();
        let runs = MemoryRunLog::default();
        let stuck_id = runs.start(RunKind::Scrape).await.unwrap();

        // Fresh records are under the age threshold, so nothing is reported
        // and the record is left exactly as it was.
        let report = run_audit(&cat, &runs, false).await.unwrap();
        assert_eq!(report.stuck_runs, 0);
        let rec = runs
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.id == stuck_id)
            .unwrap();
        assert_eq!(rec.status, RunStatus::Running);
    }
}
