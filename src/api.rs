use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::audit::{run_audit, AuditReport};
use crate::catalog::CatalogStore;
use crate::runlog::{RunLogStore, RunRecord};
use crate::scrape::config::ScrapeConfig;
use crate::scrape::types::SourceAdapter;
use crate::scrape::{run_once, ScrapeSummary};

/// Everything a trigger needs: the stores are external collaborators, the
/// adapter set comes from configuration.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub runs: Arc<dyn RunLogStore>,
    pub adapters: Arc<Vec<Arc<dyn SourceAdapter>>>,
    pub cfg: Arc<ScrapeConfig>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/admin/scrape", post(scrape_now))
        .route("/admin/cleanup", post(cleanup_now))
        .route("/debug/runs", get(debug_runs))
        .route("/debug/now-showing", get(debug_now_showing))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// "Run reconciliation now." Synchronous: the scheduler gets the summary
/// back in the response. Overlap protection (skip-if-running) is the
/// scheduler's job, not ours.
async fn scrape_now(
    State(state): State<AppState>,
) -> Result<Json<ScrapeSummary>, (StatusCode, String)> {
    run_once(
        &state.adapters,
        state.catalog.as_ref(),
        state.runs.as_ref(),
        &state.cfg,
    )
    .await
    .map(Json)
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))
}

#[derive(serde::Deserialize)]
struct CleanupParams {
    #[serde(default)]
    dry_run: bool,
}

/// "Run staleness audit now", optionally as a preview.
async fn cleanup_now(
    State(state): State<AppState>,
    Query(params): Query<CleanupParams>,
) -> Result<Json<AuditReport>, (StatusCode, String)> {
    run_audit(state.catalog.as_ref(), state.runs.as_ref(), params.dry_run)
        .await
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))
}

async fn debug_runs(
    State(state): State<AppState>,
) -> Result<Json<Vec<RunRecord>>, (StatusCode, String)> {
    state
        .runs
        .recent(20)
        .await
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))
}

#[derive(serde::Serialize)]
struct NowShowingOut {
    id: i64,
    title: String,
    sources: Vec<String>,
}

async fn debug_now_showing(
    State(state): State<AppState>,
) -> Result<Json<Vec<NowShowingOut>>, (StatusCode, String)> {
    let movies = state
        .catalog
        .load_all()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;
    let out = movies
        .into_iter()
        .filter(|m| m.currently_showing)
        .map(|m| NowShowingOut {
            id: m.id,
            title: m.title,
            sources: m.sources.into_iter().collect(),
        })
        .collect();
    Ok(Json(out))
}
