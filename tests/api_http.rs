// tests/api_http.rs
//
// HTTP-level tests for the trigger Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /admin/scrape  (fixture adapters, full pipeline)
// - POST /admin/cleanup?dry_run=true
// - GET /debug/runs
// - GET /debug/now-showing

use std::sync::Arc;

use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use marquee::api::{self, AppState};
use marquee::catalog::{CanonicalMovie, MemoryCatalog};
use marquee::runlog::MemoryRunLog;
use marquee::scrape::adapters::{CinecoAdapter, VoxAdapter};
use marquee::scrape::config::ScrapeConfig;
use marquee::scrape::types::SourceAdapter;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Build the same Router the binary uses, on fixture adapters and a
/// seeded in-memory catalog.
fn test_router() -> (Router, Arc<MemoryCatalog>) {
    let catalog = Arc::new(MemoryCatalog::seeded([
        CanonicalMovie::new(1, "Oppenheimer"),
        CanonicalMovie::new(2, "Barbie"),
        CanonicalMovie::new(3, "Jawan"),
        CanonicalMovie {
            coming_soon: true,
            ..CanonicalMovie::new(4, "Forgotten Promo")
        },
    ]));

    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(VoxAdapter::from_fixture(include_str!("fixtures/vox.html"))),
        Arc::new(CinecoAdapter::from_fixture(include_str!(
            "fixtures/cineco.html"
        ))),
    ];

    let state = AppState {
        catalog: catalog.clone(),
        runs: Arc::new(MemoryRunLog::default()),
        adapters: Arc::new(adapters),
        cfg: Arc::new(ScrapeConfig::default()),
    };
    (api::create_router(state), catalog)
}

async fn json_body(resp: shuttle_axum::axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json body")
}

#[tokio::test]
async fn api_health_returns_200() {
    let (app, _) = test_router();
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_scrape_runs_pipeline_and_returns_summary() {
    let (app, catalog) = test_router();
    let req = Request::builder()
        .method("POST")
        .uri("/admin/scrape")
        .body(Body::empty())
        .expect("build POST /admin/scrape");

    let resp = app.oneshot(req).await.expect("oneshot /admin/scrape");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    assert!(v.get("run_id").is_some(), "missing 'run_id'");
    assert_eq!(v["matched"].as_u64().unwrap(), 4); // oppenheimer x2, barbie, jawan
    assert!(v["unmatched"].is_array());

    let opp = catalog.get(1).unwrap();
    assert!(opp.currently_showing);
    assert_eq!(opp.sources.len(), 2);
}

#[tokio::test]
async fn api_cleanup_dry_run_previews_without_deleting() {
    let (app, catalog) = test_router();
    let req = Request::builder()
        .method("POST")
        .uri("/admin/cleanup?dry_run=true")
        .body(Body::empty())
        .expect("build POST /admin/cleanup");

    let resp = app.oneshot(req).await.expect("oneshot /admin/cleanup");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    assert_eq!(v["dry_run"], true);
    // Movies 1-3 are sourceless orphans in a fresh catalog; movie 4 is a
    // stale coming-soon. Nothing may actually change.
    assert_eq!(v["purge_candidates"].as_array().unwrap().len(), 3);
    assert_eq!(v["coming_soon_cleared"].as_array().unwrap().len(), 1);
    assert_eq!(catalog.len(), 4);
    assert!(catalog.get(4).unwrap().coming_soon);
}

#[tokio::test]
async fn api_debug_runs_lists_recent_records() {
    let (app, _) = test_router();

    let scrape = Request::builder()
        .method("POST")
        .uri("/admin/scrape")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(scrape).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let runs = Request::builder()
        .method("GET")
        .uri("/debug/runs")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(runs).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    let arr = v.as_array().expect("runs array");
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["kind"], "scrape");
    assert_eq!(arr[0]["status"], "completed");
}

#[tokio::test]
async fn api_now_showing_reflects_reconciled_state() {
    let (app, _) = test_router();

    let scrape = Request::builder()
        .method("POST")
        .uri("/admin/scrape")
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(scrape).await.unwrap();

    let req = Request::builder()
        .method("GET")
        .uri("/debug/now-showing")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    let titles: Vec<&str> = v
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap())
        .collect();
    assert!(titles.contains(&"Oppenheimer"));
    assert!(titles.contains(&"Barbie"));
    assert!(!titles.contains(&"Forgotten Promo"));
}
