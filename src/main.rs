//! Cinema listing reconciliation engine, binary entrypoint.
//! Boots the Axum HTTP trigger surface: admin scrape/cleanup endpoints,
//! debug views, and Prometheus metrics.
//!
//! The catalog and run-log stores wired here are in-memory; the catalog
//! seeds itself from `config/catalog.json` (catalog population is an
//! external ingestion concern).

use std::sync::Arc;

use marquee::api::{self, AppState};
use marquee::catalog::MemoryCatalog;
use marquee::metrics::Metrics;
use marquee::runlog::MemoryRunLog;
use marquee::scrape::{adapters, config as scrape_config};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - MARQUEE_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("MARQUEE_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("marquee=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = scrape_config::load_default().expect("Failed to load scrape config");
    let adapters = adapters::build_adapters(&cfg).expect("Failed to build source adapters");

    let metrics = Metrics::init(cfg.run_budget_secs);

    let state = AppState {
        catalog: Arc::new(MemoryCatalog::load_from_file("config/catalog.json")),
        runs: Arc::new(MemoryRunLog::default()),
        adapters: Arc::new(adapters),
        cfg: Arc::new(cfg),
    };

    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
