//! Prometheus wiring: recorder install, the `/metrics` route, and the
//! one-time description of every scrape series so they carry help text
//! before the first run touches them.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Describe the scrape pipeline's series. Safe to call from every run;
/// only the first call registers anything.
pub(crate) fn describe_scrape_series() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scrape_titles_total", "Raw titles extracted from sources.");
        describe_counter!("scrape_kept_total", "Observations kept after the reject filter.");
        describe_counter!(
            "scrape_skipped_total",
            "Titles dropped by the reject filter."
        );
        describe_counter!(
            "scrape_dupes_total",
            "Per-source duplicate titles removed by the aggregator."
        );
        describe_counter!("scrape_source_errors_total", "Adapter fetch/parse errors.");
        describe_counter!("scrape_runs_total", "Scrape runs started.");
        describe_histogram!("scrape_fetch_ms", "Adapter fetch+extract time in milliseconds.");
        describe_gauge!(
            "scrape_last_run_ts",
            "Unix ts when the scrape pipeline last completed."
        );
        describe_gauge!("scrape_run_budget_secs", "Configured whole-run wall-clock budget.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder, describe the scrape series, and
    /// publish the configured run budget as a static gauge.
    pub fn init(run_budget_secs: u64) -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_scrape_series();
        gauge!("scrape_run_budget_secs").set(run_budget_secs as f64);

        Self { handle }
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
