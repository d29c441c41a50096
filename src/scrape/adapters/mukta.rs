// src/scrape/adapters/mukta.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use scraper::Selector;

use super::{extract_titles, Page};
use crate::scrape::types::{SourceAdapter, SourceFetch};

pub const KEY: &str = "mukta";

/// Mukta's now-showing strip is a flat list of anchors. The page repeats
/// the list for its carousel, so the same title often appears more than
/// once; the aggregator's per-source dedup absorbs that.
static TITLE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ul.now-showing li a.name, div.carousel a.name").unwrap());

pub struct MuktaAdapter {
    page: Page,
}

impl MuktaAdapter {
    pub fn new(url: &str) -> Self {
        Self {
            page: Page::Remote {
                url: url.to_string(),
            },
        }
    }

    pub fn from_fixture(content: &str) -> Self {
        Self {
            page: Page::Fixture(content.to_string()),
        }
    }
}

#[async_trait]
impl SourceAdapter for MuktaAdapter {
    fn key(&self) -> &'static str {
        KEY
    }

    async fn fetch(&self) -> SourceFetch {
        let t0 = std::time::Instant::now();
        let body = match self.page.html().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = ?e, source = KEY, "fetch failed");
                counter!("scrape_source_errors_total").increment(1);
                return SourceFetch::failed(KEY, e);
            }
        };
        let titles = extract_titles(&body, &TITLE_SEL);

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("scrape_fetch_ms").record(ms);
        counter!("scrape_titles_total").increment(titles.len() as u64);

        SourceFetch::ok(KEY, titles)
    }
}
