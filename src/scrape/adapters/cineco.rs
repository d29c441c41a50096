// src/scrape/adapters/cineco.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use scraper::Selector;

use super::{extract_titles, Page};
use crate::scrape::types::{SourceAdapter, SourceFetch};

pub const KEY: &str = "cineco";

/// Cineco renders one `.film` block per movie; language and rating tags
/// ("(AR)", "(15+)") come glued to the name and are left for the
/// normalizer.
static TITLE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.film span.film-name, ul.films li.film a.title").unwrap());

pub struct CinecoAdapter {
    page: Page,
}

impl CinecoAdapter {
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
impl SourceAdapter for CinecoAdapter {
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
