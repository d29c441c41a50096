// src/scrape/adapters/mod.rs
//! One adapter per cinema source. Adapters own the volatile parts of a
//! source (URL, selectors, markup quirks) and keep them out of the
//! matching logic. Every adapter catches its own network and parse
//! failures; the rest of the pipeline only ever sees a `SourceFetch`.

pub mod cineco;
pub mod mukta;
pub mod vox;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use scraper::{Html, Selector};

use crate::scrape::config::ScrapeConfig;
use crate::scrape::types::SourceAdapter;

pub use cineco::CinecoAdapter;
pub use mukta::MuktaAdapter;
pub use vox::VoxAdapter;

/// Where an adapter reads its listing page from. Tests use fixtures so no
/// socket is ever opened.
#[derive(Debug, Clone)]
pub(crate) enum Page {
    Remote { url: String },
    Fixture(String),
}

impl Page {
    pub(crate) async fn html(&self) -> Result<String> {
        match self {
            Page::Fixture(content) => Ok(content.clone()),
            Page::Remote { url } => {
                let resp = client()
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("fetching {url}"))?
                    .error_for_status()
                    .with_context(|| format!("fetching {url}"))?;
                resp.text().await.with_context(|| format!("reading body of {url}"))
            }
        }
    }
}

fn client() -> &'static reqwest::Client {
    static CLIENT: once_cell::sync::OnceCell<reqwest::Client> = once_cell::sync::OnceCell::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .user_agent("marquee/0.1 (listing reconciliation)")
            .build()
            .unwrap_or_default()
    })
}

/// Extract the text of every node matching `selector`, trimmed, empties
/// dropped. Selector syntax is fixed at compile time per adapter, hence
/// the unwrap in each adapter's `Lazy`.
pub(crate) fn extract_titles(html: &str, selector: &Selector) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Build the active adapter set from configuration. The source keys form a
/// closed set; an unknown key is a configuration mistake and fails startup
/// rather than silently scraping nothing.
pub fn build_adapters(cfg: &ScrapeConfig) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let mut out: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    for src in cfg.sources.iter().filter(|s| s.enabled) {
        let adapter: Arc<dyn SourceAdapter> = match src.key.as_str() {
            vox::KEY => Arc::new(VoxAdapter::new(&src.url)),
            cineco::KEY => Arc::new(CinecoAdapter::new(&src.url)),
            mukta::KEY => Arc::new(MuktaAdapter::new(&src.url)),
            other => bail!("unknown source key '{other}' in scrape config"),
        };
        out.push(adapter);
    }
    Ok(out)
}
