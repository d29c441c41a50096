// src/scrape/types.rs
use crate::normalize::normalize;

/// One sighting of a title from one source within a single run. Never
/// persisted; only its matching outcome is.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ObservedMovie {
    pub source_key: String, // e.g., "vox", "cineco"
    pub raw_title: String,
    pub normalized: String,
}

impl ObservedMovie {
    pub fn new(source_key: &str, raw_title: &str) -> Self {
        Self {
            source_key: source_key.to_string(),
            raw_title: raw_title.to_string(),
            normalized: normalize(raw_title),
        }
    }
}

/// What one adapter contributes to a run. Failures never cross the adapter
/// boundary as errors; they arrive here as an empty title list plus `error`,
/// so one broken source cannot abort the whole run.
#[derive(Debug, Clone)]
pub struct SourceFetch {
    pub source_key: String,
    pub titles: Vec<String>,
    pub error: Option<String>,
}

impl SourceFetch {
    pub fn ok(source_key: &str, titles: Vec<String>) -> Self {
        Self {
            source_key: source_key.to_string(),
            titles,
            error: None,
        }
    }

    pub fn failed(source_key: &str, error: impl std::fmt::Display) -> Self {
        Self {
            source_key: source_key.to_string(),
            titles: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable source key; this is what ends up in a movie's source set.
    fn key(&self) -> &'static str;
    /// Fetch the listing page(s) and extract raw titles. Infallible at this
    /// boundary by contract.
    async fn fetch(&self) -> SourceFetch;
}
