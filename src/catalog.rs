//! # Catalog store
//!
//! External collaborator boundary for the canonical movie catalog. The
//! engine reads `{id, title}` refs for matching and writes per-movie status
//! fields; it never creates rows, and deletes only through the auditor's
//! orphan purge.
//!
//! `MemoryCatalog` is the in-process implementation used by the binary
//! (seeded from a JSON snapshot) and by tests. A database-backed store
//! implements the same trait.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CanonicalMovie {
    pub id: i64,
    pub title: String,
    /// Source keys currently reporting this movie as showing.
    #[serde(default)]
    pub sources: BTreeSet<String>,
    #[serde(default)]
    pub currently_showing: bool,
    #[serde(default)]
    pub coming_soon: bool,
    #[serde(default)]
    pub last_reconciled: Option<DateTime<Utc>>,
}

impl CanonicalMovie {
    /// Minimal row as the external ingestion process would create it.
    pub fn new(id: i64, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            sources: BTreeSet::new(),
            currently_showing: false,
            coming_soon: false,
            last_reconciled: None,
        }
    }
}

/// The projection the matcher works against.
#[derive(Debug, Clone, serde::Serialize, PartialEq, Eq)]
pub struct MovieRef {
    pub id: i64,
    pub title: String,
}

/// Fields the reconciler is allowed to write. `coming_soon` and `title`
/// stay curated elsewhere and are deliberately absent.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub sources: BTreeSet<String>,
    pub currently_showing: bool,
    pub last_reconciled: DateTime<Utc>,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_refs(&self) -> Result<Vec<MovieRef>>;
    async fn load_all(&self) -> Result<Vec<CanonicalMovie>>;
    async fn update_status(&self, id: i64, update: &StatusUpdate) -> Result<()>;
    async fn set_coming_soon(&self, id: i64, coming_soon: bool) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;
}

/// In-memory catalog keyed by id. Iteration order (ascending id) is the
/// matcher's tie-break fallback order.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    inner: RwLock<BTreeMap<i64, CanonicalMovie>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(movies: impl IntoIterator<Item = CanonicalMovie>) -> Self {
        let map = movies.into_iter().map(|m| (m.id, m)).collect();
        Self {
            inner: RwLock::new(map),
        }
    }

    /// Load a JSON snapshot (array of movies). Missing file yields an empty
    /// catalog so the binary can boot before the first ingestion.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(s) => match serde_json::from_str::<Vec<CanonicalMovie>>(&s) {
                Ok(v) => Self::seeded(v),
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "bad catalog snapshot, starting empty");
                    Self::new()
                }
            },
            Err(_) => Self::new(),
        }
    }

    pub fn get(&self, id: i64) -> Option<CanonicalMovie> {
        self.inner.read().ok()?.get(&id).cloned()
    }

    pub fn insert(&self, movie: CanonicalMovie) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(movie.id, movie);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn list_refs(&self) -> Result<Vec<MovieRef>> {
        let map = self
            .inner
            .read()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;
        Ok(map
            .values()
            .map(|m| MovieRef {
                id: m.id,
                title: m.title.clone(),
            })
            .collect())
    }

    async fn load_all(&self) -> Result<Vec<CanonicalMovie>> {
        let map = self
            .inner
            .read()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;
        Ok(map.values().cloned().collect())
    }

    async fn update_status(&self, id: i64, update: &StatusUpdate) -> Result<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;
        let m = map
            .get_mut(&id)
            .with_context(|| format!("movie {id} not found"))?;
        m.sources = update.sources.clone();
        m.currently_showing = update.currently_showing;
        m.last_reconciled = Some(update.last_reconciled);
        Ok(())
    }

    async fn set_coming_soon(&self, id: i64, coming_soon: bool) -> Result<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;
        let m = map
            .get_mut(&id)
            .with_context(|| format!("movie {id} not found"))?;
        m.coming_soon = coming_soon;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;
        map.remove(&id)
            .with_context(|| format!("movie {id} not found"))?;
        Ok(())
    }
}
