//! # Run log
//!
//! Append-only execution records, one per scrape or audit run. A record is
//! opened before any scraping starts and finalized exactly once; a record
//! stuck in `Running` is itself a staleness signal the auditor reports.

use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Scrape,
    Audit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RunCounts {
    pub observed: usize,
    pub matched: usize,
    pub updated: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunRecord {
    pub id: u64,
    pub kind: RunKind,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub counts: RunCounts,
    /// Bounded sample of titles that matched nothing, for operator triage.
    pub unmatched_sample: Vec<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait RunLogStore: Send + Sync {
    async fn start(&self, kind: RunKind) -> Result<u64>;
    async fn complete(&self, id: u64, counts: RunCounts, unmatched_sample: Vec<String>)
        -> Result<()>;
    async fn fail(&self, id: u64, error: &str) -> Result<()>;
    async fn recent(&self, n: usize) -> Result<Vec<RunRecord>>;
    /// Records still `Running` after `max_age`, oldest first.
    async fn stuck(&self, max_age: Duration) -> Result<Vec<RunRecord>>;
}

/// Capped in-memory run log, newest records at the tail.
#[derive(Debug)]
pub struct MemoryRunLog {
    inner: Mutex<Inner>,
    cap: usize,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    records: Vec<RunRecord>,
}

impl MemoryRunLog {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                records: Vec::new(),
            }),
            cap: cap.min(10_000),
        }
    }

    fn finalize(
        &self,
        id: u64,
        f: impl FnOnce(&mut RunRecord),
    ) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("run log lock poisoned"))?;
        let rec = inner
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow!("run {id} not found"))?;
        if rec.status != RunStatus::Running {
            bail!("run {id} already finalized as {:?}", rec.status);
        }
        rec.completed_at = Some(Utc::now());
        f(rec);
        Ok(())
    }
}

impl Default for MemoryRunLog {
    fn default() -> Self {
        Self::with_capacity(500)
    }
}

#[async_trait]
impl RunLogStore for MemoryRunLog {
    async fn start(&self, kind: RunKind) -> Result<u64> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("run log lock poisoned"))?;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.records.push(RunRecord {
            id,
            kind,
            started_at: Utc::now(),
            completed_at: None,
            status: RunStatus::Running,
            counts: RunCounts::default(),
            unmatched_sample: Vec::new(),
            error: None,
        });
        while inner.records.len() > self.cap {
            // Evict the oldest finalized record; an in-flight run must stay
            // findable until its complete/fail lands.
            let idx = inner
                .records
                .iter()
                .position(|r| r.status != RunStatus::Running)
                .unwrap_or(0);
            inner.records.remove(idx);
        }
        Ok(id)
    }

    async fn complete(
        &self,
        id: u64,
        counts: RunCounts,
        unmatched_sample: Vec<String>,
    ) -> Result<()> {
        self.finalize(id, |rec| {
            rec.status = RunStatus::Completed;
            rec.counts = counts;
            rec.unmatched_sample = unmatched_sample;
        })
    }

    async fn fail(&self, id: u64, error: &str) -> Result<()> {
        self.finalize(id, |rec| {
            rec.status = RunStatus::Failed;
            rec.error = Some(error.to_string());
        })
    }

    async fn recent(&self, n: usize) -> Result<Vec<RunRecord>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("run log lock poisoned"))?;
        let len = inner.records.len();
        let start = len.saturating_sub(n);
        let mut out = inner.records[start..].to_vec();
        out.reverse();
        Ok(out)
    }

    async fn stuck(&self, max_age: Duration) -> Result<Vec<RunRecord>> {
        let cutoff = Utc::now() - max_age;
        let inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("run log lock poisoned"))?;
        Ok(inner
            .records
            .iter()
            .filter(|r| r.status == RunStatus::Running && r.started_at < cutoff)
            .cloned()
            .collect())
    }
}
