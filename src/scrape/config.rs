// src/scrape/config.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "SCRAPE_CONFIG_PATH";

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct SourceCfg {
    /// Stable source key, must name a known adapter ("vox", "cineco", "mukta").
    pub key: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceCfg>,
    /// Ceiling for one adapter's fetch; a slower source counts as failed.
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_secs: u64,
    /// Wall-clock budget for a whole scrape run.
    #[serde(default = "default_run_budget")]
    pub run_budget_secs: u64,
    /// Denylist phrases on top of the built-in table.
    #[serde(default)]
    pub extra_denylist: Vec<String>,
    #[serde(default = "default_unmatched_cap")]
    pub unmatched_sample_cap: usize,
}

fn default_true() -> bool {
    true
}

fn default_adapter_timeout() -> u64 {
    20
}

fn default_run_budget() -> u64 {
    55
}

fn default_unmatched_cap() -> usize {
    20
}

fn default_sources() -> Vec<SourceCfg> {
    [
        ("vox", "https://bhr.voxcinemas.com/movies/whatson"),
        ("cineco", "https://www.cineco.net/movies"),
        ("mukta", "https://bahrain.muktaa2cinemas.com/now-showing"),
    ]
    .into_iter()
    .map(|(key, url)| SourceCfg {
        key: key.to_string(),
        url: url.to_string(),
        enabled: true,
    })
    .collect()
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            adapter_timeout_secs: default_adapter_timeout(),
            run_budget_secs: default_run_budget(),
            extra_denylist: Vec::new(),
            unmatched_sample_cap: default_unmatched_cap(),
        }
    }
}

impl ScrapeConfig {
    pub fn adapter_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.adapter_timeout_secs)
    }

    pub fn run_budget(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.run_budget_secs)
    }
}

/// Load configuration from an explicit path. Supports TOML or JSON.
pub fn load_from(path: &Path) -> Result<ScrapeConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading scrape config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load configuration using env var + fallbacks:
/// 1) $SCRAPE_CONFIG_PATH
/// 2) config/scrape.toml
/// 3) config/scrape.json
/// 4) built-in defaults
pub fn load_default() -> Result<ScrapeConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        } else {
            return Err(anyhow!("SCRAPE_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/scrape.toml");
    if toml_p.exists() {
        return load_from(&toml_p);
    }
    let json_p = PathBuf::from("config/scrape.json");
    if json_p.exists() {
        return load_from(&json_p);
    }
    Ok(ScrapeConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<ScrapeConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing scrape config json");
    }
    if let Ok(v) = toml::from_str(s) {
        return Ok(v);
    }
    serde_json::from_str(s).context("unsupported scrape config format")
}
