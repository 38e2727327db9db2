use anyhow::{Context, Result, anyhow, bail};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::types::Asset;

/// Runtime settings. Everything can be overridden from the environment
/// (a `.env` file is honoured, see `main`).
#[derive(Debug, Clone)]
pub struct Config {
    // JSON map of asset tag -> websocket URL, e.g. {"Btc": "wss://..."}.
    pub endpoints_file: PathBuf,

    // Where chart snapshots land.
    pub results_dir: PathBuf,

    // Max snapshot writes running at once. Extra writes queue (FIFO) but are
    // already counted as in-flight, so drain waits for them too.
    pub write_workers: usize,

    // Delay before a reader reconnects after its stream ended or failed.
    pub reconnect_backoff_ms: u64,

    // Subscription spec ("id,BTC,ETH; id2,ADA"). None => prompt on stdin.
    pub subscribers: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints_file: PathBuf::from("endpoints.json"),
            results_dir: PathBuf::from("Results"),
            write_workers: 8,
            reconnect_backoff_ms: 500,
            subscribers: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        let cfg = Self {
            endpoints_file: env::var("ENDPOINTS_FILE")
                .map(PathBuf::from)
                .unwrap_or(d.endpoints_file),
            results_dir: env::var("RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.results_dir),
            write_workers: env_parse("WRITE_WORKERS", d.write_workers)?,
            reconnect_backoff_ms: env_parse("RECONNECT_BACKOFF_MS", d.reconnect_backoff_ms)?,
            subscribers: env::var("SUBSCRIBERS").ok().filter(|s| !s.trim().is_empty()),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.write_workers == 0 {
            bail!("WRITE_WORKERS must be at least 1");
        }
        Ok(())
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key}={raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

/// Feed locator per asset. Construction fails unless every asset has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    btc: String,
    eth: String,
    ada: String,
}

impl Endpoints {
    pub fn new(mut map: HashMap<Asset, String>) -> Result<Self> {
        let mut take = |asset: Asset| {
            map.remove(&asset)
                .filter(|url| !url.trim().is_empty())
                .with_context(|| format!("missing feed endpoint for {asset}"))
        };
        Ok(Self {
            btc: take(Asset::Btc)?,
            eth: take(Asset::Eth)?,
            ada: take(Asset::Ada)?,
        })
    }

    /// Parses `{"Btc": "...", "Eth": "...", "Ada": "..."}`; keys are asset
    /// tags in any case.
    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: HashMap<String, String> =
            serde_json::from_str(raw).context("endpoints file is not a JSON string map")?;

        let mut map = HashMap::new();
        for (key, url) in parsed {
            let asset = Asset::parse(&key)
                .with_context(|| format!("unknown asset key {key:?} in endpoints file"))?;
            map.insert(asset, url);
        }
        Self::new(map)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading endpoints from {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("loading {}", path.display()))
    }

    pub fn get(&self, asset: Asset) -> &str {
        match asset {
            Asset::Btc => &self.btc,
            Asset::Eth => &self.eth,
            Asset::Ada => &self.ada,
        }
    }
}
