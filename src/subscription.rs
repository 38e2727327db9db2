//! Subscriber definitions as typed by the user:
//! `observer1,BTC,ETH,ADA; observer2,BTC,ETH; observer3,ETH,ADA;`

use anyhow::{Result, bail};
use std::collections::BTreeSet;

use crate::types::Asset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverSpec {
    pub id: String,
    pub assets: BTreeSet<Asset>,
}

/// Parse a whole spec. Empty entries (e.g. a trailing `;`) are skipped,
/// unknown asset tokens are ignored, duplicate ids are kept as given.
pub fn parse_specs(input: &str) -> Result<Vec<ObserverSpec>> {
    let mut out = Vec::new();
    for (i, entry) in input.split(';').enumerate() {
        if let Some(spec) = parse_entry(entry, i)? {
            out.push(spec);
        }
    }
    Ok(out)
}

fn parse_entry(entry: &str, pos: usize) -> Result<Option<ObserverSpec>> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Ok(None);
    }

    let mut tokens = entry.split(',');
    let id = tokens.next().unwrap_or_default().trim();
    if id.is_empty() {
        bail!("subscriber entry #{} ({entry:?}) has no id", pos + 1);
    }

    let assets = tokens.filter_map(Asset::parse).collect();
    Ok(Some(ObserverSpec {
        id: id.to_string(),
        assets,
    }))
}
