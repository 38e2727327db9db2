use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::Asset;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub index: u64,
    pub price: f64,
}

/// Append-only price series per asset, shared by every observer that
/// renders the same asset.
///
/// One mutex covers all assets. It is held only for append-and-copy,
/// never across rendering.
#[derive(Debug, Default)]
pub struct PriceHistory {
    series: Mutex<HashMap<Asset, Vec<Sample>>>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Asset, Vec<Sample>>> {
        // Appends never leave a half-written Vec behind, so a poisoned lock
        // still guards consistent data.
        self.series.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `price` with the next index and return a copy of the whole
    /// series as it stands right after the append.
    pub fn append(&self, asset: Asset, price: f64) -> Vec<Sample> {
        let mut g = self.lock();
        let s = g.entry(asset).or_default();
        s.push(Sample {
            index: s.len() as u64,
            price,
        });
        s.clone()
    }

    pub fn snapshot(&self, asset: Asset) -> Vec<Sample> {
        self.lock().get(&asset).cloned().unwrap_or_default()
    }

    pub fn len(&self, asset: Asset) -> usize {
        self.lock().get(&asset).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, asset: Asset) -> bool {
        self.len(asset) == 0
    }
}
