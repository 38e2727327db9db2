use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Btc,
    Eth,
    Ada,
}

impl Asset {
    pub const ALL: [Asset; 3] = [Asset::Btc, Asset::Eth, Asset::Ada];

    pub fn as_str(self) -> &'static str {
        match self {
            Asset::Btc => "BTC",
            Asset::Eth => "ETH",
            Asset::Ada => "ADA",
        }
    }

    /// Case-insensitive, ignores surrounding whitespace ("btc", " Eth ").
    pub fn parse(s: &str) -> Option<Asset> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BTC" => Some(Asset::Btc),
            "ETH" => Some(Asset::Eth),
            "ADA" => Some(Asset::Ada),
            _ => None,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dispatch event: an optional price per asset.
///
/// `None` means "unchanged for this asset". The dispatcher only ever fills
/// one slot, but observers must accept any combination.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceUpdate {
    pub btc: Option<f64>,
    pub eth: Option<f64>,
    pub ada: Option<f64>,
}

impl PriceUpdate {
    pub fn new(btc: Option<f64>, eth: Option<f64>, ada: Option<f64>) -> Self {
        Self { btc, eth, ada }
    }

    pub fn single(asset: Asset, price: f64) -> Self {
        let mut u = Self::default();
        *u.slot_mut(asset) = Some(price);
        u
    }

    pub fn get(&self, asset: Asset) -> Option<f64> {
        match asset {
            Asset::Btc => self.btc,
            Asset::Eth => self.eth,
            Asset::Ada => self.ada,
        }
    }

    fn slot_mut(&mut self, asset: Asset) -> &mut Option<f64> {
        match asset {
            Asset::Btc => &mut self.btc,
            Asset::Eth => &mut self.eth,
            Asset::Ada => &mut self.ada,
        }
    }

    /// Assets that carry a price in this event, in `Asset::ALL` order.
    pub fn changed(&self) -> impl Iterator<Item = (Asset, f64)> + '_ {
        Asset::ALL
            .into_iter()
            .filter_map(|a| self.get(a).map(|p| (a, p)))
    }

    pub fn is_empty(&self) -> bool {
        self.changed().next().is_none()
    }
}

/// One price observation for one asset, as handed from a reader to the dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub asset: Asset,
    pub price: f64,
    pub received_at: DateTime<Utc>,
}

impl Tick {
    pub fn now(asset: Asset, price: f64) -> Self {
        Self {
            asset,
            price,
            received_at: Utc::now(),
        }
    }
}
