//! Pricing abstractions and the transient price cache

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Latest market quote for one asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub unit_price: f64,
    /// Percentage change over the last 24 hours, when the service reports it.
    pub change_24h: Option<f64>,
}

impl Quote {
    pub fn new(unit_price: f64) -> Self {
        Self {
            unit_price,
            change_24h: None,
        }
    }
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Fetches quotes for all `asset_ids` in a single request.
    ///
    /// Assets the service does not know are simply missing from the result.
    async fn fetch_quotes(&self, asset_ids: &[String]) -> Result<HashMap<String, Quote>>;
}

/// Last observed quotes, replaced wholesale on every successful refresh.
#[derive(Debug, Clone, Default)]
pub struct PriceCache {
    quotes: HashMap<String, Quote>,
    updated_at: Option<DateTime<Utc>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps in a new set of quotes. Assets absent from `quotes` no longer have a price.
    pub fn replace_all(&mut self, quotes: HashMap<String, Quote>) {
        debug!(entries = quotes.len(), "Replacing price cache");
        self.quotes = quotes;
        self.updated_at = Some(Utc::now());
    }

    /// Unit price of `asset_id`, or `None` when unknown.
    pub fn get(&self, asset_id: &str) -> Option<f64> {
        self.quotes.get(asset_id).map(|q| q.unit_price)
    }

    pub fn quote(&self, asset_id: &str) -> Option<&Quote> {
        self.quotes.get(asset_id)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
