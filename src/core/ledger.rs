//! The holdings ledger: one position per asset, persisted after every change.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use super::catalog;
use super::error::{PortfolioError, ValidationError};
use super::holding::{Holding, check_position};
use super::store::{BlobStore, PORTFOLIO_KEY};

pub struct Ledger {
    holdings: Vec<Holding>,
    store: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("holdings", &self.holdings)
            .finish_non_exhaustive()
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl Ledger {
    /// Creates an empty ledger without reading the store.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            holdings: Vec::new(),
            store,
        }
    }

    /// Loads the ledger from the store. A missing or unreadable blob yields an empty ledger.
    pub fn load(store: Arc<dyn BlobStore>) -> Self {
        let holdings = match store.get(PORTFOLIO_KEY) {
            Ok(Some(bytes)) => match deserialize(&bytes) {
                Ok(holdings) => holdings,
                Err(e) => {
                    warn!("Stored portfolio is corrupt, starting empty: {e:#}");
                    Vec::new()
                }
            },
            Ok(None) => {
                debug!("No stored portfolio found");
                Vec::new()
            }
            Err(e) => {
                warn!("Failed to read stored portfolio, starting empty: {e:#}");
                Vec::new()
            }
        };
        debug!(holdings = holdings.len(), "Loaded portfolio");
        Self { holdings, store }
    }

    /// Records a purchase, merging it into an existing position for the same asset.
    ///
    /// The resulting position is returned. On a persistence error the in-memory
    /// change has already been applied.
    pub fn add_or_merge_purchase(
        &mut self,
        asset_id: &str,
        amount: f64,
        price: f64,
    ) -> Result<Holding, PortfolioError> {
        let asset = catalog::lookup(asset_id)
            .ok_or_else(|| ValidationError::UnknownAsset(asset_id.to_string()))?;
        if !is_positive(amount) {
            return Err(ValidationError::InvalidAmount(amount).into());
        }
        if !is_positive(price) {
            return Err(ValidationError::InvalidPrice(price).into());
        }

        let holding = match self.holdings.iter_mut().find(|h| h.asset_id == asset_id) {
            Some(existing) => {
                existing.merge_purchase(amount, price)?;
                debug!(
                    asset = asset_id,
                    amount = existing.amount,
                    avg_cost = existing.avg_cost,
                    "Merged purchase into existing holding"
                );
                existing.clone()
            }
            None => {
                check_position(asset_id, amount, price)?;
                let holding = Holding::new(asset, amount, price, Utc::now());
                debug!(asset = asset_id, amount, price, "Added new holding");
                self.holdings.push(holding.clone());
                holding
            }
        };

        self.persist()?;
        Ok(holding)
    }

    /// Removes the holding for `asset_id`. Returns whether anything was removed;
    /// removing an absent asset is not an error and does not touch the store.
    pub fn remove(&mut self, asset_id: &str) -> Result<bool, PortfolioError> {
        let Some(index) = self.holdings.iter().position(|h| h.asset_id == asset_id) else {
            debug!(asset = asset_id, "Nothing to remove");
            return Ok(false);
        };
        self.holdings.remove(index);
        debug!(asset = asset_id, "Removed holding");
        self.persist()?;
        Ok(true)
    }

    pub fn list(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn get(&self, asset_id: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.asset_id == asset_id)
    }

    /// Asset identifiers in display order.
    pub fn asset_ids(&self) -> Vec<String> {
        self.holdings.iter().map(|h| h.asset_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    fn persist(&self) -> Result<(), PortfolioError> {
        let result = serialize(&self.holdings)
            .and_then(|bytes| self.store.put(PORTFOLIO_KEY, &bytes));
        result.map_err(|e| {
            warn!("Failed to persist portfolio: {e:#}");
            PortfolioError::persistence(&e)
        })
    }
}

pub fn serialize(holdings: &[Holding]) -> Result<Vec<u8>> {
    serde_json::to_vec(holdings).context("Failed to serialize portfolio")
}

/// Parses a stored ledger, dropping records that do not decode or carry
/// non-positive values, and folding duplicate assets into their first occurrence.
pub fn deserialize(bytes: &[u8]) -> Result<Vec<Holding>> {
    let records: Vec<serde_json::Value> =
        serde_json::from_slice(bytes).context("Failed to parse stored portfolio")?;

    let mut holdings: Vec<Holding> = Vec::with_capacity(records.len());
    for (index, value) in records.into_iter().enumerate() {
        let record: Holding = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                warn!(index, "Skipping unreadable stored holding: {e}");
                continue;
            }
        };
        if check_position(&record.asset_id, record.amount, record.avg_cost).is_err() {
            warn!(asset = %record.asset_id, "Skipping stored holding with invalid amount or price");
            continue;
        }
        match holdings.iter_mut().find(|h| h.asset_id == record.asset_id) {
            Some(existing) => {
                warn!(asset = %record.asset_id, "Merging duplicate stored holding");
                if let Err(e) = existing.merge_purchase(record.amount, record.avg_cost) {
                    warn!(asset = %record.asset_id, "Dropping duplicate stored holding: {e}");
                }
            }
            None => holdings.push(record),
        }
    }
    Ok(holdings)
}
