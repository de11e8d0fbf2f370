use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::AssetInfo;
use super::error::ValidationError;

/// Amount, average cost and their product must all be finite and positive.
pub(crate) fn check_position(asset_id: &str, amount: f64, avg_cost: f64) -> Result<(), ValidationError> {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if valid(amount) && valid(avg_cost) && valid(amount * avg_cost) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange(asset_id.to_string()))
    }
}

/// One position in one asset.
///
/// The serialized field names form the persisted blob format and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    #[serde(rename = "id")]
    pub asset_id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub symbol: String,
    pub amount: f64,
    /// Weighted-average purchase price per unit.
    #[serde(rename = "purchasePrice")]
    pub avg_cost: f64,
    #[serde(rename = "dateAdded")]
    pub created_at: DateTime<Utc>,
}

impl Holding {
    pub fn new(asset: &AssetInfo, amount: f64, price: f64, created_at: DateTime<Utc>) -> Self {
        Self {
            asset_id: asset.id.to_string(),
            display_name: asset.name.to_string(),
            symbol: asset.symbol.to_string(),
            amount,
            avg_cost: price,
            created_at,
        }
    }

    /// Folds another purchase into this position using the weighted-average cost.
    ///
    /// The position is left unchanged if the result would not be representable.
    pub(crate) fn merge_purchase(&mut self, amount: f64, price: f64) -> Result<(), ValidationError> {
        let new_amount = self.amount + amount;
        let new_avg_cost = (self.amount * self.avg_cost + amount * price) / new_amount;
        check_position(&self.asset_id, new_amount, new_avg_cost)?;
        self.amount = new_amount;
        self.avg_cost = new_avg_cost;
        Ok(())
    }

    pub fn purchase_value(&self) -> f64 {
        self.amount * self.avg_cost
    }
}
