//! Error taxonomy for portfolio operations

use thiserror::Error;

/// Rejected input to a purchase. The ledger is left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    #[error("amount must be a positive number, got {0}")]
    InvalidAmount(f64),

    #[error("purchase price must be a positive number, got {0}")]
    InvalidPrice(f64),

    #[error("position in {0} would be too large to record")]
    OutOfRange(String),
}

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("invalid purchase: {0}")]
    Validation(#[from] ValidationError),

    /// The in-memory change was applied but could not be saved.
    #[error("failed to save portfolio: {0}")]
    Persistence(String),
}

impl PortfolioError {
    pub fn persistence(err: &anyhow::Error) -> Self {
        PortfolioError::Persistence(format!("{err:#}"))
    }
}

/// A price refresh that did not complete. Prices keep their last known values.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to fetch current prices: {cause}")]
pub struct SyncFailure {
    pub cause: String,
}

impl From<anyhow::Error> for SyncFailure {
    fn from(err: anyhow::Error) -> Self {
        SyncFailure {
            cause: format!("{err:#}"),
        }
    }
}
