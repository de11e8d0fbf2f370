//! Portfolio domain: holdings ledger, prices, valuation and refresh

pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod holding;
pub mod ledger;
pub mod log;
pub mod price;
pub mod refresh;
pub mod session;
pub mod store;
pub mod sync;
pub mod valuation;

// Re-export main types for cleaner imports
pub use error::{PortfolioError, SyncFailure, ValidationError};
pub use holding::Holding;
pub use price::{PriceCache, PriceProvider, Quote};
pub use session::{PortfolioSession, SessionEvent};
pub use store::BlobStore;
pub use sync::{SkipReason, SyncOutcome, SyncState};
pub use valuation::{HoldingValuation, PortfolioValuation};
