use anyhow::Result;

/// Key under which the serialized ledger is kept.
pub const PORTFOLIO_KEY: &str = "cryptoPortfolio";

/// A minimal key-value store for opaque blobs.
///
/// Writes must be durable once `put` returns.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &str, value: &[u8]) -> Result<()>;
}
