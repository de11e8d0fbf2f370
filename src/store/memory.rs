use crate::core::store::BlobStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Blob store kept in memory; contents are lost when dropped.
#[derive(Default)]
pub struct MemoryBlobStore {
    inner: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let blobs = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let value = blobs.get(key).cloned();
        debug!(key, hit = value.is_some(), "Memory store GET");
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut blobs = self.inner.write().unwrap_or_else(|e| e.into_inner());
        debug!(key, bytes = value.len(), "Memory store PUT");
        blobs.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
