use crate::core::store::BlobStore;
use anyhow::{Context, Result};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "portfolio";

/// Blob store backed by a `fjall` keyspace on disk.
pub struct DiskBlobStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskBlobStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .context("Failed to open portfolio partition")?;
        debug!("Opened disk store at {}", path.display());

        Ok(Self {
            keyspace,
            partition,
        })
    }
}

impl BlobStore for DiskBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .partition
            .get(key)
            .with_context(|| format!("Failed to read {key}"))?
            .map(|slice| slice.to_vec());
        debug!(key, hit = value.is_some(), "Disk store GET");
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.partition
            .insert(key, value)
            .with_context(|| format!("Failed to write {key}"))?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to flush store to disk")?;
        debug!(key, bytes = value.len(), "Disk store PUT");
        Ok(())
    }
}
