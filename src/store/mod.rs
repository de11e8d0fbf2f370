pub mod disk;
pub mod memory;

pub use disk::DiskBlobStore;
pub use memory::MemoryBlobStore;
