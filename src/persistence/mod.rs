//! Persistence Module
//!
//! Snapshot persistence: the whole entry set is written and read back as a
//! single unit. The cache manager is the only caller.

mod file;
mod serializer;
mod snapshot;

pub use file::SnapshotFileCache;
pub use serializer::{JsonSerializer, SnapshotSerializer};
pub use snapshot::{InMemorySnapshotCache, SnapshotPersistentCache};
