//! File-backed snapshot persistence.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::error::SnapshotError;
use crate::persistence::{SnapshotPersistentCache, SnapshotSerializer};

/// Persists snapshots to a single file.
///
/// Only one `SnapshotFileCache` should exist per file at a time, and it is
/// not meant for concurrent callers.
#[derive(Debug)]
pub struct SnapshotFileCache<T, S> {
    path: PathBuf,
    serializer: S,
    _data: PhantomData<fn() -> T>,
}

impl<T, S> SnapshotFileCache<T, S>
where
    S: SnapshotSerializer<T>,
{
    /// Opens (creating if needed) `filename` inside `parent_dir`.
    ///
    /// The filename should be unique across every cache in the process, for
    /// example `com.example.feature.json`.
    pub async fn create(
        parent_dir: impl AsRef<Path>,
        filename: &str,
        serializer: S,
    ) -> Result<Self, SnapshotError> {
        let path = parent_dir.as_ref().join(filename);
        let cache = Self::at_path(path, serializer);
        cache.ensure_file().await?;

        info!("Snapshot file cache ready at {:?}", cache.path);
        Ok(cache)
    }

    /// Wraps `path` without touching the filesystem. The file and its parent
    /// directory are created lazily on first read or save.
    pub fn at_path(path: impl Into<PathBuf>, serializer: S) -> Self {
        Self {
            path: path.into(),
            serializer,
            _data: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_file(&self) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|source| SnapshotError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl<T, S> SnapshotPersistentCache<T> for SnapshotFileCache<T, S>
where
    T: Send + Sync + 'static,
    S: SnapshotSerializer<T> + 'static,
{
    async fn read(&self) -> Result<Option<T>, SnapshotError> {
        self.ensure_file().await?;
        let bytes = fs::read(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        debug!("Read {} snapshot bytes from {:?}", bytes.len(), self.path);
        self.serializer.decode(&bytes)
    }

    async fn save(&self, data: Option<T>) -> Result<(), SnapshotError> {
        self.ensure_file().await?;
        let bytes = self.serializer.encode(data.as_ref())?;

        // write beside the target then swap, so a crash mid-write leaves the
        // previous snapshot intact
        let temp_path = self.temp_path();
        fs::write(&temp_path, &bytes)
            .await
            .map_err(|source| SnapshotError::Io {
                path: temp_path.clone(),
                source,
            })?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        debug!("Wrote {} snapshot bytes to {:?}", bytes.len(), self.path);
        Ok(())
    }
}
