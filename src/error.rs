//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Errors raised while configuring or building a cache.
///
/// Normal cache traffic never produces one of these: misses, expirations and
/// evictions are ordinary outcomes, not failures.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A policy or builder argument is out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A policy option conflicts with one already set
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A collaborator required by the chosen configuration is absent
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(String),

    /// No tokio runtime is available to host background work
    #[error("No runtime: {0}")]
    NoRuntime(String),

    /// A configuration value could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),
}

// == Snapshot Error Enum ==
/// Errors raised by snapshot persistence backends.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Reading or writing the backing file failed
    #[error("Snapshot I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding the snapshot failed
    #[error("Snapshot codec error: {0}")]
    Codec(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The backend cannot serve requests right now
    #[error("Snapshot backend unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Codec(Box::new(err))
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache construction.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_messages() {
        let err = CacheError::InvalidArgument("maxSize must be > 0".to_string());
        assert_eq!(err.to_string(), "Invalid argument: maxSize must be > 0");

        let err = CacheError::InvalidState("entry_ttl after entry_tti".to_string());
        assert_eq!(err.to_string(), "Invalid state: entry_ttl after entry_tti");
    }

    #[test]
    fn test_snapshot_error_from_json() {
        let json_err = serde_json::from_str::<Vec<u32>>("not json").unwrap_err();
        let err: SnapshotError = json_err.into();
        assert!(matches!(err, SnapshotError::Codec(_)));
        assert!(err.to_string().starts_with("Snapshot codec error"));
    }

    #[test]
    fn test_snapshot_io_error_names_path() {
        let err = SnapshotError::Io {
            path: PathBuf::from("/tmp/cache.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/tmp/cache.json"));
    }
}
