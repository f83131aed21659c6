//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CachePolicy, DEFAULT_SAVE_FREQUENCY};
use crate::error::{CacheError, Result};

/// Snapshot file name used when `CACHE_SNAPSHOT_FILE` is unset.
pub const DEFAULT_SNAPSHOT_FILE: &str = "snapcache.json";

/// Cache configuration parameters.
///
/// Every limit is optional; an unset limit is not enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_size: Option<usize>,
    /// Time-to-live in seconds
    pub entry_ttl_secs: Option<u64>,
    /// Time-to-idle in seconds
    pub entry_tti_secs: Option<u64>,
    /// Debounce window for snapshot saves, in milliseconds
    pub save_frequency_ms: u64,
    /// Directory holding the snapshot file; no persistence when unset
    pub snapshot_dir: Option<PathBuf>,
    /// Snapshot file name inside `snapshot_dir`
    pub snapshot_file: String,
}

impl Config {
    /// Loads the configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Maximum entries (default: unbounded)
    /// - `CACHE_ENTRY_TTL_SECS` - Time-to-live in seconds (default: none)
    /// - `CACHE_ENTRY_TTI_SECS` - Time-to-idle in seconds (default: none)
    /// - `CACHE_SAVE_FREQUENCY_MS` - Snapshot debounce window (default: 5000)
    /// - `CACHE_SNAPSHOT_DIR` - Snapshot directory (default: no persistence)
    /// - `CACHE_SNAPSHOT_FILE` - Snapshot file name (default: snapcache.json)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads the configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            max_size: parse(&lookup, "CACHE_MAX_SIZE")?,
            entry_ttl_secs: parse(&lookup, "CACHE_ENTRY_TTL_SECS")?,
            entry_tti_secs: parse(&lookup, "CACHE_ENTRY_TTI_SECS")?,
            save_frequency_ms: parse(&lookup, "CACHE_SAVE_FREQUENCY_MS")?
                .unwrap_or(defaults.save_frequency_ms),
            snapshot_dir: lookup("CACHE_SNAPSHOT_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            snapshot_file: lookup("CACHE_SNAPSHOT_FILE")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.snapshot_file),
        })
    }

    /// Builds the cache policy these settings describe.
    pub fn cache_policy(&self) -> Result<CachePolicy> {
        let mut builder = CachePolicy::builder();
        if let Some(max_size) = self.max_size {
            builder = builder.max_size(max_size)?;
        }
        if let Some(secs) = self.entry_ttl_secs {
            builder = builder.entry_ttl(Duration::from_secs(secs))?;
        }
        if let Some(secs) = self.entry_tti_secs {
            builder = builder.entry_tti(Duration::from_secs(secs))?;
        }
        Ok(builder.build())
    }

    pub fn save_frequency(&self) -> Duration {
        Duration::from_millis(self.save_frequency_ms)
    }
}

fn parse<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| CacheError::Config(format!("{name}={raw:?}: {err}"))),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_size: None,
            entry_ttl_secs: None,
            entry_tti_secs: None,
            save_frequency_ms: DEFAULT_SAVE_FREQUENCY.as_millis() as u64,
            snapshot_dir: None,
            snapshot_file: DEFAULT_SNAPSHOT_FILE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_size, None);
        assert_eq!(config.entry_ttl_secs, None);
        assert_eq!(config.entry_tti_secs, None);
        assert_eq!(config.save_frequency_ms, 5000);
        assert_eq!(config.snapshot_dir, None);
        assert_eq!(config.snapshot_file, "snapcache.json");
    }

    #[test]
    fn test_config_from_empty_lookup_is_default() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cache_policy().unwrap(), CachePolicy::default());
    }

    #[test]
    fn test_config_from_lookup_values() {
        let config = Config::from_lookup(lookup(&[
            ("CACHE_MAX_SIZE", "100"),
            ("CACHE_ENTRY_TTL_SECS", "60"),
            ("CACHE_SAVE_FREQUENCY_MS", "250"),
            ("CACHE_SNAPSHOT_DIR", "/tmp/cache"),
            ("CACHE_SNAPSHOT_FILE", "app.json"),
        ]))
        .unwrap();

        assert_eq!(config.max_size, Some(100));
        assert_eq!(config.save_frequency(), Duration::from_millis(250));
        assert_eq!(config.snapshot_dir, Some(PathBuf::from("/tmp/cache")));
        assert_eq!(config.snapshot_file, "app.json");

        let policy = config.cache_policy().unwrap();
        assert_eq!(policy.max_size(), Some(100));
        assert_eq!(policy.entry_ttl(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_config_rejects_garbage() {
        let result = Config::from_lookup(lookup(&[("CACHE_MAX_SIZE", "lots")]));
        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    #[test]
    fn test_config_rejects_ttl_and_tti_together() {
        let config = Config::from_lookup(lookup(&[
            ("CACHE_ENTRY_TTL_SECS", "60"),
            ("CACHE_ENTRY_TTI_SECS", "60"),
        ]))
        .unwrap();

        assert!(matches!(config.cache_policy(), Err(CacheError::InvalidState(_))));
    }

    #[test]
    fn test_config_rejects_zero_max_size() {
        let config = Config::from_lookup(lookup(&[("CACHE_MAX_SIZE", "0")])).unwrap();
        assert!(matches!(config.cache_policy(), Err(CacheError::InvalidArgument(_))));
    }
}
