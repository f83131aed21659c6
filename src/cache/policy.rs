//! Cache Policy Module
//!
//! Describes the optional size and temporal limits a cache enforces. Only one
//! temporal policy may be active: either time-to-live, measured from an
//! entry's last write, or time-to-idle, measured from its last access.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::cache::CacheEntry;
use crate::clock::duration_millis;
use crate::error::{CacheError, Result};

// == Cache Policy ==
/// An immutable set of cache limits.
///
/// `CachePolicy::default()` enforces nothing: unbounded size, infinite lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachePolicy {
    max_size: Option<NonZeroUsize>,
    entry_ttl: Option<Duration>,
    entry_tti: Option<Duration>,
}

impl CachePolicy {
    /// Starts a new policy builder.
    pub fn builder() -> CachePolicyBuilder {
        CachePolicyBuilder::default()
    }

    /// Maximum number of entries the cache can hold.
    pub fn max_size(&self) -> Option<usize> {
        self.max_size.map(NonZeroUsize::get)
    }

    /// How long an entry lives after it was written.
    pub fn entry_ttl(&self) -> Option<Duration> {
        self.entry_ttl
    }

    /// How long an entry lives after it was last accessed.
    pub fn entry_tti(&self) -> Option<Duration> {
        self.entry_tti
    }

    pub fn has_max_size_policy(&self) -> bool {
        self.max_size.is_some()
    }

    pub fn has_ttl_policy(&self) -> bool {
        self.entry_ttl.is_some()
    }

    pub fn has_tti_policy(&self) -> bool {
        self.entry_tti.is_some()
    }

    /// The active temporal policy, if any.
    pub(crate) fn temporal_policy(&self) -> Option<TemporalPolicy> {
        match (self.entry_tti, self.entry_ttl) {
            (Some(tti), _) => Some(TemporalPolicy::TimeToIdle(duration_millis(tti))),
            (None, Some(ttl)) => Some(TemporalPolicy::TimeToLive(duration_millis(ttl))),
            (None, None) => None,
        }
    }

    /// The timestamp that orders entries under this policy.
    ///
    /// Entries are loaded from a snapshot in this order since the policy may
    /// have changed since the snapshot was written.
    pub(crate) fn sort_key<K, V>(&self, entry: &CacheEntry<K, V>) -> i64 {
        if self.has_tti_policy() {
            entry.last_access_date
        } else {
            entry.creation_date
        }
    }
}

/// Shortest TTL or TTI accepted. Entry timestamps have millisecond
/// resolution, so anything shorter would round down to no lifetime at all.
const MIN_ENTRY_LIFETIME: Duration = Duration::from_millis(1);

// == Cache Policy Builder ==
/// Builder for [`CachePolicy`].
///
/// Setting a TTL after a TTI (or the reverse) is rejected rather than
/// silently overriding the first choice.
#[derive(Debug, Clone, Default)]
pub struct CachePolicyBuilder {
    max_size: Option<NonZeroUsize>,
    entry_ttl: Option<Duration>,
    entry_tti: Option<Duration>,
}

impl CachePolicyBuilder {
    /// Sets the maximum number of entries. Must be > 0.
    pub fn max_size(mut self, max_size: usize) -> Result<Self> {
        let max_size = NonZeroUsize::new(max_size).ok_or_else(|| {
            CacheError::InvalidArgument(format!("max_size must be > 0. max_size = {max_size}"))
        })?;
        self.max_size = Some(max_size);
        Ok(self)
    }

    /// Sets the time-to-live. Must be at least 1ms and no TTI may be set.
    ///
    /// Limits are kept to whole milliseconds; any sub-millisecond remainder
    /// is dropped.
    pub fn entry_ttl(mut self, entry_ttl: Duration) -> Result<Self> {
        if entry_ttl < MIN_ENTRY_LIFETIME {
            return Err(CacheError::InvalidArgument(format!(
                "entry_ttl must be at least 1ms. entry_ttl = {entry_ttl:?}"
            )));
        }
        if let Some(entry_tti) = self.entry_tti {
            return Err(CacheError::InvalidState(format!(
                "entry_ttl cannot be set after entry_tti has been set. entry_tti = {entry_tti:?}"
            )));
        }
        self.entry_ttl = Some(entry_ttl);
        Ok(self)
    }

    /// Sets the time-to-idle. Must be at least 1ms and no TTL may be set.
    ///
    /// Limits are kept to whole milliseconds, as for [`entry_ttl`](Self::entry_ttl).
    pub fn entry_tti(mut self, entry_tti: Duration) -> Result<Self> {
        if entry_tti < MIN_ENTRY_LIFETIME {
            return Err(CacheError::InvalidArgument(format!(
                "entry_tti must be at least 1ms. entry_tti = {entry_tti:?}"
            )));
        }
        if let Some(entry_ttl) = self.entry_ttl {
            return Err(CacheError::InvalidState(format!(
                "entry_tti cannot be set after entry_ttl has been set. entry_ttl = {entry_ttl:?}"
            )));
        }
        self.entry_tti = Some(entry_tti);
        Ok(self)
    }

    pub fn build(self) -> CachePolicy {
        CachePolicy {
            max_size: self.max_size,
            entry_ttl: self.entry_ttl,
            entry_tti: self.entry_tti,
        }
    }
}

// == Temporal Policy ==
/// A resolved temporal limit in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TemporalPolicy {
    TimeToLive(i64),
    TimeToIdle(i64),
}

impl TemporalPolicy {
    /// True once the limit has been strictly exceeded at `now`.
    ///
    /// An entry whose limit is reached exactly at `now` is still live.
    pub(crate) fn is_expired<K, V>(&self, entry: &CacheEntry<K, V>, now: i64) -> bool {
        let (since, limit) = match *self {
            TemporalPolicy::TimeToLive(limit) => (entry.creation_date, limit),
            TemporalPolicy::TimeToIdle(limit) => (entry.last_access_date, limit),
        };
        since.saturating_add(limit) < now
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_has_no_limits() {
        let policy = CachePolicy::default();
        assert!(!policy.has_max_size_policy());
        assert!(!policy.has_ttl_policy());
        assert!(!policy.has_tti_policy());
        assert!(policy.temporal_policy().is_none());
    }

    #[test]
    fn test_builder_sets_every_field() {
        let policy = CachePolicy::builder()
            .max_size(10)
            .unwrap()
            .entry_ttl(Duration::from_secs(5))
            .unwrap()
            .build();

        assert_eq!(policy.max_size(), Some(10));
        assert_eq!(policy.entry_ttl(), Some(Duration::from_secs(5)));
        assert_eq!(policy.entry_tti(), None);
        assert!(policy.has_max_size_policy());
        assert!(policy.has_ttl_policy());
        assert!(!policy.has_tti_policy());
    }

    #[test]
    fn test_zero_max_size_rejected() {
        let result = CachePolicy::builder().max_size(0);
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
    }

    #[test]
    fn test_zero_durations_rejected() {
        let result = CachePolicy::builder().entry_ttl(Duration::ZERO);
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));

        let result = CachePolicy::builder().entry_tti(Duration::ZERO);
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
    }

    #[test]
    fn test_sub_millisecond_durations_rejected() {
        let result = CachePolicy::builder().entry_ttl(Duration::from_micros(500));
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));

        let result = CachePolicy::builder().entry_tti(Duration::from_nanos(999_999));
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));

        let policy = CachePolicy::builder()
            .entry_ttl(Duration::from_millis(1))
            .unwrap()
            .build();
        assert_eq!(policy.temporal_policy(), Some(TemporalPolicy::TimeToLive(1)));
    }

    #[test]
    fn test_ttl_after_tti_rejected() {
        let result = CachePolicy::builder()
            .entry_tti(Duration::from_secs(1))
            .unwrap()
            .entry_ttl(Duration::from_secs(1));
        assert!(matches!(result, Err(CacheError::InvalidState(_))));
    }

    #[test]
    fn test_tti_after_ttl_rejected() {
        let result = CachePolicy::builder()
            .entry_ttl(Duration::from_secs(1))
            .unwrap()
            .entry_tti(Duration::from_secs(1));
        assert!(matches!(result, Err(CacheError::InvalidState(_))));
    }

    #[test]
    fn test_temporal_policy_resolution() {
        let ttl = CachePolicy::builder()
            .entry_ttl(Duration::from_secs(2))
            .unwrap()
            .build();
        assert_eq!(ttl.temporal_policy(), Some(TemporalPolicy::TimeToLive(2000)));

        let tti = CachePolicy::builder()
            .entry_tti(Duration::from_millis(250))
            .unwrap()
            .build();
        assert_eq!(tti.temporal_policy(), Some(TemporalPolicy::TimeToIdle(250)));
    }

    #[test]
    fn test_expiration_boundary_is_strict() {
        let entry = CacheEntry::new("k", "v", 0);
        let ttl = TemporalPolicy::TimeToLive(1000);

        assert!(!ttl.is_expired(&entry, 1000), "limit reached exactly is not expired");
        assert!(ttl.is_expired(&entry, 1001));
    }

    #[test]
    fn test_tti_measures_from_last_access() {
        let entry = CacheEntry::new("k", "v", 0).accessed_at(900);
        let tti = TemporalPolicy::TimeToIdle(100);
        let ttl = TemporalPolicy::TimeToLive(100);

        assert!(!tti.is_expired(&entry, 1000));
        assert!(ttl.is_expired(&entry, 1000));
    }

    #[test]
    fn test_sort_key_follows_policy() {
        let entry = CacheEntry::new("k", "v", 10).accessed_at(50);
        let tti = CachePolicy::builder()
            .entry_tti(Duration::from_secs(1))
            .unwrap()
            .build();

        assert_eq!(tti.sort_key(&entry), 50);
        assert_eq!(CachePolicy::default().sort_key(&entry), 10);
    }
}
