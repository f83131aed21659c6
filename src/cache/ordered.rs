//! Ordered Store Module
//!
//! The map that decides what is "in" the cache. Iteration order is eviction
//! order: the head holds the oldest entry.

use std::hash::Hash;

use hashlink::LinkedHashMap;

use crate::cache::CacheEntry;

/// Initial capacity used when nothing better is known.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

// == Ordered Store ==
/// An insertion- or access-ordered map from key to [`CacheEntry`].
///
/// - Head = oldest (evicted first)
/// - Tail = newest
///
/// In access order every `get` and `put` moves the key to the tail. In
/// insertion order only a brand new key lands at the tail; overwriting an
/// existing key keeps its position, so callers that want an update to count
/// as fresh must `remove` first.
///
/// Not synchronized. The manager serializes all access.
#[derive(Debug)]
pub struct OrderedStore<K, V> {
    entries: LinkedHashMap<K, CacheEntry<K, V>>,
    access_order: bool,
}

impl<K, V> OrderedStore<K, V>
where
    K: Eq + Hash,
{
    // == Constructor ==
    /// Creates an empty store.
    pub fn new(access_order: bool) -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY, access_order)
    }

    pub fn with_capacity(capacity: usize, access_order: bool) -> Self {
        Self {
            entries: LinkedHashMap::with_capacity(capacity),
            access_order,
        }
    }

    // == Get ==
    /// Looks up an entry, moving it to the tail in access order.
    pub fn get(&mut self, key: &K) -> Option<&CacheEntry<K, V>> {
        if self.access_order {
            self.entries.to_back(key);
        }
        self.entries.get(key)
    }

    // == Put ==
    /// Stores an entry under `key`.
    pub fn put(&mut self, key: K, entry: CacheEntry<K, V>) {
        if self.access_order {
            // insert always relinks at the back
            self.entries.insert(key, entry);
        } else if let Some(slot) = self.entries.get_mut(&key) {
            *slot = entry;
        } else {
            self.entries.insert(key, entry);
        }
    }

    /// Stores every entry in iteration order.
    pub fn put_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, CacheEntry<K, V>)>,
    {
        for (key, entry) in entries {
            self.put(key, entry);
        }
    }

    // == Remove ==
    pub fn remove(&mut self, key: &K) -> Option<CacheEntry<K, V>> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Head Removal ==
    /// Removes up to `count` entries from the head. Returns how many went.
    pub fn remove_front(&mut self, count: usize) -> usize {
        let mut removed = 0;
        while removed < count && self.entries.pop_front().is_some() {
            removed += 1;
        }
        removed
    }

    /// Removes head entries while `predicate` holds, stopping at the first
    /// entry it rejects. Returns how many went.
    pub fn remove_front_while<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&CacheEntry<K, V>) -> bool,
    {
        let mut removed = 0;
        loop {
            let matches = match self.entries.front() {
                Some((_, entry)) => predicate(entry),
                None => false,
            };
            if !matches {
                break;
            }
            self.entries.pop_front();
            removed += 1;
        }
        removed
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> OrderedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Copies every entry out, head first.
    pub fn entries(&self) -> Vec<CacheEntry<K, V>> {
        self.entries.values().cloned().collect()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &'static str, at: i64) -> (&'static str, CacheEntry<&'static str, i64>) {
        (key, CacheEntry::new(key, at, at))
    }

    fn keys(store: &OrderedStore<&'static str, i64>) -> Vec<&'static str> {
        store.entries().into_iter().map(|e| e.key).collect()
    }

    #[test]
    fn test_store_new() {
        let store: OrderedStore<&str, i64> = OrderedStore::new(false);
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_insertion_order_kept_on_get() {
        let mut store = OrderedStore::new(false);
        store.put_all([entry("a", 1), entry("b", 2), entry("c", 3)]);

        assert!(store.get(&"a").is_some());
        assert_eq!(keys(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_access_order_moves_on_get() {
        let mut store = OrderedStore::new(true);
        store.put_all([entry("a", 1), entry("b", 2), entry("c", 3)]);

        assert!(store.get(&"a").is_some());
        assert_eq!(keys(&store), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_get_missing_key_in_access_order() {
        let mut store = OrderedStore::new(true);
        store.put_all([entry("a", 1)]);

        assert!(store.get(&"zzz").is_none());
        assert_eq!(keys(&store), vec!["a"]);
    }

    #[test]
    fn test_update_keeps_position_in_insertion_order() {
        let mut store = OrderedStore::new(false);
        store.put_all([entry("a", 1), entry("b", 2)]);

        store.put("a", CacheEntry::new("a", 10, 10));

        assert_eq!(keys(&store), vec!["a", "b"]);
        assert_eq!(store.get(&"a").unwrap().value, 10);
    }

    #[test]
    fn test_update_moves_to_tail_in_access_order() {
        let mut store = OrderedStore::new(true);
        store.put_all([entry("a", 1), entry("b", 2)]);

        store.put("a", CacheEntry::new("a", 10, 10));

        assert_eq!(keys(&store), vec!["b", "a"]);
    }

    #[test]
    fn test_remove_then_put_moves_to_tail() {
        let mut store = OrderedStore::new(false);
        store.put_all([entry("a", 1), entry("b", 2)]);

        store.remove(&"a");
        store.put("a", CacheEntry::new("a", 3, 3));

        assert_eq!(keys(&store), vec!["b", "a"]);
    }

    #[test]
    fn test_remove_nonexistent_key() {
        let mut store = OrderedStore::new(false);
        store.put_all([entry("a", 1)]);

        assert!(store.remove(&"missing").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_front() {
        let mut store = OrderedStore::new(false);
        store.put_all([entry("a", 1), entry("b", 2), entry("c", 3)]);

        assert_eq!(store.remove_front(2), 2);
        assert_eq!(keys(&store), vec!["c"]);

        // asking for more than exists drains what is there
        assert_eq!(store.remove_front(5), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_front_while_stops_at_first_rejected() {
        let mut store = OrderedStore::new(false);
        store.put_all([entry("a", 1), entry("b", 5), entry("c", 2)]);

        // "c" matches too but sits behind "b"
        let removed = store.remove_front_while(|e| e.value < 3);

        assert_eq!(removed, 1);
        assert_eq!(keys(&store), vec!["b", "c"]);
    }

    #[test]
    fn test_remove_front_while_on_empty_store() {
        let mut store: OrderedStore<&str, i64> = OrderedStore::new(true);
        assert_eq!(store.remove_front_while(|_| true), 0);
    }

    #[test]
    fn test_entries_copied_head_first() {
        let mut store = OrderedStore::new(false);
        store.put_all([entry("a", 1), entry("b", 2)]);

        let copied = store.entries();
        assert_eq!(copied.len(), 2);
        assert_eq!(copied[0].key, "a");
        assert_eq!(copied[1].key, "b");
    }

    #[test]
    fn test_clear() {
        let mut store = OrderedStore::new(false);
        store.put_all([entry("a", 1), entry("b", 2)]);
        store.clear();

        assert!(store.is_empty());
        assert!(store.get(&"a").is_none());
    }
}
