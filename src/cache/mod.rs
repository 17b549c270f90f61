//! Short-lived in-memory caches
//!
//! [`TtlCache`] is a string-keyed map whose entries are served only while
//! younger than the TTL. An optional capacity bounds the map: when full,
//! the oldest observation is dropped if it is stale, otherwise the least
//! recently used entry is evicted. Both candidates come from ordered
//! indexes, so eviction never scans the map.

mod config;

pub use config::ConfigCache;

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::clock::Clock;

/// Validity of a raw session-token string, as last observed by the gate
pub type SessionValidationCache = TtlCache<bool>;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub observed_at: DateTime<Utc>,
    pub value: V,
    inserted: u64,
    last_used: u64,
}

struct Inner<V> {
    /// Insertion tick -> key, oldest observation first
    by_insert: BTreeMap<u64, String>,
    /// Last-use tick -> key, least recently used first
    by_use: BTreeMap<u64, String>,
    entries: HashMap<String, CacheEntry<V>>,
    tick: u64,
}

impl<V> Inner<V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.by_insert.remove(&entry.inserted);
        self.by_use.remove(&entry.last_used);
        Some(entry)
    }

    fn touch(&mut self, key: &str) {
        let tick = self.next_tick();
        if let Some(entry) = self.entries.get_mut(key) {
            self.by_use.remove(&entry.last_used);
            entry.last_used = tick;
            self.by_use.insert(tick, key.to_string());
        }
    }
}

pub struct TtlCache<V> {
    capacity: Option<usize>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<V>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            capacity: None,
            clock,
            inner: Mutex::new(Inner {
                by_insert: BTreeMap::new(),
                by_use: BTreeMap::new(),
                entries: HashMap::new(),
                tick: 0,
            }),
            ttl,
        }
    }

    /// Cap the number of entries held at once
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity.max(1));
        self
    }

    /// Return the cached value if it is still fresh. Stale entries are dropped.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.lock();

        let fresh = match inner.entries.get(key) {
            Some(entry) => self.is_fresh(entry, now),
            None => return None,
        };

        if !fresh {
            inner.remove(key);
            return None;
        }

        inner.touch(key);
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Record `value` as observed now
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = self.clock.now();
        let mut inner = self.lock();

        inner.remove(&key);
        if let Some(capacity) = self.capacity {
            if inner.entries.len() >= capacity {
                self.make_room(&mut inner, now, capacity);
            }
        }

        let tick = inner.next_tick();
        inner.by_insert.insert(tick, key.clone());
        inner.by_use.insert(tick, key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                observed_at: now,
                value,
                inserted: tick,
                last_used: tick,
            },
        );
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.lock().remove(key).map(|e| e.value)
    }

    /// Drop every stale entry, returning how many were removed
    pub fn purge_stale(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.lock();
        let stale: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| !self.is_fresh(entry, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            inner.remove(key);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        now - entry.observed_at < self.ttl
    }

    fn make_room(&self, inner: &mut Inner<V>, now: DateTime<Utc>, capacity: usize) {
        while inner.entries.len() >= capacity {
            let oldest = inner.by_insert.values().next().cloned();
            let oldest_is_stale = oldest
                .as_deref()
                .and_then(|key| inner.entries.get(key))
                .is_some_and(|entry| !self.is_fresh(entry, now));

            let victim = if oldest_is_stale {
                oldest
            } else {
                inner.by_use.values().next().cloned()
            };

            match victim {
                Some(key) => {
                    inner.remove(&key);
                }
                None => break,
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache(clock: &Arc<ManualClock>) -> TtlCache<bool> {
        TtlCache::new(Duration::minutes(5), clock.clone())
    }

    #[test]
    fn test_fresh_entry_is_served() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(&clock);

        cache.insert("tok", true);
        clock.advance(Duration::minutes(4));

        assert_eq!(cache.get("tok"), Some(true));
    }

    #[test]
    fn test_stale_entry_is_absent() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(&clock);

        cache.insert("tok", true);
        clock.advance(Duration::minutes(5));

        assert_eq!(cache.get("tok"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reinsert_refreshes_observation_time() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(&clock);

        cache.insert("tok", true);
        clock.advance(Duration::minutes(4));
        cache.insert("tok", false);
        clock.advance(Duration::minutes(4));

        assert_eq!(cache.get("tok"), Some(false));
    }

    #[test]
    fn test_purge_stale() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(&clock);

        cache.insert("old", true);
        clock.advance(Duration::minutes(3));
        cache.insert("new", true);
        clock.advance(Duration::minutes(3));

        assert_eq!(cache.purge_stale(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("new"), Some(true));
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(&clock).with_capacity(2);

        cache.insert("a", true);
        cache.insert("b", true);
        // Touch "a" so "b" becomes the eviction candidate
        assert_eq!(cache.get("a"), Some(true));
        cache.insert("c", true);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(true));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("c"), Some(true));
    }

    #[test]
    fn test_capacity_prefers_dropping_stale_entries() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(&clock).with_capacity(2);

        cache.insert("stale", true);
        clock.advance(Duration::minutes(4));
        cache.insert("fresh", true);
        // Make "fresh" the least recently used of the two
        assert_eq!(cache.get("stale"), Some(true));
        clock.advance(Duration::minutes(2));
        cache.insert("newest", true);

        assert_eq!(cache.get("fresh"), Some(true));
        assert_eq!(cache.get("newest"), Some(true));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_full_cache_keeps_most_recent_entries() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(&clock).with_capacity(10);

        for i in 0..100 {
            cache.insert(format!("tok-{i}"), true);
        }

        assert_eq!(cache.len(), 10);
        assert_eq!(cache.get("tok-89"), None);
        for i in 90..100 {
            assert_eq!(cache.get(&format!("tok-{i}")), Some(true));
        }
    }

    #[test]
    fn test_removed_entry_leaves_no_eviction_candidate() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(&clock).with_capacity(2);

        cache.insert("a", true);
        cache.insert("b", true);
        assert_eq!(cache.remove("a"), Some(true));
        cache.insert("c", true);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b"), Some(true));
        assert_eq!(cache.get("c"), Some(true));
    }

    #[test]
    fn test_updating_existing_key_does_not_evict() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(&clock).with_capacity(2);

        cache.insert("a", true);
        cache.insert("b", true);
        cache.insert("a", false);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b"), Some(true));
    }
}
