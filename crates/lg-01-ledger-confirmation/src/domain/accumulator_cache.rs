//! # Committed Accumulator Cache
//!
//! Bounded map of state version to accumulator for recently committed
//! positions. Lets a node's historical tip be cross-checked without a
//! storage round-trip.
//!
//! Entries are evicted oldest-inserted first: lookups use `peek` so they
//! never refresh an entry's position.

use lru::LruCache;
use parking_lot::Mutex;
use shared_types::{Hash, StateVersion};
use std::num::NonZeroUsize;

/// Default number of committed accumulators kept.
pub const DEFAULT_ACCUMULATOR_CACHE_CAPACITY: usize = 2000;

/// Concurrent, bounded accumulator cache.
#[derive(Debug)]
pub struct AccumulatorCache {
    entries: Mutex<LruCache<StateVersion, Hash>>,
}

impl AccumulatorCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(non_zero(capacity))),
        }
    }

    /// Record the accumulator committed at `state_version`.
    pub fn insert(&self, state_version: StateVersion, accumulator: Hash) {
        self.entries.lock().put(state_version, accumulator);
    }

    /// Record a batch of committed positions under a single lock.
    pub fn extend<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (StateVersion, Hash)>,
    {
        let mut cache = self.entries.lock();
        for (state_version, accumulator) in entries {
            cache.put(state_version, accumulator);
        }
    }

    pub fn get(&self, state_version: StateVersion) -> Option<Hash> {
        self.entries.lock().peek(&state_version).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Change the capacity, evicting the oldest entries if shrinking.
    pub fn resize(&self, capacity: usize) {
        let capacity = non_zero(capacity);
        let mut cache = self.entries.lock();
        if cache.cap() != capacity {
            cache.resize(capacity);
        }
    }
}

impl Default for AccumulatorCache {
    fn default() -> Self {
        Self::new(DEFAULT_ACCUMULATOR_CACHE_CAPACITY)
    }
}

fn non_zero(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache = AccumulatorCache::new(4);
        cache.insert(10, [1u8; 32]);
        assert_eq!(cache.get(10), Some([1u8; 32]));
        assert_eq!(cache.get(11), None);
    }

    #[test]
    fn test_evicts_oldest_inserted_even_when_read() {
        let cache = AccumulatorCache::new(3);
        cache.extend([(1, [1u8; 32]), (2, [2u8; 32]), (3, [3u8; 32])]);

        // Reads must not protect an entry from eviction
        assert!(cache.get(1).is_some());
        cache.insert(4, [4u8; 32]);

        assert_eq!(cache.get(1), None);
        assert_eq!(cache.get(2), Some([2u8; 32]));
        assert_eq!(cache.get(4), Some([4u8; 32]));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_resize_shrinks() {
        let cache = AccumulatorCache::new(4);
        cache.extend((1..=4).map(|v| (v, [v as u8; 32])));
        cache.resize(2);
        assert_eq!(cache.capacity(), 2);
        assert_eq!(cache.get(2), None);
        assert_eq!(cache.get(4), Some([4u8; 32]));
    }

    #[test]
    fn test_zero_capacity_clamps_to_one() {
        let cache = AccumulatorCache::new(0);
        assert_eq!(cache.capacity(), 1);
        assert!(cache.is_empty());
    }
}
