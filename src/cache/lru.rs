//! A size-bounded, TTL-aware LRU used as the cache's L1 tier.
//!
//! Adapted from a textbook HashMap + doubly-linked-list LRU (the `Rc`/
//! `RefCell` version isn't thread-safe; here the whole structure sits
//! behind a single mutex, same tradeoff `report-tags` makes for its
//! connection pool state: one lock, short critical sections).

use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Simplified LRU: recency is tracked via a monotonic counter per entry
/// rather than an intrusive linked list. Eviction scans for the minimum
/// counter, which is O(n) instead of O(1) — acceptable at the capacities
/// this cache runs at (thousands of entries), and much simpler to keep
/// correct under a single mutex.
pub struct LruCache<V> {
    capacity: usize,
    map: HashMap<String, Entry<V>>,
    recency: HashMap<String, u64>,
    clock: u64,
    pub evictions: u64,
}

impl<V: Clone> LruCache<V> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "LRU cache capacity must be greater than 0");
        Self {
            capacity,
            map: HashMap::new(),
            recency: HashMap::new(),
            clock: 0,
            evictions: 0,
        }
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.map.get(key) {
            Some(entry) => entry.is_expired(),
            None => return None,
        };
        if expired {
            self.map.remove(key);
            self.recency.remove(key);
            return None;
        }
        self.clock += 1;
        self.recency.insert(key.to_string(), self.clock);
        self.map.get(key).map(|e| e.value.clone())
    }

    pub fn put(&mut self, key: String, value: V, ttl: Duration) {
        if !self.map.contains_key(&key) && self.map.len() >= self.capacity {
            self.evict_lru();
        }
        self.clock += 1;
        self.recency.insert(key.clone(), self.clock);
        self.map.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    fn evict_lru(&mut self) {
        let Some(lru_key) = self
            .recency
            .iter()
            .min_by_key(|(_, &clock)| clock)
            .map(|(k, _)| k.clone())
        else {
            return;
        };
        self.map.remove(&lru_key);
        self.recency.remove(&lru_key);
        self.evictions += 1;
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
