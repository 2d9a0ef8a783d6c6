//! Bounded TTL memoization cache for read-heavy queries.
//!
//! Fronts paged reads (inconsistency history, closed-session scan lists) to
//! bound read amplification. Read-through only: an entry is never treated
//! as authoritative for a write decision.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cumulative hit/miss accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that fell through (absent or expired).
    pub misses: u64,
    /// Entries currently held.
    pub len: usize,
}

impl CacheStats {
    /// Total lookups since creation or the last `clear`.
    #[must_use]
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit rate in `[0, 1]`; zero before the first lookup.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.lookups();
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    insertion_order: VecDeque<K>,
    hits: u64,
    misses: u64,
}

/// Bounded cache with per-entry TTL and insertion-order eviction.
///
/// Eviction at capacity drops the least-recently-inserted key, not the
/// least-recently-read one. Expired entries are removed lazily on `get`.
/// All operations are synchronous and non-blocking.
#[derive(Debug)]
pub struct AuditCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    max_age: Duration,
    max_size: usize,
}

impl<K, V> AuditCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `max_size` entries for `max_age` each.
    #[must_use]
    pub fn new(max_age: Duration, max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                insertion_order: VecDeque::new(),
                hits: 0,
                misses: 0,
            }),
            max_age,
            max_size: max_size.max(1),
        }
    }

    /// Look up a key. An entry past its TTL counts as a miss and is
    /// removed.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() > self.max_age,
            None => {
                inner.misses += 1;
                return None;
            }
        };

        if expired {
            inner.entries.remove(key);
            inner.insertion_order.retain(|k| k != key);
            inner.misses += 1;
            return None;
        }

        inner.hits += 1;
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert a value. At capacity the least-recently-inserted entry is
    /// evicted first. Re-inserting an existing key refreshes its timestamp
    /// and insertion position.
    pub fn set(&self, key: K, value: V) {
        let mut inner = self.lock();

        if inner.entries.remove(&key).is_some() {
            inner.insertion_order.retain(|k| k != &key);
        }

        while inner.entries.len() >= self.max_size {
            let Some(oldest) = inner.insertion_order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }

        inner.insertion_order.push_back(key.clone());
        inner.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Current counters and size.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            len: inner.entries.len(),
        }
    }

    /// Drop all entries and reset the counters.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.insertion_order.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<K, V>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
