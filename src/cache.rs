//! Capacity-bounded in-memory cache with time-to-live expiry
//!
//! Entries expire lazily: a stale entry is only dropped when a `get`
//! touches it. Eviction on a full cache removes the oldest-inserted entry,
//! regardless of how recently it was read.

use crate::clock::{Clock, SystemClock};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    // Insertion order, oldest first
    order: VecDeque<String>,
}

impl<V> CacheState<V> {
    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            if let Some(pos) = self.order.iter().position(|k| k == key) {
                self.order.remove(pos);
            }
        }
        removed
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Key/value cache with TTL and insertion-order eviction
pub struct TtlCache<V> {
    state: Mutex<CacheState<V>>,
    stats: Mutex<CacheStats>,
    capacity: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

/// 100 entries, five minute TTL
impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache reading the system clock
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries (at least 1)
    /// * `ttl` - How long an entry stays visible after insertion
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        TtlCache {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            stats: Mutex::new(CacheStats::default()),
            capacity: capacity.max(1),
            ttl,
            clock,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_stats(&self) -> MutexGuard<'_, CacheStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `value` under `key`, evicting the oldest entry when full
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = self.clock.now();
        let mut state = self.lock_state();

        if state.entries.len() >= self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
                self.lock_stats().evictions += 1;
                debug!("cache full, evicted oldest key={}", oldest);
            }
        }

        let entry = CacheEntry {
            value,
            inserted_at: now,
        };
        if state.entries.insert(key.clone(), entry).is_none() {
            state.order.push_back(key);
        }
    }

    /// Look up `key`, dropping it if its TTL has passed
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut state = self.lock_state();

        let expired = match state.entries.get(key) {
            None => {
                self.lock_stats().misses += 1;
                return None;
            }
            Some(entry) => now.saturating_duration_since(entry.inserted_at) > self.ttl,
        };

        if expired {
            state.remove(key);
            let mut stats = self.lock_stats();
            stats.expirations += 1;
            stats.misses += 1;
            debug!("cache entry expired key={}", key);
            return None;
        }

        self.lock_stats().hits += 1;
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn delete(&self, key: &str) -> bool {
        self.lock_state().remove(key).is_some()
    }

    pub fn clear(&self) {
        let mut state = self.lock_state();
        state.entries.clear();
        state.order.clear();
    }

    /// Number of stored entries, including ones that expired but were not yet read
    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.len();
        let stats = self.lock_stats();
        CacheStats {
            entries,
            ..stats.clone()
        }
    }
}
