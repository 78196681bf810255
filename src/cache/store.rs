//! In-memory TTL response cache with access-order eviction
//!
//! The store is process-lifetime only. Entries carry a TTL and resource
//! labels; freshness is a pure function of age vs TTL, with a configurable
//! stale window past the TTL during which the stale-serving path may still
//! use the value.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::config::CacheConfig;

/// Result of a full cache lookup, with freshness classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// No entry, or the entry aged past the stale window and was dropped
    Miss,
    /// Entry age is below its TTL
    Fresh(Value),
    /// Entry age is between TTL and `stale_factor * TTL`; usable, but the
    /// caller should refresh it off-path
    Stale(Value),
    /// A recent fetch for this key failed; the failure is remembered
    /// briefly to dampen retry storms
    Failed(String),
}

enum Payload {
    Value(Value),
    Error(String),
}

struct Entry {
    payload: Payload,
    endpoint: String,
    labels: Vec<String>,
    stored_at: Instant,
    ttl: Duration,
}

struct Inner {
    entries: HashMap<String, Entry>,
    // key -> last access, ranked for eviction
    access: HashMap<String, Instant>,
}

/// Counters describing cache behavior since construction.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub stale_hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

/// Keyed in-memory store for API response payloads.
///
/// One instance per process, constructed at startup and passed by reference
/// to consumers; interior mutability keeps call sites immutable.
pub struct ResponseCache {
    inner: Mutex<Inner>,
    capacity: usize,
    evict_fraction: f64,
    stale_factor: u32,
    hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
}

impl ResponseCache {
    /// Create a store with explicit tuning.
    pub fn new(capacity: usize, evict_fraction: f64, stale_factor: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                access: HashMap::new(),
            }),
            capacity,
            evict_fraction,
            stale_factor,
            hits: AtomicU64::new(0),
            stale_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Create a store from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.evict_fraction, config.stale_factor)
    }

    /// Look up a key with full freshness classification.
    ///
    /// Updates the access timestamp. Entries past the stale window are
    /// removed on the way out.
    pub fn lookup(&self, key: &str) -> Lookup {
        let now = Instant::now();
        let mut inner = self.lock();

        // Classify first, mutate after, so the entry borrow has ended
        let outcome = inner.entries.get(key).map(|entry| {
            let age = now.duration_since(entry.stored_at);
            match &entry.payload {
                Payload::Error(message) if age < entry.ttl => Lookup::Failed(message.clone()),
                Payload::Error(_) => Lookup::Miss,
                Payload::Value(value) if age < entry.ttl => Lookup::Fresh(value.clone()),
                Payload::Value(value) if age < entry.ttl * self.stale_factor => {
                    Lookup::Stale(value.clone())
                }
                Payload::Value(_) => Lookup::Miss,
            }
        });

        match outcome {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Lookup::Miss
            }
            Some(Lookup::Miss) => {
                // Aged past the stale window (or past the error TTL)
                inner.entries.remove(key);
                inner.access.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                Lookup::Miss
            }
            Some(hit) => {
                inner.access.insert(key.to_string(), now);
                match hit {
                    Lookup::Fresh(_) => {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                    }
                    Lookup::Stale(_) => {
                        self.stale_hits.fetch_add(1, Ordering::Relaxed);
                    }
                    _ => {}
                }
                hit
            }
        }
    }

    /// Get a value only if it is still fresh; anything else is a miss.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.lookup(key) {
            Lookup::Fresh(value) => Some(value),
            _ => None,
        }
    }

    /// Store a successful response payload.
    pub fn set(&self, key: &str, endpoint: &str, value: Value, ttl: Duration, labels: Vec<String>) {
        let now = Instant::now();
        {
            let mut inner = self.lock();
            inner.entries.insert(
                key.to_string(),
                Entry {
                    payload: Payload::Value(value),
                    endpoint: endpoint.to_string(),
                    labels,
                    stored_at: now,
                    ttl,
                },
            );
            inner.access.insert(key.to_string(), now);
        }
        self.maybe_evict();
    }

    /// Remember a failed fetch under a short TTL.
    pub fn set_error(
        &self,
        key: &str,
        endpoint: &str,
        message: String,
        ttl: Duration,
        labels: Vec<String>,
    ) {
        let now = Instant::now();
        {
            let mut inner = self.lock();
            inner.entries.insert(
                key.to_string(),
                Entry {
                    payload: Payload::Error(message),
                    endpoint: endpoint.to_string(),
                    labels,
                    stored_at: now,
                    ttl,
                },
            );
            inner.access.insert(key.to_string(), now);
        }
        self.maybe_evict();
    }

    /// Remove a single entry by key.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut inner = self.lock();
        let removed = inner.entries.remove(key).is_some();
        inner.access.remove(key);
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Remove every entry tagged with the given resource label.
    ///
    /// Mutation paths call this immediately after the mutation commits so
    /// later reads cannot observe now-incorrect cached data. Deliberately
    /// coarse; over-invalidation is the intended trade.
    pub fn invalidate_label(&self, label: &str) -> usize {
        let mut inner = self.lock();
        let keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.labels.iter().any(|l| l == label))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &keys {
            inner.entries.remove(key);
            inner.access.remove(key);
        }

        let removed = keys.len();
        if removed > 0 {
            log::debug!("Invalidated {} entries for label {}", removed, label);
            self.invalidations
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Remove every entry whose endpoint name contains the substring.
    pub fn invalidate_matching(&self, pattern: &str) -> usize {
        let mut inner = self.lock();
        let keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.endpoint.contains(pattern))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &keys {
            inner.entries.remove(key);
            inner.access.remove(key);
        }

        let removed = keys.len();
        if removed > 0 {
            self.invalidations
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Drop everything.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        inner.access.clear();
        removed
    }

    /// Current entry count.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// True if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the behavior counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    /// Evict the least-recently-accessed fraction once capacity is exceeded.
    ///
    /// Removes at most `ceil(len * evict_fraction)` entries per pass.
    fn maybe_evict(&self) {
        let mut inner = self.lock();
        if inner.entries.len() <= self.capacity {
            return;
        }

        let mut ranked: Vec<(String, Instant)> = inner
            .access
            .iter()
            .map(|(k, t)| (k.clone(), *t))
            .collect();
        ranked.sort_by_key(|(_, t)| *t);

        let batch = ((inner.entries.len() as f64 * self.evict_fraction).ceil() as usize).max(1);

        let mut removed = 0;
        for (key, _) in ranked.into_iter().take(batch) {
            inner.entries.remove(&key);
            inner.access.remove(&key);
            removed += 1;
        }

        if removed > 0 {
            log::debug!("Evicted {} least-recently-used cache entries", removed);
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-update; the cache is best-effort,
        // so keep serving whatever state remains.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
