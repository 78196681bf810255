//! Navigation-driven cache prefetching
//!
//! Learns `(from_page, to_page)` transitions with frequency/recency-decayed
//! scores, persists them locally between sessions, and warms the cache for
//! the most likely next pages after each navigation. Purely best-effort:
//! wrong predictions cost a cheap wasted request, persistence failures are
//! logged and ignored, and nothing here runs on the caller's path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::{AcceleratedTransport, Transport};
use crate::config::PrefetchConfig;
use crate::error::{Error, Result};

/// Delay before warm requests go out, keeping them off the navigation path.
const WARM_DELAY: Duration = Duration::from_millis(50);

/// One observed page-to-page transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    /// Page navigated from
    pub from: String,

    /// Page navigated to
    pub to: String,

    /// Decayed observation count
    pub count: f64,

    /// When the transition was last observed
    pub last_used: DateTime<Utc>,
}

/// Learned navigation patterns, persisted as an array of
/// `[key, transition]` pairs.
///
/// A missing or corrupt pattern file degrades to an empty set, never an
/// error.
pub struct TransitionStore {
    patterns: Mutex<HashMap<String, Transition>>,
    path: Option<PathBuf>,
    half_life_hours: f64,
}

impl TransitionStore {
    /// Default persistence location (~/.cache/martlet/patterns.json).
    pub fn default_path() -> Result<PathBuf> {
        let cache_base = dirs::cache_dir()
            .ok_or_else(|| Error::Other("Could not determine cache directory".to_string()))?;
        Ok(cache_base.join("martlet").join("patterns.json"))
    }

    /// Load patterns from `path`, or start empty.
    pub fn load(path: Option<PathBuf>, half_life_hours: f64) -> Self {
        let patterns = path
            .as_deref()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|contents| {
                serde_json::from_str::<Vec<(String, Transition)>>(&contents).ok()
            })
            .map(|pairs| pairs.into_iter().collect())
            .unwrap_or_default();

        Self {
            patterns: Mutex::new(patterns),
            path,
            half_life_hours,
        }
    }

    /// In-memory store with no persistence.
    pub fn ephemeral(half_life_hours: f64) -> Self {
        Self::load(None, half_life_hours)
    }

    /// Record a navigation from one page to another.
    pub fn record(&self, from: &str, to: &str) {
        if from == to {
            return;
        }

        let now = Utc::now();
        let key = format!("{}->{}", from, to);
        let mut patterns = self.lock();

        let entry = patterns.entry(key).or_insert_with(|| Transition {
            from: from.to_string(),
            to: to.to_string(),
            count: 0.0,
            last_used: now,
        });
        entry.count = self.decayed_count(entry, now) + 1.0;
        entry.last_used = now;

        self.persist(&patterns);
    }

    /// Most likely next pages from `from`, best first.
    pub fn predict(&self, from: &str, limit: usize) -> Vec<String> {
        let now = Utc::now();
        let patterns = self.lock();

        let mut scored: Vec<(String, f64)> = patterns
            .values()
            .filter(|t| t.from == from)
            .map(|t| (t.to.clone(), self.decayed_count(t, now)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored.into_iter().take(limit).map(|(to, _)| to).collect()
    }

    /// Number of distinct transitions learned.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Copy of every learned transition, for display.
    pub fn snapshot(&self) -> Vec<Transition> {
        self.lock().values().cloned().collect()
    }

    /// True when nothing has been learned yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observation count decayed by how long ago it was last seen.
    fn decayed_count(&self, transition: &Transition, now: DateTime<Utc>) -> f64 {
        let age_hours = (now - transition.last_used).num_milliseconds().max(0) as f64 / 3_600_000.0;
        transition.count * 0.5_f64.powf(age_hours / self.half_life_hours)
    }

    fn persist(&self, patterns: &HashMap<String, Transition>) {
        let Some(ref path) = self.path else {
            return;
        };

        let pairs: Vec<(&String, &Transition)> = patterns.iter().collect();
        let result = serde_json::to_string(&pairs).map_err(Error::from).and_then(|contents| {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, contents)?;
            Ok(())
        });

        if let Err(err) = result {
            log::warn!("Failed to persist navigation patterns: {}", err);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Transition>> {
        self.patterns.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct PrefetcherInner<T> {
    transitions: Arc<TransitionStore>,
    transport: AcceleratedTransport<T>,
    page_endpoints: HashMap<String, Vec<String>>,
    max_warm_pages: usize,
    enabled: bool,
    current_page: Mutex<Option<String>>,
    warmed: AtomicU64,
}

/// Warms the cache for predicted next pages after each navigation.
///
/// Cheap to clone; clones share the learned patterns and counters.
pub struct Prefetcher<T> {
    inner: Arc<PrefetcherInner<T>>,
}

impl<T> Clone for Prefetcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport + 'static> Prefetcher<T> {
    /// Create a prefetcher over the accelerated transport.
    pub fn new(
        transport: AcceleratedTransport<T>,
        transitions: Arc<TransitionStore>,
        config: &PrefetchConfig,
    ) -> Self {
        Self {
            inner: Arc::new(PrefetcherInner {
                transitions,
                transport,
                page_endpoints: config.page_endpoints.clone(),
                max_warm_pages: config.max_warm_pages,
                enabled: config.enabled,
                current_page: Mutex::new(None),
                warmed: AtomicU64::new(0),
            }),
        }
    }

    /// Note arrival at a page: learn the transition that got us here and
    /// warm the cache for where we will probably go next.
    pub fn visit(&self, page: &str) {
        let previous = {
            let mut current = self
                .inner
                .current_page
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            current.replace(page.to_string())
        };

        if let Some(ref previous) = previous
            && previous != page
        {
            self.inner.transitions.record(previous, page);
        }

        if !self.inner.enabled {
            return;
        }

        let predicted = self.inner.transitions.predict(page, self.inner.max_warm_pages);
        if predicted.is_empty() {
            return;
        }

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(WARM_DELAY).await;
            for page in predicted {
                let Some(endpoints) = this.inner.page_endpoints.get(&page) else {
                    continue;
                };
                for endpoint in endpoints {
                    // Results land in the cache; failures are irrelevant
                    match this.inner.transport.call(endpoint, &json!({})).await {
                        Ok(_) => {
                            this.inner.warmed.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            log::debug!("Prefetch of {} failed: {}", endpoint, err);
                        }
                    }
                }
            }
        });
    }

    /// Number of warm requests that populated the cache.
    pub fn warmed(&self) -> u64 {
        self.inner.warmed.load(Ordering::Relaxed)
    }
}
