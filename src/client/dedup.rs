//! Request deduplication (single-flight)
//!
//! Collapses concurrent identical requests onto one underlying network
//! call. All callers joined to an in-flight request observe the same
//! eventual value or the same eventual error.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;

use crate::error::ApiResult;

type SharedFetch = Shared<BoxFuture<'static, ApiResult<Value>>>;

struct InFlight {
    generation: u64,
    started: Instant,
    future: SharedFetch,
}

/// Single-flight tracker for outstanding requests, keyed by request
/// fingerprint.
///
/// An entry is deregistered when its request settles. The safety timeout
/// covers a request that never settles: past it, a new request is allowed
/// even though the old future is still registered.
pub struct Deduplicator {
    in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
    timeout: Duration,
    next_generation: AtomicU64,
    launched: AtomicU64,
    collapsed: AtomicU64,
}

impl Deduplicator {
    /// Create a deduplicator with the given safety timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            timeout,
            next_generation: AtomicU64::new(0),
            launched: AtomicU64::new(0),
            collapsed: AtomicU64::new(0),
        }
    }

    /// Join the in-flight request for `key`, or launch a new one from
    /// `factory`.
    ///
    /// At most one underlying request per key is outstanding at any
    /// instant. The factory is only invoked when a launch happens.
    pub async fn run<F, Fut>(&self, key: &str, factory: F) -> ApiResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<Value>> + Send + 'static,
    {
        self.obtain(key, factory).await
    }

    fn obtain<F, Fut>(&self, key: &str, factory: F) -> SharedFetch
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<Value>> + Send + 'static,
    {
        let mut map = lock(&self.in_flight);

        if let Some(existing) = map.get(key)
            && existing.started.elapsed() < self.timeout
        {
            self.collapsed.fetch_add(1, Ordering::Relaxed);
            log::debug!("Joined in-flight request for key {}", &key[..8.min(key.len())]);
            return existing.future.clone();
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.in_flight);
        let owned_key = key.to_string();
        let inner = factory();

        let future = async move {
            let result = inner.await;
            // Deregister on settlement, unless a newer request already
            // replaced this entry via the timeout path
            let mut map = lock(&registry);
            if map.get(&owned_key).map(|e| e.generation) == Some(generation) {
                map.remove(&owned_key);
            }
            result
        }
        .boxed()
        .shared();

        map.insert(
            key.to_string(),
            InFlight {
                generation,
                started: Instant::now(),
                future: future.clone(),
            },
        );
        self.launched.fetch_add(1, Ordering::Relaxed);
        future
    }

    /// Number of requests currently registered as in flight.
    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// How many underlying requests were actually launched.
    pub fn launched(&self) -> u64 {
        self.launched.load(Ordering::Relaxed)
    }

    /// How many callers were collapsed onto an existing request.
    pub fn collapsed(&self) -> u64 {
        self.collapsed.load(Ordering::Relaxed)
    }
}

fn lock<'a>(
    map: &'a Arc<Mutex<HashMap<String, InFlight>>>,
) -> MutexGuard<'a, HashMap<String, InFlight>> {
    map.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn dedup() -> Arc<Deduplicator> {
        Arc::new(Deduplicator::new(Duration::from_secs(30)))
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_call() {
        let dedup = dedup();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let dedup = dedup.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                dedup
                    .run("key-1", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(json!({"n": 7}))
                    })
                    .await
            }));
        }

        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result, json!({"n": 7}));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dedup.launched(), 1);
        assert_eq!(dedup.collapsed(), 4);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_collapse() {
        let dedup = dedup();
        let calls = Arc::new(AtomicUsize::new(0));

        let c1 = calls.clone();
        let c2 = calls.clone();
        let (a, b) = tokio::join!(
            dedup.run("key-a", move || async move {
                c1.fetch_add(1, Ordering::SeqCst);
                Ok(json!("a"))
            }),
            dedup.run("key-b", move || async move {
                c2.fetch_add(1, Ordering::SeqCst);
                Ok(json!("b"))
            }),
        );

        assert_eq!(a.unwrap(), json!("a"));
        assert_eq!(b.unwrap(), json!("b"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_error_is_shared_by_all_callers() {
        let dedup = dedup();

        let d = dedup.clone();
        let joined = tokio::spawn(async move {
            d.run("key-1", || async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(ApiError::ServerError("boom".to_string()))
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(5)).await;
        let second_launched = Arc::new(AtomicUsize::new(0));
        let flag = second_launched.clone();
        let second = dedup
            .run("key-1", move || async move {
                flag.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Network("must not run".to_string()))
            })
            .await;

        let first = joined.await.unwrap();
        assert!(matches!(first, Err(ApiError::ServerError(_))));
        assert!(matches!(second, Err(ApiError::ServerError(_))));
        // The joined caller never launched its own factory
        assert_eq!(second_launched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_key_is_deregistered_after_settlement() {
        let dedup = dedup();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            dedup
                .run("key-1", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(1))
                })
                .await
                .unwrap();
        }

        // Sequential calls each launch: the first settled and deregistered
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(dedup.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_timed_out_request_is_replaced() {
        let dedup = Arc::new(Deduplicator::new(Duration::from_millis(10)));

        // A request that never settles
        let d = dedup.clone();
        let hung = tokio::spawn(async move {
            d.run("key-1", || futures::future::pending::<ApiResult<Value>>())
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;

        // Past the safety timeout a fresh request launches
        let result = dedup.run("key-1", || async { Ok(json!("recovered")) }).await;
        assert_eq!(result.unwrap(), json!("recovered"));
        assert_eq!(dedup.launched(), 2);

        hung.abort();
    }
}
