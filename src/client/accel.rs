//! Accelerated transport wrapper
//!
//! Wraps any [`Transport`] with the full read pipeline: fingerprint the
//! request, serve fresh cache hits, serve stale hits while refreshing off
//! the caller's path, collapse concurrent identical fetches, and fold cold
//! fetches into window batches. Mutations pass straight through and then
//! invalidate the affected resource labels.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{BatchCoordinator, BatchItem, BatchResponse, Deduplicator, Transport};
use crate::cache::{CacheStats, Lookup, ResponseCache, cache_key, resource_labels};
use crate::config::{CacheConfig, Config};
use crate::error::ApiResult;

struct AccelInner<T> {
    transport: Arc<T>,
    cache: ResponseCache,
    dedup: Deduplicator,
    batcher: BatchCoordinator<T>,
    policy: CacheConfig,
    enabled: bool,
}

/// A [`Transport`] that answers from cache whenever it honestly can.
///
/// One instance per process, created at startup and shared by reference;
/// clones share all state.
pub struct AcceleratedTransport<T> {
    inner: Arc<AccelInner<T>>,
}

impl<T> Clone for AcceleratedTransport<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Combined counters from every stage of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct AccelStats {
    pub cache: CacheStats,
    pub fetches_launched: u64,
    pub fetches_collapsed: u64,
    pub batches_sent: u64,
    pub batch_fallbacks: u64,
}

impl<T: Transport + 'static> AcceleratedTransport<T> {
    /// Create the pipeline over a transport.
    ///
    /// With `enabled` false (`--no-cache`) every call goes straight to the
    /// wrapped transport.
    pub fn new(transport: Arc<T>, config: &Config, enabled: bool) -> Self {
        Self {
            inner: Arc::new(AccelInner {
                cache: ResponseCache::from_config(&config.cache),
                dedup: Deduplicator::new(config.batch.dedup_timeout()),
                batcher: BatchCoordinator::new(Arc::clone(&transport), &config.batch),
                transport,
                policy: config.cache.clone(),
                enabled,
            }),
        }
    }

    /// Direct access to the response cache (stats, manual invalidation).
    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    /// Drain any open batch window immediately; used during teardown.
    pub async fn flush(&self) {
        self.inner.batcher.flush().await;
    }

    /// Invalidate every cached read whose endpoint contains the pattern.
    pub fn invalidate_matching(&self, pattern: &str) -> usize {
        self.inner.cache.invalidate_matching(pattern)
    }

    /// Snapshot of pipeline counters.
    pub fn stats(&self) -> AccelStats {
        AccelStats {
            cache: self.inner.cache.stats(),
            fetches_launched: self.inner.dedup.launched(),
            fetches_collapsed: self.inner.dedup.collapsed(),
            batches_sent: self.inner.batcher.batches_sent(),
            batch_fallbacks: self.inner.batcher.fallbacks(),
        }
    }

    /// Fetch through dedup + batcher and populate the cache from the result.
    ///
    /// `store_failure` is off on the background-refresh path: a failed
    /// refresh must leave the stale entry serveable rather than replace it
    /// with a remembered error.
    async fn fetch_and_store(
        &self,
        key: &str,
        endpoint: &str,
        params: &Value,
        store_failure: bool,
    ) -> ApiResult<Value> {
        let batcher = self.inner.batcher.clone();
        let owned_endpoint = endpoint.to_string();
        let owned_params = params.clone();

        let result = self
            .inner
            .dedup
            .run(key, move || async move {
                batcher.request(&owned_endpoint, owned_params).await
            })
            .await;

        match result {
            Ok(value) => {
                self.inner.cache.set(
                    key,
                    endpoint,
                    value.clone(),
                    self.inner.policy.ttl_for(endpoint),
                    resource_labels(endpoint),
                );
                Ok(value)
            }
            Err(err) => {
                // Remember real failures briefly to dampen retry storms;
                // aborts are not failures and must not poison the key
                if store_failure && !err.is_abort() {
                    self.inner.cache.set_error(
                        key,
                        endpoint,
                        err.to_string(),
                        self.inner.policy.error_ttl(),
                        resource_labels(endpoint),
                    );
                }
                Err(err)
            }
        }
    }

    /// Kick off a non-blocking refresh for a stale entry.
    fn spawn_refresh(&self, key: String, endpoint: String, params: Value) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(err) = this
                .fetch_and_store(&key, &endpoint, &params, false)
                .await
            {
                // Swallowed: the stale value stays serveable until hard expiry
                log::warn!("Background refresh of {} failed: {}", endpoint, err);
            }
        });
    }
}

/// Flatten a JSON params object into key pairs for fingerprinting.
fn params_to_pairs(params: &Value) -> Vec<(String, String)> {
    let Some(map) = params.as_object() else {
        return Vec::new();
    };

    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let rendered = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), rendered)
        })
        .collect()
}

/// Fingerprint a read request.
pub fn request_key(endpoint: &str, params: &Value) -> String {
    let pairs = params_to_pairs(params);
    let refs: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    cache_key(endpoint, &refs)
}

#[async_trait]
impl<T: Transport + 'static> Transport for AcceleratedTransport<T> {
    async fn call(&self, endpoint: &str, params: &Value) -> ApiResult<Value> {
        if !self.inner.enabled {
            return self.inner.transport.call(endpoint, params).await;
        }

        let key = request_key(endpoint, params);

        match self.inner.cache.lookup(&key) {
            Lookup::Fresh(value) => {
                log::debug!("Cache hit: {}", endpoint);
                Ok(value)
            }
            Lookup::Stale(value) => {
                log::debug!("Serving stale {} while revalidating", endpoint);
                self.spawn_refresh(key, endpoint.to_string(), params.clone());
                Ok(value)
            }
            Lookup::Failed(message) => {
                log::debug!("Remembered failure for {}: {}", endpoint, message);
                Err(crate::error::ApiError::ServerError(message))
            }
            Lookup::Miss => self.fetch_and_store(&key, endpoint, params, true).await,
        }
    }

    async fn submit(&self, endpoint: &str, body: &Value) -> ApiResult<Value> {
        let result = self.inner.transport.submit(endpoint, body).await?;

        if self.inner.enabled {
            // Invalidate only after the mutation commits, so reads cannot
            // observe now-incorrect cached data
            for label in resource_labels(endpoint) {
                self.inner.cache.invalidate_label(&label);
            }
            // Any mutation can move the dashboard aggregates
            self.inner.cache.invalidate_label("dashboard");
        }

        Ok(result)
    }

    async fn call_batch(&self, requests: &[BatchItem]) -> ApiResult<BatchResponse> {
        self.inner.transport.call_batch(requests).await
    }
}
