//! Window-batched request dispatch
//!
//! Requests arriving within a short window are grouped by endpoint.
//! Allow-listed groups go out as one combined `/api/batch` call and are
//! demultiplexed strictly by request id; everything else dispatches
//! individually under a concurrency cap. A failed combined call falls back
//! to individual dispatch so a batch-level failure never loses results the
//! underlying endpoints could still serve.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::{Semaphore, oneshot};

use super::{BatchItem, Transport};
use crate::config::BatchConfig;
use crate::error::{ApiError, ApiResult};

struct Pending {
    id: String,
    endpoint: String,
    params: Value,
    reply: oneshot::Sender<ApiResult<Value>>,
    #[allow(dead_code)]
    enqueued_at: Instant,
}

struct QueueState {
    pending: Vec<Pending>,
    window_open: bool,
}

struct BatchInner<T> {
    transport: Arc<T>,
    state: Mutex<QueueState>,
    window: Duration,
    batchable: HashSet<String>,
    semaphore: Semaphore,
    next_id: AtomicU64,
    batches_sent: AtomicU64,
    fallbacks: AtomicU64,
}

/// Coordinator that folds reads issued within one window into combined
/// network calls.
///
/// Cheap to clone; clones share the same queue.
pub struct BatchCoordinator<T> {
    inner: Arc<BatchInner<T>>,
}

impl<T> Clone for BatchCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport + 'static> BatchCoordinator<T> {
    /// Create a coordinator over a transport.
    pub fn new(transport: Arc<T>, config: &BatchConfig) -> Self {
        Self {
            inner: Arc::new(BatchInner {
                transport,
                state: Mutex::new(QueueState {
                    pending: Vec::new(),
                    window_open: false,
                }),
                window: config.window(),
                batchable: config.batchable_endpoints.iter().cloned().collect(),
                semaphore: Semaphore::new(config.max_concurrency),
                next_id: AtomicU64::new(0),
                batches_sent: AtomicU64::new(0),
                fallbacks: AtomicU64::new(0),
            }),
        }
    }

    /// Enqueue a read and wait for its result.
    ///
    /// The first enqueue after a drain opens the window and arms its timer;
    /// the timer drains everything queued by then.
    pub async fn request(&self, endpoint: &str, params: Value) -> ApiResult<Value> {
        let (tx, rx) = oneshot::channel();
        let id = format!("req-{}", self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        let arm_timer = {
            let mut state = lock(&self.inner.state);
            state.pending.push(Pending {
                id,
                endpoint: endpoint.to_string(),
                params,
                reply: tx,
                enqueued_at: Instant::now(),
            });
            let arm = !state.window_open;
            state.window_open = true;
            arm
        };

        if arm_timer {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                tokio::time::sleep(inner.window).await;
                BatchInner::drain_and_dispatch(inner).await;
            });
        }

        // A dropped sender means the coordinator went away mid-request;
        // callers treat that as a cancellation, not a failure
        rx.await.unwrap_or(Err(ApiError::Aborted))
    }

    /// Force immediate processing of whatever is queued.
    pub async fn flush(&self) {
        BatchInner::drain_and_dispatch(Arc::clone(&self.inner)).await;
    }

    /// Number of combined batch calls issued.
    pub fn batches_sent(&self) -> u64 {
        self.inner.batches_sent.load(Ordering::Relaxed)
    }

    /// Number of combined calls that degraded to individual dispatch.
    pub fn fallbacks(&self) -> u64 {
        self.inner.fallbacks.load(Ordering::Relaxed)
    }
}

impl<T: Transport + 'static> BatchInner<T> {
    async fn drain_and_dispatch(inner: Arc<Self>) {
        let batch = {
            let mut state = lock(&inner.state);
            state.window_open = false;
            std::mem::take(&mut state.pending)
        };

        if batch.is_empty() {
            return;
        }

        let mut groups: HashMap<String, Vec<Pending>> = HashMap::new();
        for pending in batch {
            groups.entry(pending.endpoint.clone()).or_default().push(pending);
        }

        let mut tasks = Vec::new();
        for (endpoint, group) in groups {
            if inner.batchable.contains(&endpoint) && group.len() > 1 {
                tasks.push(tokio::spawn(Self::dispatch_combined(
                    Arc::clone(&inner),
                    group,
                )));
            } else {
                for pending in group {
                    tasks.push(tokio::spawn(Self::dispatch_single(
                        Arc::clone(&inner),
                        pending,
                    )));
                }
            }
        }

        for task in tasks {
            let _ = task.await;
        }
    }

    /// One combined call for a same-endpoint group, demultiplexed by id.
    async fn dispatch_combined(inner: Arc<Self>, group: Vec<Pending>) {
        let items: Vec<BatchItem> = group
            .iter()
            .map(|p| BatchItem {
                id: p.id.clone(),
                endpoint: p.endpoint.clone(),
                params: p.params.clone(),
            })
            .collect();

        match inner.transport.call_batch(&items).await {
            Ok(response) => {
                inner.batches_sent.fetch_add(1, Ordering::Relaxed);
                for pending in group {
                    let result = if let Some(value) = response.results.get(&pending.id) {
                        Ok(value.clone())
                    } else if let Some(message) = response.errors.get(&pending.id) {
                        Err(ApiError::ServerError(message.clone()))
                    } else {
                        Err(ApiError::InvalidResponse(format!(
                            "Batch response missing id {}",
                            pending.id
                        )))
                    };
                    let _ = pending.reply.send(result);
                }
            }
            Err(err) => {
                // The combined call failed as a whole; the endpoints may
                // still be individually reachable
                log::warn!(
                    "Batch call for {} requests failed ({}), retrying individually",
                    group.len(),
                    err
                );
                inner.fallbacks.fetch_add(1, Ordering::Relaxed);
                let mut retries = Vec::new();
                for pending in group {
                    retries.push(Self::dispatch_single(Arc::clone(&inner), pending));
                }
                futures::future::join_all(retries).await;
            }
        }
    }

    async fn dispatch_single(inner: Arc<Self>, pending: Pending) {
        // Cap on individually dispatched requests; the semaphore is never
        // closed, so acquire cannot fail
        let _permit = inner.semaphore.acquire().await.ok();
        let result = inner
            .transport
            .call(&pending.endpoint, &pending.params)
            .await;
        let _ = pending.reply.send(result);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
