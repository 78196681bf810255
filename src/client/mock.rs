//! Mock transport for testing
//!
//! Scriptable [`Transport`] implementation with call counts, so tests can
//! assert exactly how many network round-trips the acceleration pipeline
//! let through.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{BatchItem, BatchResponse, Transport};
use crate::error::{ApiError, ApiResult};

/// Scriptable mock transport.
///
/// # Example
/// ```ignore
/// let mock = MockTransport::returning(json!({"total": 42}));
/// let value = mock.call("list_products", &json!({})).await?;
/// assert_eq!(mock.call_count(), 1);
/// ```
pub struct MockTransport {
    response: Mutex<Value>,
    error: Mutex<Option<String>>,
    latency: Mutex<Duration>,
    calls: AtomicUsize,
    submits: AtomicUsize,
    batch_calls: AtomicUsize,
    captured: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    /// Mock that answers every read with the given payload.
    pub fn returning(response: Value) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(response),
            error: Mutex::new(None),
            latency: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            captured: Mutex::new(Vec::new()),
        })
    }

    /// Mock that fails every read with a server error.
    pub fn failing(message: &str) -> Arc<Self> {
        let mock = Self::returning(Value::Null);
        mock.fail_with(message);
        mock
    }

    /// Add simulated network latency to every operation.
    pub fn with_latency(self: Arc<Self>, latency: Duration) -> Arc<Self> {
        *self.latency.lock().unwrap() = latency;
        self
    }

    /// Change the scripted response.
    pub fn set_response(&self, response: Value) {
        *self.response.lock().unwrap() = response;
        *self.error.lock().unwrap() = None;
    }

    /// Start failing every operation.
    pub fn fail_with(&self, message: &str) {
        *self.error.lock().unwrap() = Some(message.to_string());
    }

    /// Number of individual reads that reached the network.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of mutations that reached the network.
    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    /// Number of combined batch calls that reached the network.
    pub fn batch_call_count(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Endpoints and params seen, in arrival order.
    pub fn captured(&self) -> Vec<(String, Value)> {
        self.captured.lock().unwrap().clone()
    }

    async fn simulate(&self) -> ApiResult<Value> {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = self.error.lock().unwrap().clone() {
            return Err(ApiError::ServerError(message));
        }
        Ok(self.response.lock().unwrap().clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, endpoint: &str, params: &Value) -> ApiResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.captured
            .lock()
            .unwrap()
            .push((endpoint.to_string(), params.clone()));
        self.simulate().await
    }

    async fn submit(&self, endpoint: &str, body: &Value) -> ApiResult<Value> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.captured
            .lock()
            .unwrap()
            .push((endpoint.to_string(), body.clone()));
        self.simulate().await
    }

    async fn call_batch(&self, requests: &[BatchItem]) -> ApiResult<BatchResponse> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let shared = self.simulate().await?;

        let mut response = BatchResponse {
            success: true,
            ..BatchResponse::default()
        };
        for request in requests {
            response.results.insert(request.id.clone(), shared.clone());
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_counts_and_captures() {
        let mock = MockTransport::returning(json!({"ok": true}));

        let value = mock.call("list_products", &json!({"page": 1})).await.unwrap();
        assert_eq!(value, json!({"ok": true}));
        assert_eq!(mock.call_count(), 1);

        let captured = mock.captured();
        assert_eq!(captured[0].0, "list_products");
        assert_eq!(captured[0].1, json!({"page": 1}));
    }

    #[tokio::test]
    async fn test_mock_failure_mode() {
        let mock = MockTransport::failing("down");
        let result = mock.call("list_products", &json!({})).await;
        assert!(matches!(result, Err(ApiError::ServerError(_))));
    }
}
