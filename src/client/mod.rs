//! GameMart API client and acceleration pipeline

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiResult;

pub mod accel;
pub mod batch;
pub mod dedup;
pub mod http;
pub mod market;
#[cfg(test)]
pub mod mock;
pub mod models;
pub mod pagination;
pub mod parallel;

pub use accel::AcceleratedTransport;
pub use batch::BatchCoordinator;
pub use dedup::Deduplicator;
pub use http::HttpTransport;
pub use market::MarketClient;
#[cfg(test)]
#[allow(unused_imports)]
pub use mock::MockTransport;
#[allow(unused_imports)]
pub use pagination::{MAX_PAGE_SIZE, PageParams, PagedResponse, SortOrder};
#[allow(unused_imports)]
pub use parallel::fetch_remaining_pages;

/// The network boundary the acceleration layer sits on.
///
/// Everything above this trait works with opaque JSON payloads; typed
/// deserialization happens in [`MarketClient`]. Implementations must be
/// cheap to share behind an `Arc`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a read against a logical endpoint.
    async fn call(&self, endpoint: &str, params: &Value) -> ApiResult<Value>;

    /// Issue a mutation against a logical endpoint.
    async fn submit(&self, endpoint: &str, body: &Value) -> ApiResult<Value>;

    /// Issue one combined call carrying several reads.
    async fn call_batch(&self, requests: &[BatchItem]) -> ApiResult<BatchResponse>;
}

/// One read folded into a combined batch call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    /// Correlation id; the response is demultiplexed strictly by this
    pub id: String,

    /// Logical endpoint name
    pub endpoint: String,

    /// Endpoint parameters
    pub params: Value,
}

/// Wire shape of the combined batch response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResponse {
    /// Whether the batch as a whole was accepted
    #[serde(default)]
    pub success: bool,

    /// Per-request payloads, keyed by request id
    #[serde(default)]
    pub results: HashMap<String, Value>,

    /// Per-request failures, keyed by request id
    #[serde(default)]
    pub errors: HashMap<String, String>,
}
