//! HTTP transport for the GameMart API

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;

use super::{BatchItem, BatchResponse, Transport};
use crate::config::Config;
use crate::error::{ApiError, ApiResult, Result};

/// Transport that talks to the marketplace's serverless handlers.
///
/// Reads are `GET {base}/api/data?action={endpoint}&...`, mutations are
/// `POST {base}/api/data` with `{action, payload}`, and the combined call
/// is `POST {base}/api/batch`. A client-side courtesy rate limit keeps the
/// accelerator from hammering the backend even when the cache is cold.
pub struct HttpTransport {
    http: HttpClient,
    base_url: String,
    request_timeout: Duration,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl HttpTransport {
    /// Create a transport from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let request_timeout = config.request_timeout();
        let http = HttpClient::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let per_second = NonZeroU32::new(config.rate_limit_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout,
            rate_limiter,
        })
    }

    /// Flatten a JSON params object into query pairs.
    fn query_pairs(params: &Value) -> Vec<(String, String)> {
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

    /// Attach the configured timeout to reqwest's anonymous timeout error.
    fn map_send_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.request_timeout)
        } else {
            ApiError::from(err)
        }
    }

    /// Translate a response into the error taxonomy, or parse the body.
    async fn handle_response(&self, response: reqwest::Response) -> ApiResult<Value> {
        let status = response.status();
        match status {
            StatusCode::OK | StatusCode::CREATED => response
                .json::<Value>()
                .await
                .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e))),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden),
            StatusCode::NOT_FOUND => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Resource not found".to_string());
                Err(ApiError::NotFound(error_msg))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                Err(ApiError::RateLimit(Duration::from_secs(retry_after)))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Bad request".to_string());
                Err(ApiError::BadRequest(error_msg))
            }
            status if status.is_server_error() => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| format!("Server error: {}", status));
                Err(ApiError::ServerError(error_msg))
            }
            _ => Err(ApiError::InvalidResponse(format!(
                "Unexpected status code: {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, endpoint: &str, params: &Value) -> ApiResult<Value> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/api/data", self.base_url);
        let mut query = vec![("action".to_string(), endpoint.to_string())];
        query.extend(Self::query_pairs(params));

        log::debug!("GET {} action={}", url, endpoint);
        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        self.handle_response(response).await
    }

    async fn submit(&self, endpoint: &str, body: &Value) -> ApiResult<Value> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/api/data", self.base_url);
        let envelope = serde_json::json!({
            "action": endpoint,
            "payload": body,
        });

        log::debug!("POST {} action={}", url, endpoint);
        let response = self
            .http
            .post(&url)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        self.handle_response(response).await
    }

    async fn call_batch(&self, requests: &[BatchItem]) -> ApiResult<BatchResponse> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/api/batch", self.base_url);
        let envelope = serde_json::json!({ "requests": requests });

        log::debug!("POST {} ({} requests)", url, requests.len());
        let response = self
            .http
            .post(&url)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let value = self.handle_response(response).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("Malformed batch response: {}", e)))
    }
}
