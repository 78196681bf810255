//! In-memory cache for API responses
//!
//! Provides the TTL response store, request-key fingerprinting, and the
//! resource-label scheme used for mutation-time invalidation. The store is
//! process-lifetime only; nothing here persists across runs.
//!
//! TTL policy lives in [`crate::config::CacheConfig`] as a pattern table
//! rather than constants, so deployments can tune per-endpoint freshness
//! without code changes.

pub mod key;
pub mod store;

// Re-export main types
pub use key::{cache_key, resource_labels};
pub use store::{CacheStats, Lookup, ResponseCache};
