//! Martlet - client-side acceleration layer for the GameMart marketplace API
//!
//! Sits between calling code and the network and cuts redundant backend
//! calls through a cooperating set of facilities:
//!
//! - a TTL response cache with per-endpoint policy and LRU eviction
//! - single-flight deduplication of concurrent identical requests
//! - stale-while-revalidate serving with off-path background refresh
//! - window batching of cold reads into combined calls
//! - label-based invalidation on every mutation
//! - best-effort, navigation-driven cache prefetching
//!
//! The usual composition is a typed [`client::MarketClient`] over an
//! [`client::AcceleratedTransport`] wrapping an [`client::HttpTransport`]:
//!
//! ```ignore
//! let config = Config::load()?;
//! let http = Arc::new(HttpTransport::new(&config)?);
//! let accel = AcceleratedTransport::new(http, &config, true);
//! let client = MarketClient::new(Arc::new(accel));
//! let products = client.list_products(None, None).await?;
//! ```

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod prefetch;

pub use cache::{CacheStats, ResponseCache};
pub use client::{
    AcceleratedTransport, BatchCoordinator, Deduplicator, HttpTransport, MarketClient, Transport,
};
pub use config::Config;
pub use error::{ApiError, Error, Result};
pub use prefetch::{Prefetcher, TransitionStore};
