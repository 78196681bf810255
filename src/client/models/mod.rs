//! GameMart API data models
//!
//! Domain types returned by the marketplace API, organized by resource
//! area for easy discovery.

mod catalog;
mod order;
mod social;
mod stats;

// Re-export all models for convenient access
pub use catalog::{Banner, GameTitle, Product, ProductFilter};
pub use order::{CreateOrderRequest, Order, OrderStatus};
pub use social::{CreateFeedPostRequest, FeedPost};
pub use stats::DashboardStats;
