//! Typed client for the GameMart marketplace API
//!
//! Thin layer over any [`Transport`]: builds params, names endpoints, and
//! deserializes payloads into domain models. Run it over an
//! [`AcceleratedTransport`](super::AcceleratedTransport) to get the full
//! caching pipeline underneath typed calls.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use super::models::{
    Banner, CreateFeedPostRequest, CreateOrderRequest, DashboardStats, FeedPost, GameTitle, Order,
    OrderStatus, Product, ProductFilter,
};
use super::pagination::{MAX_PAGE_SIZE, PageParams, PagedResponse};
use super::parallel::fetch_remaining_pages;
use super::Transport;
use crate::error::{ApiError, ApiResult, Result};

/// Typed marketplace API client.
pub struct MarketClient<T> {
    transport: Arc<T>,
}

impl<T> Clone for MarketClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

/// Merge query-param pair lists into one JSON params object.
fn params_object(parts: &[Vec<(&'static str, String)>]) -> Value {
    let mut map = Map::new();
    for part in parts {
        for (key, value) in part {
            map.insert((*key).to_string(), Value::String(value.clone()));
        }
    }
    Value::Object(map)
}

fn decode<D: DeserializeOwned>(endpoint: &str, value: Value) -> ApiResult<D> {
    serde_json::from_value(value).map_err(|e| {
        ApiError::InvalidResponse(format!("Unexpected {} payload: {}", endpoint, e))
    })
}

impl<T: Transport + 'static> MarketClient<T> {
    /// Create a client over a transport.
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    async fn fetch<D: DeserializeOwned>(&self, endpoint: &str, params: Value) -> Result<D> {
        let value = self.transport.call(endpoint, &params).await?;
        Ok(decode(endpoint, value)?)
    }

    /// List one page of product listings.
    pub async fn list_products(
        &self,
        filter: Option<&ProductFilter>,
        page: Option<&PageParams>,
    ) -> Result<PagedResponse<Product>> {
        let params = params_object(&[
            filter.map(|f| f.to_query_params()).unwrap_or_default(),
            page.map(|p| p.to_query_params()).unwrap_or_default(),
        ]);
        self.fetch("list_products", params).await
    }

    /// Fetch every page of product listings, remaining pages in parallel.
    pub async fn list_all_products(
        &self,
        filter: Option<&ProductFilter>,
        max_concurrent: usize,
    ) -> Result<Vec<Product>> {
        let first_params = PageParams::new().page(1).page_size(MAX_PAGE_SIZE);
        let first = self.list_products(filter, Some(&first_params)).await?;

        let has_more_pages = first.has_more_pages();
        let remaining_pages = first.remaining_pages();
        let mut all_products = first.items;
        if has_more_pages {
            let transport = Arc::clone(&self.transport);
            let filter = filter.cloned().unwrap_or_default();
            let remaining = fetch_remaining_pages(
                remaining_pages,
                move |page| {
                    let transport = transport.clone();
                    let filter = filter.clone();
                    async move {
                        let params = params_object(&[
                            filter.to_query_params(),
                            PageParams::new()
                                .page(page)
                                .page_size(MAX_PAGE_SIZE)
                                .to_query_params(),
                        ]);
                        let value = transport.call("list_products", &params).await?;
                        let listing: PagedResponse<Product> = decode("list_products", value)?;
                        Ok(listing.items)
                    }
                },
                max_concurrent,
            )
            .await?;
            all_products.extend(remaining);
        }

        Ok(all_products)
    }

    /// Fetch a single product listing.
    pub async fn get_product(&self, product_id: &str) -> Result<Product> {
        self.fetch("get_product", json!({"id": product_id})).await
    }

    /// List one page of orders.
    pub async fn list_orders(&self, page: Option<&PageParams>) -> Result<PagedResponse<Order>> {
        let params = params_object(&[page.map(|p| p.to_query_params()).unwrap_or_default()]);
        self.fetch("list_orders", params).await
    }

    /// Fetch a single order.
    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        self.fetch("get_order", json!({"id": order_id})).await
    }

    /// List active storefront banners.
    pub async fn list_banners(&self) -> Result<Vec<Banner>> {
        self.fetch("list_banners", json!({})).await
    }

    /// List supported game titles.
    pub async fn list_game_titles(&self) -> Result<Vec<GameTitle>> {
        self.fetch("list_game_titles", json!({})).await
    }

    /// List one page of the community feed.
    pub async fn list_feed(&self, page: Option<&PageParams>) -> Result<PagedResponse<FeedPost>> {
        let params = params_object(&[page.map(|p| p.to_query_params()).unwrap_or_default()]);
        self.fetch("list_feed", params).await
    }

    /// Fetch the admin dashboard aggregates.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        self.fetch("dashboard_stats", json!({})).await
    }

    /// Place an order.
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order> {
        let body = serde_json::to_value(request)?;
        let value = self.transport.submit("create_order", &body).await?;
        Ok(decode("create_order", value)?)
    }

    /// Move an order to a new state.
    pub async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> Result<Order> {
        let body = json!({"orderId": order_id, "status": status.as_str()});
        let value = self.transport.submit("update_order_status", &body).await?;
        Ok(decode("update_order_status", value)?)
    }

    /// Publish a feed post.
    pub async fn create_feed_post(&self, request: &CreateFeedPostRequest) -> Result<FeedPost> {
        let body = serde_json::to_value(request)?;
        let value = self.transport.submit("create_feed_post", &body).await?;
        Ok(decode("create_feed_post", value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockTransport;

    fn product_page(page: usize) -> Value {
        json!({
            "items": [
                {"id": format!("p{}-a", page), "name": "ML Epic", "price": 250000},
                {"id": format!("p{}-b", page), "name": "Genshin AR55", "price": 900000},
            ],
            "total": 4,
            "page": page,
            "page_size": 2,
        })
    }

    #[tokio::test]
    async fn test_list_products_deserializes_page() {
        let mock = MockTransport::returning(product_page(1));
        let client = MarketClient::new(mock.clone());

        let page = client.list_products(None, None).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 4);
        assert_eq!(page.items[0].price, 250000);
    }

    #[tokio::test]
    async fn test_list_products_sends_filter_params() {
        let mock = MockTransport::returning(product_page(1));
        let client = MarketClient::new(mock.clone());

        let filter = ProductFilter {
            game_title_id: Some("ml".to_string()),
            ..ProductFilter::default()
        };
        client
            .list_products(Some(&filter), Some(&PageParams::new().page(2)))
            .await
            .unwrap();

        let (endpoint, params) = mock.captured().remove(0);
        assert_eq!(endpoint, "list_products");
        assert_eq!(params["game_title_id"], json!("ml"));
        assert_eq!(params["page"], json!("2"));
    }

    #[tokio::test]
    async fn test_list_all_products_walks_remaining_pages() {
        let mock = MockTransport::returning(product_page(1));
        let client = MarketClient::new(mock.clone());

        let all = client.list_all_products(None, 4).await.unwrap();

        // total=4, page_size=2: one extra page beyond the first
        assert_eq!(all.len(), 4);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_create_order_submits_payload() {
        let mock = MockTransport::returning(json!({
            "id": "ord-1",
            "productId": "p1",
            "buyerId": "u1",
            "status": "pending",
            "total": 250000,
        }));
        let client = MarketClient::new(mock.clone());

        let order = client
            .create_order(&CreateOrderRequest {
                product_id: "p1".to_string(),
                buyer_id: "u1".to_string(),
                payment_method: Some("qris".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(order.id, "ord-1");
        assert_eq!(mock.submit_count(), 1);

        let (endpoint, body) = mock.captured().remove(0);
        assert_eq!(endpoint, "create_order");
        assert_eq!(body["productId"], json!("p1"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_invalid_response() {
        let mock = MockTransport::returning(json!({"unexpected": true}));
        let client = MarketClient::new(mock.clone());

        let result = client.get_product("p1").await;
        assert!(matches!(
            result,
            Err(crate::error::Error::Api(ApiError::InvalidResponse(_)))
        ));
    }
}
