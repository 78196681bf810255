//! Catalog resources: products, banners, game titles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A game-account listing in the storefront
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product ID
    pub id: String,

    /// Listing title
    pub name: String,

    /// Game title this account belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_title_id: Option<String>,

    /// Price in minor currency units
    pub price: i64,

    /// Listing status (available, reserved, sold)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Account level, where the game has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,

    /// Seller-provided description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// When the listing was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Filters for product listings
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Restrict to a game title
    pub game_title_id: Option<String>,

    /// Restrict to a listing status
    pub status: Option<String>,

    /// Free-text search over listing titles
    pub search: Option<String>,
}

impl ProductFilter {
    /// Convert to query parameters.
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref id) = self.game_title_id {
            params.push(("game_title_id", id.clone()));
        }
        if let Some(ref status) = self.status {
            params.push(("status", status.clone()));
        }
        if let Some(ref search) = self.search {
            params.push(("search", search.clone()));
        }
        params
    }
}

/// A promotional banner shown on the storefront
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    /// Banner ID
    pub id: String,

    /// Image location
    pub image_url: String,

    /// Destination when clicked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,

    /// Whether the banner is currently shown
    #[serde(default)]
    pub active: bool,
}

/// A supported game title
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTitle {
    /// Game title ID
    pub id: String,

    /// Display name
    pub name: String,

    /// URL slug
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    /// Whether listings can currently be created for it
    #[serde(default)]
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_deserializes_camel_case() {
        let json = r#"{
            "id": "prod-1",
            "name": "ML Epic Account",
            "gameTitleId": "ml",
            "price": 250000,
            "status": "available"
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, "prod-1");
        assert_eq!(product.game_title_id.as_deref(), Some("ml"));
        assert_eq!(product.price, 250000);
        assert!(product.level.is_none());
    }

    #[test]
    fn test_product_filter_query_params() {
        let filter = ProductFilter {
            game_title_id: Some("ml".to_string()),
            status: Some("available".to_string()),
            search: None,
        };

        let params = filter.to_query_params();
        assert_eq!(params.len(), 2);
        assert!(params.contains(&("game_title_id", "ml".to_string())));
    }

    #[test]
    fn test_banner_active_defaults_false() {
        let json = r#"{"id": "b1", "imageUrl": "https://cdn/img.png"}"#;
        let banner: Banner = serde_json::from_str(json).unwrap();
        assert!(!banner.active);
    }
}
