//! Order resources

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A purchase order for a listed account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order ID
    pub id: String,

    /// Product being purchased
    pub product_id: String,

    /// Buyer's user ID
    pub buyer_id: String,

    /// Current order state
    pub status: OrderStatus,

    /// Total in minor currency units
    pub total: i64,

    /// Payment channel chosen at checkout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,

    /// When the order was placed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Order lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting payment
    Pending,
    /// Payment confirmed by the gateway
    Paid,
    /// Account credentials handed over
    Delivered,
    /// Cancelled or expired before payment
    Cancelled,
}

impl OrderStatus {
    /// Wire representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Payload for creating an order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Product to purchase
    pub product_id: String,

    /// Buyer's user ID
    pub buyer_id: String,

    /// Payment channel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_roundtrip() {
        let json = serde_json::to_string(&OrderStatus::Paid).unwrap();
        assert_eq!(json, "\"paid\"");

        let status: OrderStatus = serde_json::from_str("\"delivered\"").unwrap();
        assert_eq!(status, OrderStatus::Delivered);
    }

    #[test]
    fn test_order_deserializes() {
        let json = r#"{
            "id": "ord-9",
            "productId": "prod-1",
            "buyerId": "user-3",
            "status": "pending",
            "total": 250000
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.status.as_str(), "pending");
    }
}
