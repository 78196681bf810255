//! Admin dashboard aggregates

use serde::{Deserialize, Serialize};

/// Aggregate figures shown on the admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// All-time order count
    #[serde(default)]
    pub total_orders: u64,

    /// Orders awaiting payment
    #[serde(default)]
    pub pending_orders: u64,

    /// All-time revenue in minor currency units
    #[serde(default)]
    pub total_revenue: i64,

    /// Listings currently available
    #[serde(default)]
    pub active_products: u64,

    /// Users registered in the last 24 hours
    #[serde(default)]
    pub new_users_today: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_zero() {
        let stats: DashboardStats = serde_json::from_str(r#"{"totalOrders": 42}"#).unwrap();
        assert_eq!(stats.total_orders, 42);
        assert_eq!(stats.total_revenue, 0);
    }
}
