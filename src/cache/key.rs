//! Cache key generation using SHA-256 hashes

use sha2::{Digest, Sha256};

/// Generate a deterministic cache key from an endpoint and its parameters.
///
/// The key is a SHA-256 hash of the endpoint and sorted parameters, so
/// logically identical requests collide to the same entry regardless of
/// parameter insertion order.
pub fn cache_key(endpoint: &str, params: &[(&str, &str)]) -> String {
    let mut hasher = Sha256::new();

    hasher.update(endpoint.as_bytes());
    hasher.update(b"|");

    // Sort params for a deterministic key
    let mut sorted_params: Vec<_> = params.iter().collect();
    sorted_params.sort_by_key(|(k, _)| *k);

    for (k, v) in sorted_params {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"&");
    }

    format!("{:x}", hasher.finalize())
}

/// Derive the resource labels an endpoint's entries are tagged with.
///
/// Labels drive mutation-time invalidation: `create_order` invalidates
/// everything labelled `orders`. The label is the resource noun of the
/// endpoint name (`list_products` and `get_product` both yield `products`);
/// aggregate endpoints also pick up the `dashboard` label, since any
/// mutation can change the numbers they report.
pub fn resource_labels(endpoint: &str) -> Vec<String> {
    let noun = endpoint
        .strip_prefix("list_")
        .or_else(|| endpoint.strip_prefix("get_"))
        .or_else(|| endpoint.strip_prefix("create_"))
        .or_else(|| endpoint.strip_prefix("update_"))
        .or_else(|| endpoint.strip_prefix("delete_"))
        .unwrap_or(endpoint);

    // Singular detail endpoints share the plural collection label
    let label = match noun {
        "product" => "products",
        "order" | "order_status" => "orders",
        "feed_post" => "feed",
        "banner" => "banners",
        "game_title" => "game_titles",
        "user" => "users",
        other => other,
    };

    if endpoint.contains("dashboard") || endpoint.contains("stats") {
        vec!["dashboard".to_string()]
    } else {
        vec![label.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_deterministic() {
        let key1 = cache_key("list_products", &[("limit", "10"), ("page", "1")]);
        let key2 = cache_key("list_products", &[("page", "1"), ("limit", "10")]);

        // Same inputs in different order should produce same key
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_cache_key_different_endpoints() {
        let key1 = cache_key("list_products", &[]);
        let key2 = cache_key("list_orders", &[]);

        assert_ne!(key1, key2);
    }

    #[test]
    fn test_cache_key_different_params() {
        let key1 = cache_key("list_products", &[("page", "1")]);
        let key2 = cache_key("list_products", &[("page", "2")]);

        assert_ne!(key1, key2);
    }

    #[test]
    fn test_cache_key_empty_params() {
        let key1 = cache_key("dashboard_stats", &[]);
        let key2 = cache_key("dashboard_stats", &[]);

        assert_eq!(key1, key2);
    }

    #[test]
    fn test_labels_collapse_detail_and_list() {
        assert_eq!(resource_labels("list_products"), vec!["products"]);
        assert_eq!(resource_labels("get_product"), vec!["products"]);
        assert_eq!(resource_labels("create_order"), vec!["orders"]);
        assert_eq!(resource_labels("update_order_status"), vec!["orders"]);
    }

    #[test]
    fn test_labels_for_aggregates() {
        assert_eq!(resource_labels("dashboard_stats"), vec!["dashboard"]);
    }

    #[test]
    fn test_labels_unknown_endpoint_is_its_own_label() {
        assert_eq!(resource_labels("list_promos"), vec!["promos"]);
    }
}
