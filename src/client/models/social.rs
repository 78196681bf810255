//! Community feed resources

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post on the storefront community feed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    /// Post ID
    pub id: String,

    /// Authoring user ID
    pub author_id: String,

    /// Post body
    pub content: String,

    /// Optional attached image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// When the post was published
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for publishing a feed post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedPostRequest {
    /// Authoring user ID
    pub author_id: String,

    /// Post body
    pub content: String,

    /// Optional attached image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_post_deserializes() {
        let json = r#"{"id": "post-1", "authorId": "user-2", "content": "sold!"}"#;
        let post: FeedPost = serde_json::from_str(json).unwrap();
        assert_eq!(post.author_id, "user-2");
        assert!(post.image_url.is_none());
    }
}
