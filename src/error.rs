//! Error types for the Martlet accelerator

use std::time::Duration;
use thiserror::Error;

/// Result type alias for Martlet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for transport-level operations.
///
/// Transport results are shared between deduplicated callers, so the error
/// side must be `Clone`.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// API-related errors.
///
/// `Clone` so that a single settled request can hand the same error to every
/// caller that was collapsed onto it by the deduplicator.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Authentication failed. Check the API key in your configuration.")]
    Unauthorized,

    #[error("Access denied. You don't have permission to access this resource.")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// The caller's wait was cancelled (teardown, superseded request).
    /// Never treated as a failure by the acceleration layer.
    #[error("Request aborted")]
    Aborted,
}

impl ApiError {
    /// True for cancellations, which callers discard silently rather than
    /// surface as failures.
    pub fn is_abort(&self) -> bool {
        matches!(self, ApiError::Aborted)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured timeout here; the
            // transport attaches the real value where it knows it.
            ApiError::Timeout(Duration::ZERO)
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to API".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Create one with `martlet config init`.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_unauthorized_message() {
        let err = ApiError::Unauthorized;
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_api_error_not_found() {
        let err = ApiError::NotFound("product prod-123".to_string());
        assert!(err.to_string().contains("prod-123"));
    }

    #[test]
    fn test_api_error_rate_limit() {
        let err = ApiError::RateLimit(Duration::from_secs(30));
        let msg = err.to_string();
        assert!(msg.contains("Rate limit"));
        assert!(msg.contains("30"));
    }

    #[test]
    fn test_api_error_timeout_distinct_from_network() {
        let timeout = ApiError::Timeout(Duration::from_secs(5));
        let network = ApiError::Network("connection reset".to_string());
        assert!(timeout.to_string().contains("timed out"));
        assert!(!network.to_string().contains("timed out"));
    }

    #[test]
    fn test_abort_is_not_a_failure() {
        assert!(ApiError::Aborted.is_abort());
        assert!(!ApiError::Unauthorized.is_abort());
    }

    #[test]
    fn test_api_error_clone_preserves_message() {
        let err = ApiError::ServerError("backend down".to_string());
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_config_error_parse() {
        let err = ConfigError::ParseError("unexpected key".to_string());
        assert!(err.to_string().contains("unexpected key"));
    }

    #[test]
    fn test_config_error_from_yaml_error() {
        let yaml_str = "invalid: [yaml: content";
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let config_err: ConfigError = yaml_err.into();

        match config_err {
            ConfigError::ParseError(_) => (),
            _ => panic!("Expected ConfigError::ParseError"),
        }
    }

    #[test]
    fn test_error_from_api_error() {
        let api_err = ApiError::Forbidden;
        let err: Error = api_err.into();

        match err {
            Error::Api(ApiError::Forbidden) => (),
            _ => panic!("Expected Error::Api(ApiError::Forbidden)"),
        }
    }

    #[test]
    fn test_error_from_config_error() {
        let cfg_err = ConfigError::NotFound;
        let err: Error = cfg_err.into();

        match err {
            Error::Config(ConfigError::NotFound) => (),
            _ => panic!("Expected Error::Config(ConfigError::NotFound)"),
        }
    }
}
