//! Configuration management for Martlet

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// GameMart API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Client-side courtesy rate limit (requests per second)
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: u32,

    /// Cache tuning
    #[serde(default)]
    pub cache: CacheConfig,

    /// Batch coordinator tuning
    #[serde(default)]
    pub batch: BatchConfig,

    /// Prefetch predictor tuning
    #[serde(default)]
    pub prefetch: PrefetchConfig,
}

fn default_base_url() -> String {
    "https://api.gamemart.example".to_string()
}

fn default_request_timeout() -> u64 {
    8
}

fn default_rate_limit() -> u32 {
    6
}

/// Cache store tuning.
///
/// TTLs are a policy table keyed by endpoint pattern, not hard logic: the
/// first rule whose pattern is contained in the endpoint name wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cache entries before an eviction pass runs
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Fraction of entries removed per eviction pass (oldest access first)
    #[serde(default = "default_evict_fraction")]
    pub evict_fraction: f64,

    /// Multiplier on the TTL past which a stale entry may no longer be served
    #[serde(default = "default_stale_factor")]
    pub stale_factor: u32,

    /// How long a failed fetch is remembered, to dampen retry storms
    #[serde(default = "default_error_ttl")]
    pub error_ttl_ms: u64,

    /// Endpoint-pattern to TTL rules, checked in order
    #[serde(default = "default_ttl_rules")]
    pub ttl_rules: Vec<TtlRule>,

    /// TTL for endpoints no rule matches
    #[serde(default = "default_fallback_ttl")]
    pub fallback_ttl_ms: u64,
}

/// One entry in the TTL policy table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtlRule {
    /// Substring matched against the endpoint name
    pub pattern: String,

    /// TTL in milliseconds for matching endpoints
    pub ttl_ms: u64,
}

fn default_capacity() -> usize {
    500
}

fn default_evict_fraction() -> f64 {
    0.10
}

fn default_stale_factor() -> u32 {
    2
}

fn default_error_ttl() -> u64 {
    20_000
}

fn default_fallback_ttl() -> u64 {
    2 * 60_000
}

fn default_ttl_rules() -> Vec<TtlRule> {
    vec![
        // Near-static reference data
        TtlRule {
            pattern: "game_titles".to_string(),
            ttl_ms: 30 * 60_000,
        },
        TtlRule {
            pattern: "banners".to_string(),
            ttl_ms: 30 * 60_000,
        },
        // Semi-volatile aggregates and listings
        TtlRule {
            pattern: "products".to_string(),
            ttl_ms: 3 * 60_000,
        },
        TtlRule {
            pattern: "dashboard".to_string(),
            ttl_ms: 2 * 60_000,
        },
        // Highly volatile, session-sensitive data
        TtlRule {
            pattern: "orders".to_string(),
            ttl_ms: 30_000,
        },
        TtlRule {
            pattern: "feed".to_string(),
            ttl_ms: 60_000,
        },
    ]
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            evict_fraction: default_evict_fraction(),
            stale_factor: default_stale_factor(),
            error_ttl_ms: default_error_ttl(),
            ttl_rules: default_ttl_rules(),
            fallback_ttl_ms: default_fallback_ttl(),
        }
    }
}

impl CacheConfig {
    /// Resolve the TTL for an endpoint from the policy table.
    pub fn ttl_for(&self, endpoint: &str) -> Duration {
        for rule in &self.ttl_rules {
            if endpoint.contains(&rule.pattern) {
                return Duration::from_millis(rule.ttl_ms);
            }
        }
        Duration::from_millis(self.fallback_ttl_ms)
    }

    /// TTL under which failed fetches are remembered.
    pub fn error_ttl(&self) -> Duration {
        Duration::from_millis(self.error_ttl_ms)
    }
}

/// Batch coordinator tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Accumulation window in milliseconds
    #[serde(default = "default_batch_window")]
    pub window_ms: u64,

    /// Endpoints eligible for the combined /api/batch call
    #[serde(default = "default_batchable")]
    pub batchable_endpoints: Vec<String>,

    /// Concurrency cap for individually dispatched requests
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Window after which an unsettled in-flight request no longer blocks
    /// a fresh one (seconds)
    #[serde(default = "default_dedup_timeout")]
    pub dedup_timeout_secs: u64,
}

fn default_batch_window() -> u64 {
    50
}

fn default_max_concurrency() -> usize {
    5
}

fn default_dedup_timeout() -> u64 {
    30
}

fn default_batchable() -> Vec<String> {
    vec![
        "list_products".to_string(),
        "list_banners".to_string(),
        "list_game_titles".to_string(),
        "list_feed".to_string(),
        "dashboard_stats".to_string(),
    ]
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            window_ms: default_batch_window(),
            batchable_endpoints: default_batchable(),
            max_concurrency: default_max_concurrency(),
            dedup_timeout_secs: default_dedup_timeout(),
        }
    }
}

impl BatchConfig {
    /// Batch accumulation window.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Safety timeout for deduplicated in-flight requests.
    pub fn dedup_timeout(&self) -> Duration {
        Duration::from_secs(self.dedup_timeout_secs)
    }
}

/// Prefetch predictor tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefetchConfig {
    /// Master switch; prefetching is purely best-effort
    #[serde(default = "default_prefetch_enabled")]
    pub enabled: bool,

    /// Half-life for the exponential decay of transition scores, in hours
    #[serde(default = "default_half_life")]
    pub half_life_hours: f64,

    /// How many predicted pages to warm per navigation
    #[serde(default = "default_max_warm")]
    pub max_warm_pages: usize,

    /// Page name to warm-up endpoint table
    #[serde(default = "default_page_endpoints")]
    pub page_endpoints: HashMap<String, Vec<String>>,

    /// Override for the learned-pattern persistence file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns_path: Option<PathBuf>,
}

fn default_prefetch_enabled() -> bool {
    true
}

fn default_half_life() -> f64 {
    24.0
}

fn default_max_warm() -> usize {
    2
}

fn default_page_endpoints() -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    map.insert(
        "home".to_string(),
        vec!["list_banners".to_string(), "list_game_titles".to_string()],
    );
    map.insert("shop".to_string(), vec!["list_products".to_string()]);
    map.insert("orders".to_string(), vec!["list_orders".to_string()]);
    map.insert("feed".to_string(), vec!["list_feed".to_string()]);
    map.insert("admin".to_string(), vec!["dashboard_stats".to_string()]);
    map
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: default_prefetch_enabled(),
            half_life_hours: default_half_life(),
            max_warm_pages: default_max_warm(),
            page_endpoints: default_page_endpoints(),
            patterns_path: None,
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".martlet").join("config.yaml"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        // Set file permissions to 600 on Unix systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject configurations the accelerator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".to_string()).into());
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid("cache.capacity must be > 0".to_string()).into());
        }
        if !(self.cache.evict_fraction > 0.0 && self.cache.evict_fraction <= 1.0) {
            return Err(ConfigError::Invalid(
                "cache.evict_fraction must be in (0, 1]".to_string(),
            )
            .into());
        }
        if self.cache.stale_factor < 1 {
            return Err(ConfigError::Invalid("cache.stale_factor must be >= 1".to_string()).into());
        }
        if self.batch.max_concurrency == 0 {
            return Err(
                ConfigError::Invalid("batch.max_concurrency must be > 0".to_string()).into(),
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            rate_limit_per_second: default_rate_limit(),
            cache: CacheConfig::default(),
            batch: BatchConfig::default(),
            prefetch: PrefetchConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cache.capacity, 500);
        assert_eq!(config.cache.stale_factor, 2);
        assert_eq!(config.batch.window_ms, 50);
        assert_eq!(config.batch.max_concurrency, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ttl_policy_table() {
        let cache = CacheConfig::default();

        // Reference data gets the long TTL
        assert_eq!(cache.ttl_for("list_game_titles"), Duration::from_secs(1800));
        // Listings get the mid TTL
        assert_eq!(cache.ttl_for("list_products"), Duration::from_secs(180));
        // Volatile data gets the short TTL
        assert_eq!(cache.ttl_for("list_orders"), Duration::from_secs(30));
        // Unknown endpoints fall back
        assert_eq!(cache.ttl_for("something_else"), Duration::from_secs(120));
        // The table is expressed in milliseconds
        assert_eq!(cache.error_ttl(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_ttl_rules_first_match_wins() {
        let cache = CacheConfig {
            ttl_rules: vec![
                TtlRule {
                    pattern: "orders".to_string(),
                    ttl_ms: 5_000,
                },
                TtlRule {
                    pattern: "list".to_string(),
                    ttl_ms: 99_000,
                },
            ],
            ..CacheConfig::default()
        };

        assert_eq!(cache.ttl_for("list_orders"), Duration::from_secs(5));
        assert_eq!(cache.ttl_for("list_products"), Duration::from_secs(99));
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let mut config = Config::default();
        config.cache.evict_fraction = 0.0;
        assert!(config.validate().is_err());

        config.cache.evict_fraction = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.cache.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_through_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.base_url, config.base_url);
        assert_eq!(parsed.cache.ttl_rules.len(), config.cache.ttl_rules.len());
        assert_eq!(
            parsed.batch.batchable_endpoints,
            config.batch.batchable_endpoints
        );
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let parsed: Config = serde_yaml::from_str("base_url: http://localhost:9999\n").unwrap();
        assert_eq!(parsed.base_url, "http://localhost:9999");
        assert_eq!(parsed.cache.capacity, 500);
        assert!(parsed.prefetch.enabled);
    }
}
