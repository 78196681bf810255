//! CLI command definitions and handlers

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{ConfigError, Error, Result};

pub mod config;
pub mod get;
pub mod warm;
pub mod watch;

/// Output format options
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty format - human-optimized rich formatting
    #[default]
    Pretty,
    /// Table format - machine-parseable, one row per entry
    Table,
    /// JSON format - structured for scripts/APIs
    Json,
}

/// Martlet - cache-accelerated companion for the GameMart marketplace API
#[derive(Parser, Debug)]
#[command(name = "martlet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "MARTLET_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "MARTLET_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Override the API base URL
    #[arg(long, global = true, env = "MARTLET_API_HOST", hide_env = true)]
    pub base_url: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "MARTLET_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Bypass the accelerator, always fetch fresh data
    #[arg(long, global = true, env = "MARTLET_NO_CACHE", hide_env = true)]
    pub no_cache: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch an endpoint through the accelerator
    Get {
        /// Logical endpoint name (e.g. list_products, dashboard_stats)
        endpoint: String,

        /// Request parameter as key=value (repeatable)
        #[arg(short, long)]
        param: Vec<String>,

        /// Fetch this many times, to observe cache hits
        #[arg(long, default_value_t = 1)]
        repeat: u32,

        /// Pause between repeated fetches, in milliseconds
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },

    /// Poll an endpoint and watch cache freshness behavior
    Watch {
        /// Logical endpoint name
        endpoint: String,

        /// Request parameter as key=value (repeatable)
        #[arg(short, long)]
        param: Vec<String>,

        /// Seconds between polls
        #[arg(long, default_value_t = 2)]
        interval: u64,

        /// Number of polls before exiting
        #[arg(long, default_value_t = 10)]
        count: u32,
    },

    /// Simulate a navigation and prefetch likely next pages
    Warm {
        /// Page being visited (e.g. home, shop, orders)
        page: String,

        /// How long to let warm requests run, in milliseconds
        #[arg(long, default_value_t = 500)]
        wait_ms: u64,
    },

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Display version information
    Version,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default configuration file
    Init,
}

/// Load configuration, honoring the `--config` and `--base-url` overrides.
///
/// A missing config file is not an error when no explicit path was given;
/// the defaults are enough to run against any base URL.
pub fn load_config(path_override: Option<&str>, base_url: Option<&str>) -> Result<Config> {
    let mut config = match path_override {
        Some(path) => Config::load_from(PathBuf::from(path))?,
        None => match Config::load() {
            Ok(config) => config,
            Err(Error::Config(ConfigError::NotFound)) => Config::default(),
            Err(err) => return Err(err),
        },
    };

    if let Some(url) = base_url {
        config.base_url = url.to_string();
    }
    config.validate()?;

    Ok(config)
}

/// Parse repeated `key=value` arguments into a JSON params object.
pub fn parse_params(params: &[String]) -> Result<Value> {
    let mut map = Map::new();
    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            return Err(Error::Other(format!(
                "Invalid parameter '{}': expected key=value",
                param
            )));
        };
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(Value::Object(map))
}
