//! Watch command: poll an endpoint and observe freshness behavior

use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;

use crate::client::{AcceleratedTransport, HttpTransport, Transport};
use crate::config::Config;
use crate::error::Result;

/// Poll `endpoint` every `interval` seconds, printing where each answer
/// came from (network, cache, or stale-while-revalidate).
pub async fn run(
    endpoint: &str,
    params: &[String],
    interval: u64,
    count: u32,
    config: Config,
    no_cache: bool,
) -> Result<()> {
    let transport = Arc::new(HttpTransport::new(&config)?);
    let accel = AcceleratedTransport::new(transport, &config, !no_cache);
    let params = crate::cli::parse_params(params)?;

    let mut previous = accel.stats();
    for round in 1..=count {
        let started = Instant::now();
        let result = accel.call(endpoint, &params).await;
        let elapsed = started.elapsed();

        let stats = accel.stats();
        let source = if stats.cache.hits > previous.cache.hits {
            "cache".green()
        } else if stats.cache.stale_hits > previous.cache.stale_hits {
            "stale".yellow()
        } else {
            "network".cyan()
        };
        previous = stats;

        let timestamp = chrono::Local::now().format("%H:%M:%S");
        match result {
            Ok(payload) => {
                let summary = summarize(&payload);
                println!(
                    "{} {:>7} {:>6}ms  {}",
                    timestamp,
                    source,
                    elapsed.as_millis(),
                    summary
                );
            }
            Err(err) => {
                println!("{} {:>7}  {}", timestamp, "error".red(), err);
            }
        }

        if round < count {
            tokio::time::sleep(Duration::from_secs(interval)).await;
        }
    }

    accel.flush().await;
    Ok(())
}

/// One-line description of a payload for the poll log.
fn summarize(payload: &serde_json::Value) -> String {
    match payload {
        serde_json::Value::Object(map) => {
            if let Some(items) = map.get("items").and_then(|v| v.as_array()) {
                let total = map
                    .get("total")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(items.len() as u64);
                format!("{} items ({} total)", items.len(), total)
            } else {
                format!("{} fields", map.len())
            }
        }
        serde_json::Value::Array(items) => format!("{} items", items.len()),
        other => other.to_string(),
    }
}
