//! Get command: fetch an endpoint through the accelerator

use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::client::{AcceleratedTransport, HttpTransport, Transport};
use crate::config::Config;
use crate::error::Result;
use crate::output::json::format_json;
use crate::output::table::format_kv;

/// Fetch `endpoint` `repeat` times and print the final payload.
///
/// Repeated fetches show the accelerator at work: the first goes to the
/// network, later ones come back from cache until the TTL lapses.
pub async fn run(
    endpoint: &str,
    params: &[String],
    repeat: u32,
    delay_ms: u64,
    format: OutputFormat,
    config: Config,
    no_cache: bool,
) -> Result<()> {
    let transport = Arc::new(HttpTransport::new(&config)?);
    let accel = AcceleratedTransport::new(transport, &config, !no_cache);
    let params = crate::cli::parse_params(params)?;

    let mut payload = serde_json::Value::Null;
    for round in 1..=repeat {
        let started = Instant::now();
        payload = accel.call(endpoint, &params).await?;
        let elapsed = started.elapsed();

        if repeat > 1 {
            eprintln!(
                "{} fetch {}/{} in {:?}",
                "→".dimmed(),
                round,
                repeat,
                elapsed
            );
        }

        if delay_ms > 0 && round < repeat {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    accel.flush().await;

    match format {
        OutputFormat::Json => println!("{}", format_json(&payload)?),
        _ => println!("{}", serde_json::to_string_pretty(&payload)?),
    }

    if repeat > 1 && !matches!(format, OutputFormat::Json) {
        let stats = accel.stats();
        println!();
        println!("{}", "Accelerator".bold());
        println!(
            "{}",
            format_kv(&[
                ("Cache hits", stats.cache.hits.to_string()),
                ("Stale served", stats.cache.stale_hits.to_string()),
                ("Misses", stats.cache.misses.to_string()),
                ("Fetches launched", stats.fetches_launched.to_string()),
                ("Callers collapsed", stats.fetches_collapsed.to_string()),
                ("Batches sent", stats.batches_sent.to_string()),
            ])
        );
    }

    Ok(())
}
