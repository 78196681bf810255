//! Warm command: simulate a navigation and prefetch likely next pages

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::client::{AcceleratedTransport, HttpTransport};
use crate::config::Config;
use crate::error::Result;
use crate::output::json::format_json;
use crate::output::table::format_table;
use crate::prefetch::{Prefetcher, TransitionStore};

#[derive(Tabled)]
struct TransitionRow {
    #[tabled(rename = "FROM")]
    from: String,
    #[tabled(rename = "TO")]
    to: String,
    #[tabled(rename = "SCORE")]
    score: String,
}

/// Record a visit to `page`, let the predictor warm the cache, and show
/// what it has learned so far.
pub async fn run(page: &str, wait_ms: u64, format: OutputFormat, config: Config) -> Result<()> {
    let patterns_path = match config.prefetch.patterns_path.clone() {
        Some(path) => Some(path),
        None => TransitionStore::default_path().ok(),
    };
    let transitions = Arc::new(TransitionStore::load(
        patterns_path,
        config.prefetch.half_life_hours,
    ));

    let transport = Arc::new(HttpTransport::new(&config)?);
    let accel = AcceleratedTransport::new(transport, &config, true);
    let prefetcher = Prefetcher::new(accel.clone(), transitions.clone(), &config.prefetch);

    prefetcher.visit(page);
    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
    accel.flush().await;

    let mut snapshot = transitions.snapshot();
    snapshot.sort_by(|a, b| b.count.total_cmp(&a.count));

    match format {
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "page": page,
                "warmed_requests": prefetcher.warmed(),
                "cached_entries": accel.cache().len(),
                "transitions": snapshot,
            });
            println!("{}", format_json(&payload)?);
        }
        _ => {
            println!(
                "Visited {}: {} warm requests, {} cached entries",
                page.bold(),
                prefetcher.warmed(),
                accel.cache().len()
            );

            let rows: Vec<TransitionRow> = snapshot
                .into_iter()
                .map(|t| TransitionRow {
                    from: t.from,
                    to: t.to,
                    score: format!("{:.2}", t.count),
                })
                .collect();
            println!("{}", format_table(&rows));
        }
    }

    Ok(())
}
