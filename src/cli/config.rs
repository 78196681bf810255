//! Configuration management commands

use std::path::PathBuf;

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::Result;
use crate::output::json::format_json;

/// Print the resolved configuration.
pub fn show(
    path_override: Option<&str>,
    base_url: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let config = crate::cli::load_config(path_override, base_url)?;

    match format {
        OutputFormat::Json => println!("{}", format_json(&config)?),
        _ => {
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| crate::error::ConfigError::from(e))?;
            print!("{}", yaml);
        }
    }

    Ok(())
}

/// Print the config file path in effect.
pub fn path(path_override: Option<&str>) -> Result<()> {
    let path = match path_override {
        Some(p) => PathBuf::from(p),
        None => Config::default_path()?,
    };
    println!("{}", path.display());
    Ok(())
}

/// Write a default configuration file.
pub fn init(path_override: Option<&str>) -> Result<()> {
    let path = match path_override {
        Some(p) => PathBuf::from(p),
        None => Config::default_path()?,
    };

    if path.exists() {
        println!(
            "{} Configuration already exists at {}",
            "✗".red(),
            path.display()
        );
        return Ok(());
    }

    Config::default().save_to(path.clone())?;
    println!("{} Wrote default configuration to {}", "✓".green(), path.display());
    println!("  → Edit base_url to point at your GameMart deployment");

    Ok(())
}
