//! Martlet CLI - cache-accelerated companion for the GameMart marketplace API

use clap::Parser;

use martlet::cli::{self, Cli, Commands, ConfigCommands};
use martlet::error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    match cli.command {
        Commands::Get {
            endpoint,
            param,
            repeat,
            delay_ms,
        } => {
            let config = cli::load_config(cli.config.as_deref(), cli.base_url.as_deref())?;
            cli::get::run(
                &endpoint,
                &param,
                repeat,
                delay_ms,
                cli.format,
                config,
                cli.no_cache,
            )
            .await
        }
        Commands::Watch {
            endpoint,
            param,
            interval,
            count,
        } => {
            let config = cli::load_config(cli.config.as_deref(), cli.base_url.as_deref())?;
            cli::watch::run(&endpoint, &param, interval, count, config, cli.no_cache).await
        }
        Commands::Warm { page, wait_ms } => {
            let config = cli::load_config(cli.config.as_deref(), cli.base_url.as_deref())?;
            cli::warm::run(&page, wait_ms, cli.format, config).await
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Show => {
                cli::config::show(cli.config.as_deref(), cli.base_url.as_deref(), cli.format)
            }
            ConfigCommands::Path => cli::config::path(cli.config.as_deref()),
            ConfigCommands::Init => cli::config::init(cli.config.as_deref()),
        },
        Commands::Version => {
            println!("martlet version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
