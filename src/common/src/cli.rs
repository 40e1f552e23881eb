use clap::Args;
use std::path::PathBuf;

/// Arguments shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::{ConfigOverrides, Configuration};
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Log level implied by the verbosity flags
    pub fn log_level(args: &CommonArgs) -> &'static str {
        if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Initialize logging. `RUST_LOG` wins over the verbosity flags.
    pub fn init_logging(args: &CommonArgs) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level(args)));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    /// Load configuration, layering the CLI overrides on top
    pub fn load_config(
        config_path: Option<&PathBuf>,
        overrides: &ConfigOverrides,
    ) -> Result<Configuration> {
        let config = match config_path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Configuration file not found: {}", path.display());
                }
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_with(Some(path.as_path()), overrides)
            }
            None => Configuration::load_with(None, overrides),
        }
        .context("Failed to load configuration")?;

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("s3-sweeper Configuration:");
            println!("========================");
            println!("Region: {}", config.storage.region);
            match &config.storage.endpoint {
                Some(endpoint) => println!("Endpoint: {endpoint}"),
                None => println!("Endpoint: provider default"),
            }
            if let Some(url) = &config.storage.url {
                println!("Storage URL: {url}");
            }
            println!("Staleness threshold: {} days", config.scan.days);
            println!("Workers: {}", config.scan.workers);
            println!("Delete mode: {}", config.scan.delete);
            println!("Queue capacity: {}", config.scan.queue_capacity);
            println!("Page size: {}", config.scan.page_size);
        }
        Ok(())
    }
}
