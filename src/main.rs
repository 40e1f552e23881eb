use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::cli::{CommonArgs, utils};
use common::config::ConfigOverrides;
use std::sync::Arc;
use sweeper::{ObjectStoreClient, ScanPipeline, ScanSettings};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "s3-sweeper")]
#[command(about = "A high-performance S3 stale object analyzer")]
#[command(
    long_about = "Scans a bucket with a concurrent worker pool to find objects older than a \
                  threshold, and optionally deletes them.\n\n\
                  Example: s3-sweeper scan --bucket my-app-logs --days 30 --workers 50"
)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, global = true, help = "AWS region [default: us-east-1]")]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a bucket for stale objects
    Scan(ScanArgs),
    /// Show the effective configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct ScanArgs {
    #[arg(short, long, help = "Name of the bucket to scan")]
    bucket: String,

    #[arg(short, long, help = "Age in days to consider an object stale [default: 30]")]
    days: Option<u64>,

    #[arg(short, long, help = "Number of concurrent workers [default: 10]")]
    workers: Option<usize>,

    #[arg(long, help = "Perform actual deletion of stale objects")]
    delete: bool,
}

impl ScanArgs {
    fn apply_to(&self, overrides: &mut ConfigOverrides) {
        overrides.days = self.days;
        overrides.workers = self.workers;
        overrides.delete = self.delete;
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM)
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            _ = sigint.recv() => log::info!("Received SIGINT"),
            _ = sigterm.recv() => log::info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        log::info!("Received Ctrl+C");
    }

    Ok(())
}

async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    match wait_for_shutdown_signal().await {
        Ok(()) => {
            log::warn!("Stopping listing, objects already queued will still be processed");
            cancel.cancel();
        }
        Err(e) => log::error!("Shutdown signal handling unavailable: {e:?}"),
    }
}

async fn run_scan(
    common_args: &CommonArgs,
    mut overrides: ConfigOverrides,
    args: ScanArgs,
) -> Result<()> {
    args.apply_to(&mut overrides);
    let config = utils::load_config(common_args.config.as_ref(), &overrides)?;

    println!("Initializing S3 Sweeper...");
    println!("Target: {} [{}]", args.bucket, config.storage.region);
    if config.scan.delete {
        println!("WARNING: DELETE MODE ENABLED. Stale objects will be removed!");
    } else {
        println!("DRY RUN: No objects will be deleted.");
    }

    let object_store = common::storage::create_object_store(&config.storage, &args.bucket)
        .context("Failed to initialize storage client")?;
    let client = Arc::new(
        ObjectStoreClient::new(args.bucket.as_str(), object_store)
            .with_page_size(config.scan.page_size),
    );
    log::info!("Storage client ready for bucket {}", client.bucket());

    let pipeline = ScanPipeline::new(client, ScanSettings::from(&config.scan));

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    println!("Scanning...");
    let mut run = pipeline.run(&args.bucket, cancel).await;
    signal_task.abort();

    if run.failed_before_first_item() {
        if let Some(err) = run.enumeration_error.take() {
            return Err(anyhow::Error::new(err)
                .context(format!("Failed to scan bucket '{}'", args.bucket)));
        }
    }

    match &run.enumeration_error {
        Some(err) if err.is_cancelled() => {
            log::warn!("Scan interrupted, the report covers only the objects listed so far")
        }
        Some(err) => log::error!("Error listing objects: {err}"),
        None => {}
    }

    println!();
    print!("{}", sweeper::report::render(&run.summary));

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::init_logging(&cli.common);

    let overrides = ConfigOverrides {
        region: cli.region.clone(),
        ..Default::default()
    };

    match cli.command {
        Commands::Config { json } => {
            let config = utils::load_config(cli.common.config.as_ref(), &overrides)?;
            utils::display_config(&config, json)
        }
        Commands::Scan(args) => run_scan(&cli.common, overrides, args).await,
    }
}
