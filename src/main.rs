use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use fbowatch::config::{self as cfg, Config};
use fbowatch::delivery::{DeliveryWorker, WebhookSink};
use fbowatch::feed::{FeedSource, FileFeed, HttpFeed};
use fbowatch::scheduler::CheckRunner;

/// fbowatch CLI
#[derive(Debug, Parser)]
#[command(
    name = fbowatch::PKG_NAME,
    version = fbowatch::PKG_VERSION,
    about = "Watches FSE FBO inventory and relays warnings to a chat channel"
)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config", default_value = "config/fbowatch.json")]
    config: PathBuf,

    /// Set log level (e.g., trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run scheduled FBO checks, queuing notifications (long-running)
    Watch {
        /// Read the feed from local CSV files instead of the network (repeatable)
        #[arg(long = "feed-file")]
        feed_files: Vec<PathBuf>,
    },
    /// Drain the notification queue into the channel (long-running)
    Deliver,
    /// Run one FBO check now and exit
    Check {
        /// Read the feed from local CSV files instead of the network (repeatable)
        #[arg(long = "feed-file")]
        feed_files: Vec<PathBuf>,
    },
    /// Print the JSON Schema for the configuration and exit
    PrintSchema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    fbowatch::init_tracing(args.log_level.as_deref());

    if let Command::PrintSchema = args.command {
        let schema = cfg::generate_schema();
        let json = serde_json::to_string_pretty(&schema)?;
        println!("{json}");
        return Ok(());
    }

    info!(
        version = fbowatch::PKG_VERSION,
        config = %args.config.display(),
        "Starting fbowatch"
    );
    let config = cfg::load_from_path_async(&args.config).await?;
    debug!(target: "fbowatch", "Configuration loaded successfully");

    match args.command {
        Command::Watch { feed_files } if !feed_files.is_empty() => {
            watch(&config, FileFeed::new(feed_files)).await
        }
        Command::Watch { .. } => watch(&config, HttpFeed::from_config(&config.feed)?).await,
        Command::Check { feed_files } if !feed_files.is_empty() => {
            check(&config, FileFeed::new(feed_files)).await
        }
        Command::Check { .. } => check(&config, HttpFeed::from_config(&config.feed)?).await,
        Command::Deliver => deliver(&config).await,
        Command::PrintSchema => Ok(()),
    }
}

async fn watch<F: FeedSource>(config: &Config, feed: F) -> anyhow::Result<()> {
    let runner = CheckRunner::new(config, feed)?;
    let cancel = shutdown_on_ctrl_c();
    runner.run(cancel).await;
    info!("fbowatch exited");
    Ok(())
}

async fn check<F: FeedSource>(config: &Config, feed: F) -> anyhow::Result<()> {
    let runner = CheckRunner::new(config, feed)?;
    let queued = runner.run_check().await?;
    info!(queued, path = %runner.queue().path().display(), "Check finished");
    Ok(())
}

async fn deliver(config: &Config) -> anyhow::Result<()> {
    let sink = WebhookSink::from_config(&config.channel)?;
    let worker = DeliveryWorker::new(config, sink);
    let cancel = shutdown_on_ctrl_c();
    worker.run(cancel).await;
    info!("fbowatch exited");
    Ok(())
}

/// Token cancelled on the first Ctrl+C.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
        trigger.cancel();
    });
    cancel
}
