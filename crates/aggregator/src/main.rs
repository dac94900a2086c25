use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use ticker_aggregator::{
    server, Aggregator, FileSystemWriter, ObjectStoreWriter, SnapshotCache, SnapshotWriter,
};
use ticker_common::symbols::whitelist_json;
use ticker_common::TickerConfig;
use ticker_sources::{build_fetchers, HttpTransport, ReqwestTransport};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ticker")]
#[command(about = "Aggregates exchange rates from several providers into one snapshot")]
struct Cli {
    /// TOML configuration file; TICKER_* variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one aggregation and write the snapshot to the output directory
    Fetch,

    /// Refresh periodically and serve the latest snapshot over HTTP
    Serve,

    /// Print the pinned-id whitelist
    Whitelist,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = TickerConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Fetch => fetch(&config).await,
        Commands::Serve => serve(&config).await,
        Commands::Whitelist => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&whitelist_json()?)?;
            writeln!(stdout)?;
            Ok(())
        }
    }
}

fn transport(config: &TickerConfig) -> Result<Arc<dyn HttpTransport>> {
    let transport = ReqwestTransport::new(&config.http).context("failed to build HTTP client")?;
    Ok(Arc::new(transport))
}

async fn fetch(config: &TickerConfig) -> Result<()> {
    let fetchers = build_fetchers(config, transport(config)?)?;
    let mut writers: Vec<Arc<dyn SnapshotWriter>> = vec![Arc::new(FileSystemWriter::new(&config.out_path))];
    if config.object_store.is_enabled() {
        let uploader = ObjectStoreWriter::s3(&config.object_store).context("failed to configure object store")?;
        writers.push(Arc::new(uploader));
    }

    let snapshot = Aggregator::from_config(config, fetchers, writers)
        .run()
        .await
        .context("aggregation failed")?;

    info!(
        symbols = snapshot.table().len(),
        out_path = %config.out_path.display(),
        "snapshot published"
    );
    Ok(())
}

async fn serve(config: &TickerConfig) -> Result<()> {
    let fetchers = build_fetchers(config, transport(config)?)?;
    let cache = SnapshotCache::new();
    let writers: Vec<Arc<dyn SnapshotWriter>> = vec![Arc::new(cache.clone())];
    let aggregator = Aggregator::from_config(config, fetchers, writers);

    let listener = TcpListener::bind(&config.serve.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.serve.listen_addr))?;

    server::serve(
        listener,
        aggregator,
        cache,
        Duration::from_secs(config.serve.poll_interval_secs),
        server::ctrl_c(),
    )
    .await
}
