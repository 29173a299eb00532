//! chainwatch Binary Entry Point
//!
//! `serve` (default) runs the collector loop and the JSON API.
//! `backfill` pulls historical transactions into the analytical store.
//! Core functionality is provided by the `chainwatch` library crate.

use chainwatch::{
    collector::{
        CollectorHandle, CollectorLoop, SentimentIndexProducer, TokenSupplyProducer,
        TransactionCountProducer,
    },
    config::AppConfig,
    ingest::{PaginatedFetcher, Watermark, backfill},
    server::{AppState, create_router},
    source::{MirrorClient, SentimentClient, build_client},
    storage::{StorageBuilder, StorageHandles, TableWriter},
};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// chainwatch - Chain & Market Metrics Collector
#[derive(Parser, Debug)]
#[command(name = "chainwatch", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults are used if it does not exist)
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "CHAINWATCH_CONFIG",
        global = true
    )]
    config: String,

    /// Metrics database path (overrides config file)
    #[arg(long, env = "CHAINWATCH_DB_PATH", global = true)]
    db_path: Option<String>,

    /// Mirror REST base URL (overrides config file)
    #[arg(long, env = "CHAINWATCH_MIRROR_URL", global = true)]
    mirror_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the collector loop and the HTTP API (default)
    Serve {
        /// Server bind address (overrides config file)
        #[arg(long, env = "CHAINWATCH_SERVER_BIND")]
        server_bind: Option<String>,

        /// Server port (overrides config file)
        #[arg(long, env = "CHAINWATCH_SERVER_PORT")]
        server_port: Option<u16>,

        /// Collection interval, e.g. `5m` (overrides config file)
        #[arg(long, env = "CHAINWATCH_INTERVAL", value_parser = chainwatch::config::parse_duration)]
        interval: Option<std::time::Duration>,

        /// Serve the API without collecting
        #[arg(long)]
        no_collect: bool,
    },
    /// Backfill transactions into the analytical store
    Backfill {
        /// Exclusive lower bound watermark (`<seconds>.<nanos>`)
        #[arg(long)]
        start: Option<String>,

        /// Records per page
        #[arg(long)]
        page_size: Option<usize>,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,

        /// Target table
        #[arg(long)]
        table: Option<String>,

        /// Analytical store path
        #[arg(long)]
        store: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chainwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("chainwatch - Chain & Market Metrics Collector");

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file
    let mut config = if Path::new(&cli.config).exists() {
        tracing::info!(path = %cli.config, "Loading configuration");
        AppConfig::load(&cli.config)?
    } else {
        tracing::warn!(path = %cli.config, "Config file not found, using defaults");
        AppConfig::default()
    };

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(path) = cli.db_path {
        config.database.path = path;
    }
    if let Some(url) = cli.mirror_url {
        config.sources.mirror_base_url = url;
    }

    match cli.command.unwrap_or(Command::Serve {
        server_bind: None,
        server_port: None,
        interval: None,
        no_collect: false,
    }) {
        Command::Serve {
            server_bind,
            server_port,
            interval,
            no_collect,
        } => {
            if let Some(bind) = server_bind {
                config.server.bind = bind;
            }
            if let Some(port) = server_port {
                config.server.port = port;
            }
            if let Some(interval) = interval {
                config.collector.interval = interval;
            }
            if no_collect {
                config.collector.enabled = false;
            }
            config.validate()?;
            serve(config).await
        }
        Command::Backfill {
            start,
            page_size,
            max_pages,
            table,
            store,
        } => {
            if let Some(start) = start {
                config.ingest.start_watermark = start;
            }
            if let Some(page_size) = page_size {
                config.ingest.page_size = page_size;
            }
            if max_pages.is_some() {
                config.ingest.max_pages = max_pages;
            }
            if let Some(table) = table {
                config.ingest.table = table;
            }
            if let Some(store) = store {
                config.ingest.path = store;
            }
            config.validate()?;
            run_backfill(config).await
        }
    }
}

async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        bind = %config.server.bind,
        port = config.server.port,
        db = %config.database.path,
        "Starting server"
    );

    // Build storage layer
    let handles = StorageBuilder::new(&config.database.path)
        .channel_capacity(config.database.channel_capacity)
        .checkpoint_interval(config.database.checkpoint_interval()?)
        .build()?;

    tracing::info!("Storage initialized");

    let collector = if config.collector.enabled {
        let http = build_client(config.sources.request_timeout)?;
        let mirror = MirrorClient::new(http.clone(), &config.sources.mirror_base_url);
        let sentiment = SentimentClient::new(http, &config.sources.sentiment_url);

        let mut collector = CollectorLoop::new(handles.writer.clone(), config.collector.interval)
            .with_call_timeout(config.collector.call_timeout);
        collector.register(TransactionCountProducer::new(mirror.clone()))?;
        collector.register(TokenSupplyProducer::new(
            mirror,
            &config.sources.usdc_token_id,
            chainwatch::storage::SOURCE_HEDERA_USDC,
        ))?;
        collector.register(SentimentIndexProducer::new(sentiment))?;
        Some(collector.spawn())
    } else {
        tracing::info!("Collector disabled");
        None
    };

    // Create web server state
    let app_state = AppState {
        metric_reader: handles.metric_reader.clone(),
    };

    // Build Axum router
    let app = create_router(app_state);

    // Parse bind address
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    tracing::info!("Web server listening on: http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(collector, handles))
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_backfill(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let ingest = &config.ingest;
    let http = build_client(config.sources.request_timeout)?;
    let fetcher = PaginatedFetcher::new(http, &config.sources.mirror_base_url)?
        .with_page_delay(ingest.page_delay);
    let writer = TableWriter::open(&ingest.path)?;

    tracing::info!(
        store = %ingest.path,
        table = %ingest.table,
        start = %ingest.start_watermark,
        max_pages = ?ingest.max_pages,
        "Starting backfill"
    );

    let report = backfill(
        &fetcher,
        &writer,
        &ingest.table,
        &Watermark::new(ingest.start_watermark.as_str()),
        ingest.page_size,
        ingest.max_pages,
    )
    .await?;

    let total = writer.row_count(&ingest.table)?;
    tracing::info!(
        rows_written = report.rows_written,
        total_rows = total,
        resume_from = %report.watermark,
        "Backfill finished"
    );
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal(collector: Option<CollectorHandle>, handles: StorageHandles) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    if let Some(collector) = collector {
        tracing::info!("Shutting down collector...");
        collector.shutdown().await;
    }

    tracing::info!("Shutting down storage...");
    if let Err(e) = handles.shutdown() {
        tracing::error!("Failed to shutdown storage: {}", e);
    }
}
