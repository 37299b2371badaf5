//! Trader binary
//!
//! Runs the orchestrator against the simulated store with the momentum
//! strategy until Ctrl+C, SIGTERM or the optional run time elapses.

use anyhow::Result;
use clap::Parser;
use feeds::{SimulatedStore, SimulatedStoreConfig, Store};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trading_gateway::{MomentumStrategy, Orchestrator, TraderConfig};

const SERVICE_NAME: &str = "trading-gateway";
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Trader CLI
#[derive(Parser, Debug)]
#[clap(name = "trader")]
#[clap(about = "Tick aggregation and strategy runner")]
struct Cli {
    /// JSON trader configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// Codes the simulated store produces ticks for
    #[clap(long, value_delimiter = ',', default_value = "KRW-BTC")]
    codes: Vec<String>,

    /// Starting cash, overrides the config file
    #[clap(long)]
    cash: Option<i64>,

    /// Commission rate, overrides the config file
    #[clap(long)]
    commission: Option<f64>,

    /// Pause between two simulated ticks
    #[clap(long, default_value = "100")]
    tick_interval_ms: u64,

    /// Stop after this many seconds
    #[clap(long)]
    run_for_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    info!("Starting trader v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "Loading config");
            TraderConfig::from_json_file(path)?
        }
        None => TraderConfig::default(),
    };
    if cli.cash.is_some() {
        config.cash = cli.cash;
    }
    if cli.commission.is_some() {
        config.commission = cli.commission;
    }

    let defaults = SimulatedStoreConfig::default();
    let store: Arc<dyn Store> = Arc::new(SimulatedStore::new(SimulatedStoreConfig {
        codes: cli.codes.clone(),
        tick_interval: Duration::from_millis(cli.tick_interval_ms.max(1)),
        ..defaults
    }));

    let orchestrator = Orchestrator::new(config)
        .with_store(Arc::clone(&store))
        .with_strategy(Arc::new(MomentumStrategy::new(store)));
    orchestrator.start().await?;

    let run_for = async {
        match cli.run_for_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        () = shutdown_signal() => {}
        () = run_for => info!("Run time elapsed"),
        () = orchestrator.run_until_shutdown() => {}
    }

    orchestrator.stop();
    if !orchestrator.wait_stopped(STOP_TIMEOUT).await {
        warn!("Some workers did not stop in time");
    }

    let broker = orchestrator.broker();
    info!(
        cash = broker.cash(),
        positions = broker.positions().len(),
        markets = orchestrator.router().market_count(),
        metrics = ?broker.metrics(),
        "Trader shut down"
    );
    Ok(())
}

/// Initialize tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=info,data_aggregator=info,oms=info,bus=info,feeds=info",
                    SERVICE_NAME.replace('-', "_")
                )
                .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();
}

/// Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = until_signal("Ctrl+C", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

/// Resolve when `signal` fires; a handler that failed to install never does
async fn until_signal(name: &str, signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        error!("Failed to install {} handler: {}", name, e);
        std::future::pending::<()>().await;
    }
}
