//! Hive Liquidity Service
//!
//! HTTP service that builds unsigned pool, liquidity and swap transactions
//! for community tokens. Wallets sign and submit them.

use anyhow::Result;
use clap::Parser;
use hive_liquidity::{
    api,
    rpc_client::LightRpcClient,
    services::{EngineSettings, TokioClock},
    store::PgCommunityStore,
    ServiceConfig, ServiceContext,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hive-liquidity")]
#[command(about = "Liquidity and swap transaction service for community token pools")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "hive-liquidity.toml")]
    config: String,

    /// Override log level
    #[arg(long)]
    log_level: Option<String>,

    /// Dry run mode (validate config and exit)
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_found = std::path::Path::new(&cli.config).exists();
    let mut config = ServiceConfig::load(config_found.then_some(cli.config.as_str()))?;

    if let Some(log_level) = cli.log_level {
        config.monitoring.log_level = log_level;
    }

    init_logging(&config)?;

    if !config_found {
        warn!("Config file not found, using defaults: {}", cli.config);
    }
    info!("Starting Hive Liquidity Service");
    info!("Program ID: {}", config.ledger.program_id);
    info!("RPC endpoint: {}", config.ledger.rpc_url);

    let settings = EngineSettings::from_config(&config)?;
    info!("Configuration validated successfully");

    if cli.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        return Ok(());
    }

    info!("Connecting to community store...");
    let store = Arc::new(PgCommunityStore::connect(&config.database).await?);
    store.health_check().await?;

    let ledger = Arc::new(LightRpcClient::new(&config.ledger));
    let ctx = ServiceContext::new(ledger, store.clone(), store, Arc::new(TokioClock), settings);

    let api_server = api::start_server(ctx, &config.api).await?;

    info!("Service started. Press Ctrl+C to shutdown.");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        _ = api_server => {
            info!("API server finished");
        }
    }

    info!("Shutting down Hive Liquidity Service");
    Ok(())
}

fn init_logging(config: &ServiceConfig) -> Result<()> {
    let log_level = config
        .monitoring
        .log_level
        .parse()
        .unwrap_or(tracing::Level::INFO);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("hive_liquidity={},tower_http=info", log_level).into());

    if config.monitoring.structured_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    Ok(())
}
