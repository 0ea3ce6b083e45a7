use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use flotilla_core::config::FlotillaConfig;
use flotilla_engine::{Scheduler, SystemClock};
use flotilla_gateway::app::{self, AppState};
use flotilla_storage::StorageKind;

/// Cluster job scheduler control-plane.
#[derive(Parser, Debug)]
#[command(name = "flotilla-gateway", version, about = "Cluster job scheduler control-plane")]
struct Cli {
    /// Host to start the webserver on.
    #[arg(long)]
    host: Option<String>,

    /// Webserver port to start on.
    #[arg(long)]
    port: Option<u16>,

    /// Storage backend: memory, postgresql or redis.
    #[arg(long)]
    storage: Option<StorageKind>,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "flotilla_gateway=info,flotilla_engine=info,tower_http=warn".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // config file: explicit path > FLOTILLA_CONFIG env > ./flotilla.toml
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("FLOTILLA_CONFIG").ok());
    let mut config =
        FlotillaConfig::load(config_path.as_deref()).context("failed to load configuration")?;
    if let Some(host) = cli.host {
        config.gateway.bind = host;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    let kind = match cli.storage {
        Some(kind) => kind,
        None => config
            .storage
            .kind
            .parse::<StorageKind>()
            .map_err(|e| anyhow::anyhow!(e))?,
    };

    let storage = flotilla_storage::open(kind).context("failed to open storage backend")?;
    let scheduler = Arc::new(Scheduler::new(storage.clone(), Arc::new(SystemClock)));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(scheduler.clone().run(shutdown_rx));

    let state = Arc::new(AppState::new(scheduler));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    info!("flotilla gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let _ = shutdown_tx.send(true);
    storage.close();
    info!("flotilla gateway stopped");
    Ok(())
}
