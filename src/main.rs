use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use storefront_gateway::config::{self, validation::validate_config, ConfigError};
use storefront_gateway::http::HttpServer;
use storefront_gateway::lifecycle::{signals, Shutdown};
use storefront_gateway::net::load_tls_config;
use storefront_gateway::observability::{logging, metrics};
use storefront_gateway::routing::is_loopback;

/// Reverse proxy in front of the storefront backend API.
#[derive(Parser, Debug)]
#[command(name = "storefront-gateway", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        backend_base = %config.backend.base(),
        environment = %config.backend.environment,
        mount_path = %config.proxy.mount_path,
        max_in_flight = config.listener.max_in_flight,
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    if config.backend.is_production() && is_loopback(config.backend.base()) {
        tracing::error!(
            backend_base = %config.backend.base(),
            "BACKEND_URL points at a loopback address in production; every proxied request will fail with 500"
        );
    }

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let config = Arc::new(config);
    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    signals::forward_signals(shutdown.clone());

    let server = HttpServer::new(config.clone())?;

    match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            let rustls = load_tls_config(tls).await?;
            server.run_tls(addr, rustls, server_shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, server_shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
