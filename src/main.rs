use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use inference_gate::config::load_config;
use inference_gate::lifecycle::{signals, Shutdown};
use inference_gate::observability::init_logging;
use inference_gate::GateServer;

#[derive(Parser)]
#[command(name = "inference-gate")]
#[command(about = "Authenticating reverse proxy for a local inference server", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Built-in defaults are used when omitted.
    #[arg(short, long, env = "GATE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();

    tracing::info!("inference-gate v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.url,
        allowlist_entries = config.auth.allowed_ips.len(),
        api_key_required = config.auth.require_api_key,
        "Configuration loaded"
    );

    let bind_address = config.listener.bind_address.clone();
    let server = GateServer::new(config)?;

    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_address, error = %e, "Failed to bind listener");
            return Err(e.into());
        }
    };

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
