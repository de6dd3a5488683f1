// server/src/main.rs

// Entry point for the clinic REST server: config, logging, storage, then warp.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tokio::signal::unix::{signal, SignalKind};

use clinic_server::{api_routes, AppState};
use lib::config::{
    apply_cli_overrides, load_clinic_config, save_clinic_config, ClinicCliArgs,
    DEFAULT_CLINIC_CONFIG_PATH_RELATIVE,
};
use logging_service::init_logging;

async fn handle_signals() {
    let (mut sigterm, mut sigint) = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        _ => {
            warn!("Unix signal handlers unavailable, waiting for ctrl-c instead");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = ClinicCliArgs::parse();
    let config = load_clinic_config(args.config.as_deref())?;
    let config = apply_cli_overrides(config, &args);
    init_logging(&config.log_level);

    if args.init_config {
        let path = args
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CLINIC_CONFIG_PATH_RELATIVE));
        save_clinic_config(&config, &path)?;
        info!("Wrote clinic configuration to {}", path.display());
        return Ok(());
    }

    info!(
        "Starting clinic_server with {} storage and drug registry {}",
        config.storage.storage_engine_type, config.drug_registry.base_url
    );
    let state = AppState::from_config(&config).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;
    let (bound, server) = warp::serve(api_routes(state))
        .try_bind_with_graceful_shutdown(addr, handle_signals())
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Clinic API listening on http://{}", bound);
    server.await;
    info!("Clinic API stopped");
    Ok(())
}
