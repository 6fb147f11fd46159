use vcam_host::error::HostError;
use vcam_host::logger::initialize as LoggerInitialize;
use vcam_host::startup::{load_config, log_dir, resolve_config_dir, select_backend};

use bridge_core::host::BridgeHost;
use bridge_core::ipc::{ServerOptions, start_ipc_server};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;

use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{}", e.to_report());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), HostError> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config_dir = resolve_config_dir()?;
    let config = load_config(&config_dir)?;

    let log_dir = log_dir(&config, &config_dir);
    create_dir_all(&log_dir).map_err(|e| HostError::Host {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir, config.logging.level_filter())?;

    info!("Bridge host starting");
    info!("Config directory: {}", config_dir.display());
    info!("Log directory: {}", log_dir.display());

    let host = BridgeHost::new(&config, select_backend(config.backend));

    info!("Starting IPC server on port {}", config.ipc.port);
    let ipc_handle = start_ipc_server(
        config.ipc.port,
        config.ipc.auth_token.clone(),
        host.clone(),
        ServerOptions::from(&config),
    )
    .await
    .map_err(|e| HostError::Ipc {
        message: format!("Failed to start IPC server: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    info!("IPC server ready at {}", ipc_handle.url());

    tokio::signal::ctrl_c().await.map_err(|e| HostError::Host {
        message: format!("Failed to listen for shutdown signal: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    info!("Shutdown requested");
    ipc_handle.shutdown().await;
    host.dispose_all();
    Ok(())
}
