//! Startup steps of the host process, in the order `main` runs them.

use crate::error::HostError;

use bridge_core::config::{BackendKind, BridgeConfig, default_config_dir};
use bridge_core::native::NativeBackend;
use bridge_core::native::loopback::Loopback;

use common::ErrorLocation;

use std::env;
use std::fs::create_dir_all;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;

/// Overrides the directory holding `config.json` and the log file.
pub const ENV_CONFIG_DIR: &str = "VCAM_BRIDGE_CONFIG_DIR";

/// Roughly 30 fps of synthetic AR frames.
const LOOPBACK_AR_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Directory of the config file, created if missing.
///
/// # Errors
///
/// Returns [`HostError::Host`] when no directory can be determined or it
/// cannot be created.
#[track_caller]
pub fn resolve_config_dir() -> Result<PathBuf, HostError> {
    let dir = match env::var_os(ENV_CONFIG_DIR).filter(|value| !value.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => default_config_dir().ok_or_else(|| HostError::Host {
            message: String::from("Could not determine a config directory"),
            location: ErrorLocation::from(Location::caller()),
        })?,
    };

    create_dir_all(&dir).map_err(|e| HostError::Host {
        message: format!("Failed to create config directory {}: {e}", dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok(dir)
}

/// Load `config.json` and apply environment overrides.
///
/// # Errors
///
/// Returns [`HostError::Config`] when the file is invalid or an override
/// does not parse.
#[track_caller]
pub fn load_config(config_dir: &Path) -> Result<BridgeConfig, HostError> {
    let mut config = BridgeConfig::load(config_dir).map_err(|e| HostError::Config {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;
    config
        .apply_env_overrides()
        .map_err(|e| HostError::Config {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;
    Ok(config)
}

/// Where the log file goes: the configured directory, else next to the config.
pub fn log_dir(config: &BridgeConfig, config_dir: &Path) -> PathBuf {
    config
        .logging
        .directory
        .clone()
        .unwrap_or_else(|| config_dir.to_path_buf())
}

pub fn select_backend(kind: BackendKind) -> NativeBackend {
    match kind {
        BackendKind::Loopback => {
            info!("Using loopback native backend");
            let hooks = Loopback::new().with_ar_frame_interval(LOOPBACK_AR_FRAME_INTERVAL);
            NativeBackend::from(&hooks)
        }
        BackendKind::Unavailable => {
            info!("No native backend; every resource creation will fail");
            NativeBackend::unavailable()
        }
    }
}
