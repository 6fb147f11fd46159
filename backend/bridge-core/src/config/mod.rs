use crate::error::config::ConfigError;
use crate::rtc::RtcSettings;
use crate::native::{MediaConstraints, PeerConnectionConfig};

use common::ErrorLocation;

use std::collections::HashMap;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::{LevelFilter, info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_DIR_NAME: &str = "vcam-bridge";
const CONFIG_VERSION: u32 = 1;

pub const ENV_IPC_PORT: &str = "VCAM_BRIDGE_IPC_PORT";
pub const ENV_AUTH_TOKEN: &str = "VCAM_BRIDGE_AUTH_TOKEN";

const MIN_TIMEOUT_MS: u64 = 100;
const MAX_TIMEOUT_MS: u64 = 300_000;
const MIN_EVENT_BUFFER: usize = 16;
const MAX_EVENT_BUFFER: usize = 65_536;

// ============================================
// ENUMS WITH DEFAULTS
// ============================================

/// Which native implementation backs the subsystems.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Loopback,
    /// Every native construction fails.
    #[serde(rename = "none")]
    Unavailable,
}

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IpcConfig {
    #[serde(default = "default_ipc_port")]
    pub port: u16,
    /// Generated per run when absent.
    pub auth_token: Option<String>,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Release every client-created resource when the last client leaves.
    #[serde(default = "default_true")]
    pub dispose_on_disconnect: bool,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            port: default_ipc_port(),
            auth_token: None,
            event_buffer: default_event_buffer(),
            dispose_on_disconnect: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RtcConfig {
    #[serde(default = "default_ice_servers")]
    pub ice_servers: Vec<String>,
    #[serde(default)]
    pub field_trials: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub continual_gathering: bool,
    #[serde(default = "default_true")]
    pub offer_to_receive_audio: bool,
    #[serde(default = "default_true")]
    pub offer_to_receive_video: bool,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            field_trials: HashMap::new(),
            continual_gathering: true,
            offer_to_receive_audio: true,
            offer_to_receive_video: true,
        }
    }
}

impl RtcConfig {
    pub fn settings(&self) -> RtcSettings {
        RtcSettings {
            connection: PeerConnectionConfig {
                ice_servers: self.ice_servers.clone(),
                continual_gathering: self.continual_gathering,
            },
            constraints: MediaConstraints {
                offer_to_receive_audio: self.offer_to_receive_audio,
                offer_to_receive_video: self.offer_to_receive_video,
            },
            field_trials: self.field_trials.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RequestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `error`, `warn`, `info`, `debug` or `trace`. Build default when absent.
    pub level: Option<String>,
    /// Directory of the log file. Next to the config when absent.
    pub directory: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Option<LevelFilter> {
        self.level
            .as_deref()
            .and_then(|level| LevelFilter::from_str(level).ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub ipc: IpcConfig,

    #[serde(default)]
    pub rtc: RtcConfig,

    #[serde(default)]
    pub requests: RequestConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub backend: BackendKind,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            ipc: IpcConfig::default(),
            rtc: RtcConfig::default(),
            requests: RequestConfig::default(),
            logging: LoggingConfig::default(),
            backend: BackendKind::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_true() -> bool {
    true
}
fn default_ipc_port() -> u16 {
    19876
}
fn default_event_buffer() -> usize {
    1024
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_ice_servers() -> Vec<String> {
    vec!["stun:stun.l.google.com:19302".to_string()]
}

// ============================================
// IMPLEMENTATION
// ============================================

/// `<platform config dir>/vcam-bridge`, when the platform has one.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME))
}

impl BridgeConfig {
    /// Load config from {config_dir}/config.json.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is corrupted/invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        let config: BridgeConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/config.json using atomic write
    /// (temp file + rename).
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Apply `VCAM_BRIDGE_*` environment overrides, then re-validate.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an
    /// explicit variable lookup.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = lookup(ENV_IPC_PORT) {
            self.ipc.port = port.trim().parse().map_err(|e| ConfigError::EnvironmentError {
                location: ErrorLocation::from(Location::caller()),
                variable: ENV_IPC_PORT.to_string(),
                reason: format!("{e}: {port:?}"),
            })?;
            info!("IPC port overridden by {}", ENV_IPC_PORT);
        }

        if let Some(token) = lookup(ENV_AUTH_TOKEN) {
            self.ipc.auth_token = Some(token);
            info!("IPC auth token overridden by {}", ENV_AUTH_TOKEN);
        }

        self.validate()
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        if let Some(token) = &self.ipc.auth_token
            && token.trim().is_empty()
        {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "ipc.auth_token cannot be empty string".to_string(),
            });
        }

        if !(MIN_EVENT_BUFFER..=MAX_EVENT_BUFFER).contains(&self.ipc.event_buffer) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid ipc.event_buffer: {} (must be {}-{})",
                    self.ipc.event_buffer, MIN_EVENT_BUFFER, MAX_EVENT_BUFFER
                ),
            });
        }

        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.requests.timeout_ms) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid requests.timeout_ms: {} (must be {}-{})",
                    self.requests.timeout_ms, MIN_TIMEOUT_MS, MAX_TIMEOUT_MS
                ),
            });
        }

        for server in &self.rtc.ice_servers {
            let known_scheme = ["stun:", "turn:", "turns:"]
                .iter()
                .any(|scheme| server.starts_with(scheme));
            if !known_scheme {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("Invalid ICE server URL: {}", server),
                });
            }
        }

        if let Some(level) = &self.logging.level
            && self.logging.level_filter().is_none()
        {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Invalid logging.level: {}", level),
            });
        }

        Ok(())
    }
}
