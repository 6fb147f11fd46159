use crate::config::{BackendKind, BridgeConfig, ENV_AUTH_TOKEN, ENV_IPC_PORT};
use crate::error::config::ConfigError;

use std::collections::HashMap;
use std::time::Duration;

use log::LevelFilter;
use tempfile::TempDir;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

fn assert_invalid(config: &BridgeConfig, needle: &str) {
    match config.validate() {
        Err(ConfigError::ValidationError { reason, .. }) => {
            assert!(reason.contains(needle), "{reason:?} should mention {needle:?}")
        }
        other => panic!("Expected ValidationError about {needle}, got {other:?}"),
    }
}

#[test]
fn given_default_config_when_validated_then_ok() {
    let config = BridgeConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.backend, BackendKind::Loopback);
    assert_eq!(config.requests.timeout(), Duration::from_secs(10));
    assert!(config.ipc.dispose_on_disconnect);
}

/// **VALUE**: A saved config loads back unchanged.
///
/// **WHY THIS MATTERS**: The operator's ICE servers and token must survive a
/// restart.
///
/// **BUG THIS CATCHES**: Would catch a field missing its serde attribute or
/// the temp file never being renamed into place.
#[test]
fn given_saved_config_when_loaded_then_identical() {
    // GIVEN: A customised config saved to a fresh directory
    let dir = TempDir::new().expect("temp dir");
    let mut config = BridgeConfig::default();
    config.ipc.port = 24000;
    config.ipc.auth_token = Some(String::from("token-123"));
    config.rtc.ice_servers = vec![String::from("turn:relay.example.org:3478")];
    config.rtc.field_trials.insert(
        String::from("WebRTC-Foo"),
        String::from("Enabled"),
    );
    config.logging.level = Some(String::from("debug"));
    config.backend = BackendKind::Unavailable;
    config.save(dir.path()).expect("save failed");

    // WHEN: Loading it
    let loaded = BridgeConfig::load(dir.path()).expect("load failed");

    // THEN: Same values, and no temp file left behind
    assert_eq!(loaded, config);
    assert!(!dir.path().join("config.json.tmp").exists());
}

#[test]
fn given_missing_file_when_loaded_then_defaults() {
    let dir = TempDir::new().expect("temp dir");

    let loaded = BridgeConfig::load(dir.path()).expect("load failed");

    assert_eq!(loaded, BridgeConfig::default());
}

/// **VALUE**: A corrupted config file is an error, not silently replaced.
///
/// **WHY THIS MATTERS**: Falling back to defaults would hide a typo and start
/// the bridge with a different token and port.
///
/// **BUG THIS CATCHES**: Would catch parse errors being swallowed.
#[test]
fn given_corrupted_file_when_loaded_then_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("config.json"), "{ \"ipc\": ").expect("write failed");

    let result = BridgeConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

#[test]
fn given_partial_file_when_loaded_then_missing_fields_defaulted() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join("config.json"),
        r#"{ "ipc": { "port": 23000 }, "backend": "none" }"#,
    )
    .expect("write failed");

    let loaded = BridgeConfig::load(dir.path()).expect("load failed");

    assert_eq!(loaded.ipc.port, 23000);
    assert_eq!(loaded.ipc.event_buffer, BridgeConfig::default().ipc.event_buffer);
    assert_eq!(loaded.backend, BackendKind::Unavailable);
    assert_eq!(loaded.rtc, BridgeConfig::default().rtc);
}

/// **VALUE**: Out-of-range values are rejected with a reason naming the field.
///
/// **WHY THIS MATTERS**: The operator needs to know which setting to fix.
///
/// **BUG THIS CATCHES**: Would catch a missing bound check.
#[test]
fn given_invalid_values_when_validated_then_field_named() {
    let mut config = BridgeConfig::default();
    config.ipc.auth_token = Some(String::from("  "));
    assert_invalid(&config, "auth_token");

    let mut config = BridgeConfig::default();
    config.ipc.event_buffer = 1;
    assert_invalid(&config, "event_buffer");

    let mut config = BridgeConfig::default();
    config.requests.timeout_ms = 10;
    assert_invalid(&config, "timeout_ms");

    let mut config = BridgeConfig::default();
    config.rtc.ice_servers = vec![String::from("http://stun.example.org")];
    assert_invalid(&config, "ICE server");

    let mut config = BridgeConfig::default();
    config.logging.level = Some(String::from("loud"));
    assert_invalid(&config, "logging.level");

    let mut config = BridgeConfig::default();
    config.version = 0;
    assert_invalid(&config, "version");
}

#[test]
fn given_level_names_when_parsed_then_filters() {
    let mut config = BridgeConfig::default();
    assert_eq!(config.logging.level_filter(), None);

    config.logging.level = Some(String::from("trace"));
    assert_eq!(config.logging.level_filter(), Some(LevelFilter::Trace));

    config.logging.level = Some(String::from("WARN"));
    assert_eq!(config.logging.level_filter(), Some(LevelFilter::Warn));
}

/// **VALUE**: Environment variables override the port and token.
///
/// **WHY THIS MATTERS**: The launcher of the remote client passes both to the
/// bridge without touching its config file.
///
/// **BUG THIS CATCHES**: Would catch overrides being ignored or a bad port
/// being silently replaced.
#[test]
fn given_env_overrides_when_applied_then_port_and_token_replaced() {
    // GIVEN: Overrides for both variables
    let mut config = BridgeConfig::default();
    let vars = lookup(&[(ENV_IPC_PORT, " 30123 "), (ENV_AUTH_TOKEN, "from-env")]);

    // WHEN: Applying them
    config.apply_overrides(vars).expect("overrides failed");

    // THEN: Both took effect
    assert_eq!(config.ipc.port, 30123);
    assert_eq!(config.ipc.auth_token.as_deref(), Some("from-env"));
}

#[test]
fn given_non_numeric_port_override_when_applied_then_environment_error() {
    let mut config = BridgeConfig::default();

    let result = config.apply_overrides(lookup(&[(ENV_IPC_PORT, "eighty")]));

    match result {
        Err(ConfigError::EnvironmentError { variable, .. }) => {
            assert_eq!(variable, ENV_IPC_PORT)
        }
        other => panic!("Expected EnvironmentError, got {other:?}"),
    }
}

#[test]
fn given_empty_token_override_when_applied_then_validation_error() {
    let mut config = BridgeConfig::default();

    let result = config.apply_overrides(lookup(&[(ENV_AUTH_TOKEN, "")]));

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}

#[test]
fn given_rtc_config_when_converted_then_settings_match() {
    let mut config = BridgeConfig::default();
    config.rtc.offer_to_receive_audio = false;

    let settings = config.rtc.settings();

    assert_eq!(settings.connection.ice_servers, config.rtc.ice_servers);
    assert!(settings.connection.continual_gathering);
    assert!(!settings.constraints.offer_to_receive_audio);
    assert!(settings.constraints.offer_to_receive_video);
}
