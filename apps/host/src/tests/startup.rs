use crate::startup::{ENV_CONFIG_DIR, load_config, log_dir, resolve_config_dir, select_backend};

use bridge_core::config::{BackendKind, BridgeConfig, ENV_IPC_PORT};
use bridge_core::host::BridgeHost;

use std::path::PathBuf;

use serial_test::serial;
use tempfile::TempDir;

fn set_env(name: &str, value: &str) {
    // SAFETY: every test touching the environment is #[serial].
    unsafe { std::env::set_var(name, value) }
}

fn remove_env(name: &str) {
    // SAFETY: every test touching the environment is #[serial].
    unsafe { std::env::remove_var(name) }
}

/// **VALUE**: The config directory can be redirected by environment variable
/// and is created on demand.
///
/// **WHY THIS MATTERS**: Launchers and tests run the bridge against a private
/// directory instead of the user's config.
///
/// **BUG THIS CATCHES**: Would catch the variable being ignored or the
/// directory not being created before the config is read.
#[test]
#[serial]
fn given_config_dir_env_when_resolving_then_directory_created() {
    // GIVEN: The variable pointing at a directory that does not exist yet
    let temp_dir = TempDir::new().expect("temp dir");
    let target = temp_dir.path().join("nested").join("bridge");
    set_env(ENV_CONFIG_DIR, target.to_str().expect("utf-8 path"));

    // WHEN: Resolving
    let resolved = resolve_config_dir();
    remove_env(ENV_CONFIG_DIR);

    // THEN: That directory is used and exists
    let resolved = resolved.expect("resolve failed");
    assert_eq!(resolved, target);
    assert!(target.is_dir());
}

#[test]
#[serial]
fn given_port_env_override_when_loading_then_applied_over_file() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut saved = BridgeConfig::default();
    saved.ipc.port = 21000;
    saved.save(temp_dir.path()).expect("save failed");
    set_env(ENV_IPC_PORT, "21001");

    let loaded = load_config(temp_dir.path());
    remove_env(ENV_IPC_PORT);

    assert_eq!(loaded.expect("load failed").ipc.port, 21001);
}

#[test]
#[serial]
fn given_bad_port_env_override_when_loading_then_config_error() {
    let temp_dir = TempDir::new().expect("temp dir");
    set_env(ENV_IPC_PORT, "not-a-port");

    let loaded = load_config(temp_dir.path());
    remove_env(ENV_IPC_PORT);

    let err = loaded.expect_err("override should fail");
    assert!(format!("{err:?}").contains("Config"));
}

#[test]
fn given_logging_directory_when_resolving_log_dir_then_preferred() {
    let config_dir = PathBuf::from("/etc/vcam-bridge");
    let mut config = BridgeConfig::default();
    assert_eq!(log_dir(&config, &config_dir), config_dir);

    config.logging.directory = Some(PathBuf::from("/var/log/vcam"));
    assert_eq!(log_dir(&config, &config_dir), PathBuf::from("/var/log/vcam"));
}

/// **VALUE**: The "none" backend makes every creation fail with the invalid
/// handle while the loopback backend works.
///
/// **WHY THIS MATTERS**: Hosts without native support must still start and
/// answer requests.
///
/// **BUG THIS CATCHES**: Would catch the backend kind being ignored.
#[tokio::test]
async fn given_backend_kinds_when_selected_then_creation_matches() {
    let config = BridgeConfig::default();

    let loopback = BridgeHost::new(&config, select_backend(BackendKind::Loopback));
    let unavailable = BridgeHost::new(&config, select_backend(BackendKind::Unavailable));

    assert_eq!(loopback.peer_connections().create(), 0);
    assert_eq!(unavailable.peer_connections().create(), -1);
    assert_eq!(unavailable.ar_sessions().create(), -1);

    loopback.dispose_all();
    unavailable.dispose_all();
}
