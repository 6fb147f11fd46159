// Unit tests for error module
// Tests the JSON report written to stderr on startup failure

use crate::error::HostError;

use common::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Startup errors serialize to a single tagged JSON line.
///
/// **WHY THIS MATTERS**: The launcher of the remote client reads this line to
/// tell the user why the bridge never came up.
///
/// **BUG THIS CATCHES**: Would catch the `Serialize` derive or the serde tag
/// being removed, or a multi-line report breaking line-based parsing.
#[test]
fn given_host_error_when_reported_then_tagged_json_line() {
    // GIVEN: A config error
    let err = HostError::Config {
        message: String::from("ipc.port must not be 0"),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Building the report
    let report = err.to_report();

    // THEN: One line of JSON naming the variant and message
    assert!(!report.contains('\n'));
    let value: serde_json::Value = serde_json::from_str(&report).expect("report is JSON");
    assert_eq!(value["type"], "Config");
    assert_eq!(value["data"]["message"], "ipc.port must not be 0");
}

#[test]
fn given_ipc_error_when_displayed_then_message_included() {
    let err = HostError::Ipc {
        message: String::from("address in use"),
        location: ErrorLocation::from(Location::caller()),
    };

    let shown = err.to_string();

    assert!(shown.starts_with("IPC Error: address in use"));
}
