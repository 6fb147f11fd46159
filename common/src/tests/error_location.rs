use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures file, line, and column of the caller.
///
/// **WHY THIS MATTERS**: Every error raised by the registry, the subsystems and the IPC layer
/// carries an ErrorLocation. If capture is wrong, every error message points at the wrong place.
///
/// **BUG THIS CATCHES**: Would catch if `Location::caller()` stops being propagated or if the
/// line/column fields are swapped.
#[test]
#[track_caller]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN: Current caller location
    // WHEN: Creating ErrorLocation from caller
    let location = ErrorLocation::from(Location::caller());

    // THEN: Should capture file, line, and column
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert!(location.line > 0, "Should capture a line number");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies the bracketed `[file:line:column]` display format.
///
/// **WHY THIS MATTERS**: Error `Display` strings end with the location and are forwarded to the
/// remote client inside `IpcErrorResponse.message`. A format change breaks log grepping.
///
/// **BUG THIS CATCHES**: Would catch if the brackets or separators are dropped.
#[test]
#[track_caller]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: An ErrorLocation
    let location = ErrorLocation::from(Location::caller());

    // WHEN: Formatting as string
    let formatted = location.to_string();

    // THEN: Should produce "[file:line:column]"
    let expected = format!("[{}:{}:{}]", location.file, location.line, location.column);
    assert_eq!(formatted, expected);
}

/// **VALUE**: Verifies that `file_name()` strips the directory part.
///
/// **WHY THIS MATTERS**: The host logger prints compact locations; full workspace paths make
/// every log line unreadable.
///
/// **BUG THIS CATCHES**: Would catch a split on the wrong separator.
#[test]
fn given_nested_path_when_file_name_called_then_returns_last_component() {
    // GIVEN: A location inside a nested directory
    let location = ErrorLocation {
        file: "backend/bridge-core/src/registry/mod.rs",
        line: 10,
        column: 5,
    };

    // WHEN / THEN: Only the file name is returned
    assert_eq!(location.file_name(), "mod.rs");
}

/// **VALUE**: Verifies that `#[track_caller]` propagation gives each call site its own line.
///
/// **BUG THIS CATCHES**: Would catch if `#[track_caller]` is removed from the constructors used
/// by `From` conversions, which would make all conversions report the same line.
#[test]
fn given_multiple_call_sites_when_capturing_location_then_each_has_unique_line() {
    // GIVEN: A helper function that captures location
    #[track_caller]
    fn capture_location() -> ErrorLocation {
        ErrorLocation::from(Location::caller())
    }

    // WHEN: Capturing location from different call sites
    let first = capture_location();
    let second = capture_location();

    // THEN: Same file, consecutive lines
    assert_eq!(first.file, second.file);
    assert_eq!(first.line + 1, second.line);
}
