//! Integration tests for VERSION propagation into the client.

use std::fs;

use talos_app::{APP_VERSION, app_version};
use talos_ui::UiState;

#[test]
fn version_display_tests_matches_root_version_file() {
    let root_version_path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../VERSION");
    let root_version = fs::read_to_string(root_version_path).expect("VERSION should be readable");
    assert_eq!(app_version(), root_version.trim());
}

#[test]
fn version_display_tests_version_is_semver_triplet() {
    let parts: Vec<&str> = APP_VERSION.split('.').collect();
    assert_eq!(parts.len(), 3);
    assert!(parts.iter().all(|part| part.parse::<u64>().is_ok()));
}

#[test]
fn version_display_tests_ui_state_carries_client_version() {
    let state = UiState::new(app_version());
    assert_eq!(state.version, APP_VERSION);
}
