//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global: REPLACE (global defines the real baseline)
//! - Global → Local: UNION with `!tag` removal
//! - Any → Env vars: scalar overrides only
//!
//! Note: These tests run without a global config (temp directories only),
//! so they effectively test local config merging with defaults.

use std::fs;

use tempfile::TempDir;

use treesync::application::ApplicationError;
use treesync::config::{local_config_path, Settings};

#[test]
fn given_no_local_config_when_load_then_defaults() {
    let dir = TempDir::new().unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert!(settings.kinds.contains_key("group"));
    assert!(settings.kinds.contains_key("series"));
}

#[test]
fn given_local_config_with_kind_when_load_then_unions_with_current() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let local = r#"
[kinds.area]
base = "series"
traits = ["filled"]
"#;
    fs::write(local_config_path(dir.path()), local).unwrap();

    // Act
    let settings = Settings::load(Some(dir.path())).expect("load settings");

    // Assert
    assert!(settings.kinds.contains_key("series"), "keeps inherited kind");
    let area = &settings.kinds["area"];
    assert_eq!(area.base.as_deref(), Some("series"));
    assert_eq!(area.traits, vec!["filled"]);
}

#[test]
fn given_local_config_with_negation_when_load_then_removes_kind() {
    // Arrange
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "[kinds.\"!axis\"]\n").unwrap();

    // Act
    let settings = Settings::load(Some(dir.path())).expect("load settings");

    // Assert
    assert!(!settings.kinds.contains_key("axis"));
    assert!(!settings.kinds.contains_key("!axis"));
}

#[test]
fn given_local_scalars_when_load_then_override_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "max_sync_depth = 32\ndefault_kind = \"group\"\n",
    )
    .unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.max_sync_depth, 32);
    assert_eq!(settings.default_kind.as_deref(), Some("group"));
}

#[test]
fn given_malformed_local_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "max_sync_depth = \"deep\"\n").unwrap();

    let result = Settings::load(Some(dir.path()));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_zero_depth_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "max_sync_depth = 0\n").unwrap();

    let result = Settings::load(Some(dir.path()));

    assert!(matches!(result, Err(ApplicationError::Config { message }) if message.contains("max_sync_depth")));
}
