//! Unit tests for config module
//!
//! Defaults, partial files and validation. No filesystem access.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use crate::{
    AppError,
    config::{BridgeConfig, Config, LogLevel},
};

#[test]
fn config_default() {
    let config = Config::default();

    assert_eq!(config.general.log_level, LogLevel::Info);
    assert_eq!(config.bridge.time_update_interval_ms, 500);
    assert_eq!(config.bridge.item_debounce_ms, 100);
    assert!(config.bridge.enabled);
}

#[test]
fn config_serialize_toml() {
    let toml_str = Config::default().to_toml_string().unwrap();

    assert!(toml_str.contains("[general]"));
    assert!(toml_str.contains("[bridge]"));
    assert!(toml_str.contains("time_update_interval_ms = 500"));
}

#[test]
fn config_serialize_roundtrip() {
    let original = Config {
        bridge: BridgeConfig {
            time_update_interval_ms: 250,
            item_debounce_ms: 40,
            enabled: false,
        },
        ..Config::default()
    };

    let toml_str = original.to_toml_string().unwrap();
    assert_eq!(Config::from_toml_str(&toml_str).unwrap(), original);
}

#[test]
fn config_empty_toml() {
    assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
}

#[test]
fn config_partial_section_keeps_other_defaults() {
    let config = Config::from_toml_str(
        r#"
        [general]
        log_level = "debug"

        [bridge]
        item_debounce_ms = 250
    "#,
    )
    .unwrap();

    assert_eq!(config.general.log_level, LogLevel::Debug);
    assert_eq!(config.bridge.item_debounce_ms, 250);
    assert_eq!(config.bridge.time_update_interval_ms, 500);
    assert!(config.bridge.enabled);
}

#[test]
fn config_invalid_log_level() {
    let err = Config::from_toml_str("[general]\nlog_level = \"loud\"").unwrap_err();
    assert!(matches!(err, AppError::TomlParseError { ref location, .. } if location == "string"));
}

#[test]
fn config_zero_interval_rejected() {
    let err = Config::from_toml_str("[bridge]\ntime_update_interval_ms = 0").unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidConfigField { ref field, .. } if field == "bridge.time_update_interval_ms"
    ));
}

#[test]
fn bridge_settings_conversion() {
    let settings = BridgeConfig::default().settings().unwrap();

    assert_eq!(settings.time_update_interval, Duration::from_millis(500));
    assert_eq!(settings.item_debounce, Duration::from_millis(100));
}

#[test]
fn log_level_display_matches_serde() {
    for level in [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ] {
        let rendered = toml::Value::try_from(level).unwrap();
        assert_eq!(rendered.as_str(), Some(level.to_string().as_str()));
    }
}
