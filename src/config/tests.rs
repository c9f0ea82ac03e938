use crate::config::{ConfigError, FlipConfig, LogLevel};

#[test]
fn empty_object_uses_defaults() {
    let config = FlipConfig::parse("{}").unwrap();
    assert_eq!(config, FlipConfig::default());
    assert!(config.async_flips);
    assert_eq!(config.max_pending_sequences, 1024);
    assert_eq!(config.max_idle_retries, 4);
}

#[test]
fn overrides() {
    let config = FlipConfig::parse(
        r#"{
            "async_flips": false,
            "max_pending_sequences": 8,
            "max_idle_retries": 0,
            "log_level": "debug"
        }"#,
    )
    .unwrap();
    assert!(!config.async_flips);
    assert_eq!(config.max_pending_sequences, 8);
    assert_eq!(config.max_idle_retries, 0);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(log::Level::from(config.log_level), log::Level::Debug);
}

#[test]
fn unknown_field() {
    let res = FlipConfig::parse(r#"{ "retries": 3 }"#);
    assert!(matches!(res, Err(ConfigError::Parse(_))));
}

#[test]
fn invalid_level() {
    let res = FlipConfig::parse(r#"{ "log_level": "loud" }"#);
    assert!(matches!(res, Err(ConfigError::Parse(_))));
}

#[test]
fn missing_file() {
    let res = FlipConfig::load("/nonexistent/jay-flip.json".as_ref());
    assert!(matches!(res, Err(ConfigError::Read(_))));
}
