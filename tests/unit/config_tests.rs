use std::time::Duration;

use agent_hub::{config::GlobalConfig, AppError};

fn sample_toml() -> &'static str {
    r#"
host = "0.0.0.0"
http_port = 9100
cors_allowed_origins = ["http://localhost:5173"]

[session]
send_queue_capacity = 64
send_timeout_ms = 500
heartbeat_interval_seconds = 10
idle_timeout_seconds = 25
"#
}

#[test]
fn parses_valid_config() {
    let config = GlobalConfig::from_toml_str(sample_toml()).expect("config parses");

    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.http_port, 9100);
    assert_eq!(config.cors_allowed_origins, vec!["http://localhost:5173"]);
    assert_eq!(config.session.send_queue_capacity, 64);
    assert_eq!(config.session.send_timeout(), Duration::from_millis(500));
    assert_eq!(config.session.heartbeat_interval(), Duration::from_secs(10));
    assert_eq!(config.session.idle_timeout(), Duration::from_secs(25));
}

#[test]
fn empty_config_uses_defaults() {
    let config = GlobalConfig::from_toml_str("").expect("empty config parses");

    assert_eq!(config, GlobalConfig::default());
    assert_eq!(config.http_port, 8000);
    assert_eq!(config.cors_allowed_origins, vec!["*"]);
    assert_eq!(config.session.send_queue_capacity, 256);
    assert_eq!(config.session.send_timeout_ms, 2000);
    assert_eq!(config.session.heartbeat_interval_seconds, 30);
    assert_eq!(config.session.idle_timeout_seconds, 90);
}

#[test]
fn partial_session_table_keeps_other_defaults() {
    let config = GlobalConfig::from_toml_str(
        r"
[session]
send_timeout_ms = 100
",
    )
    .expect("config parses");

    assert_eq!(config.session.send_timeout_ms, 100);
    assert_eq!(config.session.send_queue_capacity, 256);
}

#[test]
fn bind_addr_combines_host_and_port() {
    let config = GlobalConfig::from_toml_str(sample_toml()).expect("config parses");
    let addr = config.bind_addr().expect("valid addr");
    assert_eq!(addr.to_string(), "0.0.0.0:9100");
}

#[test]
fn rejects_hostname_that_is_not_an_ip() {
    let result = GlobalConfig::from_toml_str(r#"host = "localhost""#);
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn rejects_zero_queue_capacity() {
    let result = GlobalConfig::from_toml_str(
        r"
[session]
send_queue_capacity = 0
",
    );
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn rejects_zero_send_timeout() {
    let result = GlobalConfig::from_toml_str(
        r"
[session]
send_timeout_ms = 0
",
    );
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn rejects_idle_timeout_not_above_heartbeat() {
    let result = GlobalConfig::from_toml_str(
        r"
[session]
heartbeat_interval_seconds = 30
idle_timeout_seconds = 30
",
    );
    let err = result.expect_err("idle timeout must exceed heartbeat");
    assert!(err.to_string().contains("idle_timeout_seconds"));
}

#[test]
fn rejects_invalid_toml() {
    let result = GlobalConfig::from_toml_str("http_port = \"not a number\"");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn loads_from_path() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("hub.toml");
    std::fs::write(&path, sample_toml()).expect("write config");

    let config = GlobalConfig::load_from_path(&path).expect("config loads");
    assert_eq!(config.http_port, 9100);
}

#[test]
fn missing_file_is_config_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let result = GlobalConfig::load_from_path(temp.path().join("absent.toml"));
    assert!(matches!(result, Err(AppError::Config(_))));
}
