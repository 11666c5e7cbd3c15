//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    let config = ParleyConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn accepts_real_endpoints() {
    let mut config = ParleyConfig::default();
    config.signaling.url = "wss://signal.example.com/ws".into();
    config.registry.base_url = "https://api.example.com".into();
    config.media.ice_servers = vec!["turn:turn.example.com:3478".into()];
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_http_signaling_url() {
    let mut config = ParleyConfig::default();
    config.signaling.url = "https://signal.example.com".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("signaling.url"));
}

#[test]
fn catches_bare_scheme() {
    let mut config = ParleyConfig::default();
    config.registry.base_url = "https://".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("registry.base_url"));
}

#[test]
fn catches_heartbeat_too_fast() {
    let mut config = ParleyConfig::default();
    config.signaling.heartbeat_interval_secs = 1;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("signaling.heartbeat_interval_secs"));
}

#[test]
fn catches_inverted_backoff() {
    let mut config = ParleyConfig::default();
    config.signaling.reconnect_delay_ms = 5000;
    config.signaling.max_reconnect_delay_ms = 1000;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("signaling.max_reconnect_delay_ms"));
}

#[test]
fn catches_typing_idle_too_short() {
    let mut config = ParleyConfig::default();
    config.chat.typing_idle_ms = 10;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("chat.typing_idle_ms"));
}

#[test]
fn catches_bad_ice_server() {
    let mut config = ParleyConfig::default();
    config.media.ice_servers = vec!["stun:ok.example.com".into(), "http://nope".into(), String::new()];
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("media.ice_servers[1]"));
    assert!(err.contains("media.ice_servers[2] is empty"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = ParleyConfig::default();
    config.signaling.connect_timeout_secs = 0;
    config.registry.request_timeout_secs = 500;
    config.call.ice_candidate_buffer = 5000;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("signaling.connect_timeout_secs"));
    assert!(err.contains("registry.request_timeout_secs"));
    assert!(err.contains("call.ice_candidate_buffer"));
}
