use super::helpers::{validate_range, validate_scheme};
use crate::schema::ParleyConfig;

pub(crate) fn validate_signaling(errors: &mut Vec<String>, config: &ParleyConfig) {
    let signaling = &config.signaling;
    validate_scheme(errors, "signaling.url", &signaling.url, &["ws://", "wss://"]);
    validate_range(
        errors,
        "signaling.connect_timeout_secs",
        signaling.connect_timeout_secs,
        1,
        120,
    );
    validate_range(
        errors,
        "signaling.heartbeat_interval_secs",
        signaling.heartbeat_interval_secs,
        5,
        300,
    );
    validate_range(
        errors,
        "signaling.max_reconnect_attempts",
        signaling.max_reconnect_attempts,
        0,
        50,
    );
    if signaling.reconnect_delay_ms == 0 {
        errors.push("signaling.reconnect_delay_ms must be greater than 0".into());
    }
    if signaling.max_reconnect_delay_ms < signaling.reconnect_delay_ms {
        errors.push(format!(
            "signaling.max_reconnect_delay_ms = {} is below reconnect_delay_ms = {}",
            signaling.max_reconnect_delay_ms, signaling.reconnect_delay_ms
        ));
    }
}

pub(crate) fn validate_registry(errors: &mut Vec<String>, config: &ParleyConfig) {
    validate_scheme(
        errors,
        "registry.base_url",
        &config.registry.base_url,
        &["http://", "https://"],
    );
    validate_range(
        errors,
        "registry.request_timeout_secs",
        config.registry.request_timeout_secs,
        1,
        120,
    );
}
