use super::helpers::{validate_range, validate_scheme};
use crate::schema::ParleyConfig;

pub(crate) fn validate_chat(errors: &mut Vec<String>, config: &ParleyConfig) {
    validate_range(
        errors,
        "chat.typing_idle_ms",
        config.chat.typing_idle_ms,
        500,
        30_000,
    );
}

pub(crate) fn validate_call(errors: &mut Vec<String>, config: &ParleyConfig) {
    validate_range(
        errors,
        "call.ice_candidate_buffer",
        config.call.ice_candidate_buffer,
        0,
        1024,
    );
}

pub(crate) fn validate_media(errors: &mut Vec<String>, config: &ParleyConfig) {
    for (i, server) in config.media.ice_servers.iter().enumerate() {
        if server.is_empty() {
            errors.push(format!("media.ice_servers[{i}] is empty"));
            continue;
        }
        validate_scheme(
            errors,
            &format!("media.ice_servers[{i}]"),
            server,
            &["stun:", "stuns:", "turn:", "turns:"],
        );
    }
}
