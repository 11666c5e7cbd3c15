//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Parley Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[identity]
# user_id = ""
# display_name = "Ada"
# access_token = ""            # sent to the signaling server and the registry

[signaling]
# url = "wss://signal.example.com/ws"
# connect_timeout_secs = 10       # 1-120
# heartbeat_interval_secs = 25    # 5-300
# reconnect_delay_ms = 1000       # doubles per attempt
# max_reconnect_delay_ms = 30000
# max_reconnect_attempts = 5      # 0-50

[registry]
# base_url = "https://api.example.com"
# request_timeout_secs = 15       # 1-120

[chat]
# typing_idle_ms = 3000           # 500-30000

[call]
# ice_candidate_buffer = 64       # 0-1024

[media]
# video = true
# audio_fallback = true           # retry audio-only when the camera fails
# ice_servers = ["stun:stun.l.google.com:19302"]

[logging]
# level = "info"                  # trace, debug, info, warn, error
"##
    .to_string()
}
