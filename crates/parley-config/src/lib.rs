//! Parley configuration system.
//!
//! Provides TOML-based configuration with validation. All config sections
//! use defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use parley_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{LogLevel, ParleyConfig, CONFIG_SCHEMA_VERSION};
pub use toml_loader::{default_config_path, load_from_path};

use parley_common::ConfigError;

/// Load config from the platform default path, creating it when missing.
pub fn load_config() -> Result<ParleyConfig, ConfigError> {
    toml_loader::load_default()
}

/// Serialize a config to pretty JSON with the access token masked.
pub fn config_to_json(config: &ParleyConfig) -> String {
    let mut masked = config.clone();
    if masked.identity.access_token.is_some() {
        masked.identity.access_token = Some("[REDACTED]".into());
    }
    serde_json::to_string_pretty(&masked)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let json = config_to_json(&ParleyConfig::default());
        for section in [
            "\"identity\"",
            "\"signaling\"",
            "\"registry\"",
            "\"chat\"",
            "\"call\"",
            "\"media\"",
            "\"logging\"",
        ] {
            assert!(json.contains(section), "missing {section}");
        }
    }

    #[test]
    fn config_to_json_masks_token() {
        let mut config = ParleyConfig::default();
        config.identity.access_token = Some("secret-token".into());
        let json = config_to_json(&config);
        assert!(!json.contains("secret-token"));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let json = config_to_json(&ParleyConfig::default());
        let parsed: ParleyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.signaling.heartbeat_interval_secs, 25);
        assert_eq!(parsed.logging.level, LogLevel::Info);
    }
}
