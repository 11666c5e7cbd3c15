//! Maps the config file onto the session runtime configs.

use std::time::Duration;

use parley_common::ParleyError;
use parley_config::ParleyConfig;
use parley_session::{ChatConfig, Identity, RegistryConfig, SignalingConfig};

/// Everything a command needs to talk to the servers.
#[derive(Debug, Clone)]
pub struct Settings {
    pub identity: Identity,
    pub signaling: SignalingConfig,
    pub registry: RegistryConfig,
    pub chat: ChatConfig,
}

impl Settings {
    pub fn from_config(config: &ParleyConfig) -> Self {
        let identity = Identity {
            user_id: config.identity.user_id.clone(),
            display_name: config.identity.display_name.clone(),
            access_token: config.identity.access_token.clone(),
        };

        let s = &config.signaling;
        let signaling = SignalingConfig {
            url: s.url.clone(),
            connect_timeout: Duration::from_secs(s.connect_timeout_secs.into()),
            heartbeat_interval: Duration::from_secs(s.heartbeat_interval_secs.into()),
            reconnect_delay: Duration::from_millis(s.reconnect_delay_ms.into()),
            max_reconnect_delay: Duration::from_millis(s.max_reconnect_delay_ms.into()),
            max_reconnect_attempts: s.max_reconnect_attempts,
        };

        let registry = RegistryConfig {
            base_url: config.registry.base_url.clone(),
            access_token: config.identity.access_token.clone(),
            request_timeout: Duration::from_secs(config.registry.request_timeout_secs.into()),
        };

        let chat = ChatConfig {
            typing_idle: Duration::from_millis(config.chat.typing_idle_ms.into()),
        };

        Self {
            identity,
            signaling,
            registry,
            chat,
        }
    }

    /// Fail early with the config key that is missing.
    pub fn require(&self, signaling: bool, registry: bool) -> Result<(), ParleyError> {
        let mut missing = Vec::new();
        if self.identity.user_id.is_empty() {
            missing.push("identity.user_id");
        }
        if signaling && self.signaling.url.is_empty() {
            missing.push("signaling.url");
        }
        if registry && self.registry.base_url.is_empty() {
            missing.push("registry.base_url");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ParleyError::Other(format!(
                "missing config values: {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_follow_units() {
        let mut config = ParleyConfig::default();
        config.signaling.reconnect_delay_ms = 250;
        config.chat.typing_idle_ms = 1500;
        let settings = Settings::from_config(&config);

        assert_eq!(settings.signaling.connect_timeout, Duration::from_secs(10));
        assert_eq!(settings.signaling.reconnect_delay, Duration::from_millis(250));
        assert_eq!(settings.signaling.max_reconnect_delay, Duration::from_secs(30));
        assert_eq!(settings.chat.typing_idle, Duration::from_millis(1500));
        assert_eq!(settings.registry.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn token_reaches_signaling_and_registry() {
        let mut config = ParleyConfig::default();
        config.identity.user_id = "u1".into();
        config.identity.access_token = Some("tok".into());
        let settings = Settings::from_config(&config);

        assert_eq!(settings.identity.token(), Some("tok"));
        assert_eq!(settings.registry.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn require_names_missing_keys() {
        let settings = Settings::from_config(&ParleyConfig::default());
        let err = settings.require(true, true).unwrap_err().to_string();
        assert!(err.contains("identity.user_id"));
        assert!(err.contains("signaling.url"));
        assert!(err.contains("registry.base_url"));

        let mut config = ParleyConfig::default();
        config.identity.user_id = "u1".into();
        config.registry.base_url = "https://api.example.com".into();
        assert!(Settings::from_config(&config).require(false, true).is_ok());
    }
}
