use serde::{Deserialize, Serialize};

/// The local user and the credentials used for the signaling channel and
/// the registry.
#[derive(Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Access token presented to the signaling server and the registry.
    #[serde(skip)]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Identity {
    pub fn new(user_id: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            access_token,
        }
    }

    /// The token, if present and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_token() {
        let identity = Identity::new("u1", Some("jwt-secret".into()));
        let rendered = format!("{identity:?}");
        assert!(rendered.contains("u1"));
        assert!(!rendered.contains("jwt-secret"));
    }

    #[test]
    fn empty_token_counts_as_missing() {
        assert!(Identity::new("u1", Some(String::new())).token().is_none());
        assert!(Identity::new("u1", None).token().is_none());
        assert_eq!(Identity::new("u1", Some("t".into())).token(), Some("t"));
    }

    #[test]
    fn token_is_not_serialized() {
        let identity = Identity::new("u1", Some("jwt-secret".into()));
        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("jwt-secret"));
    }
}
