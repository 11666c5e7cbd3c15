//! reqwest implementation of [`SessionRegistry`].

use std::time::Duration;

use async_trait::async_trait;
use parley_common::{CallId, PersistenceError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::chat::{Message, MessageKind};

use super::{CallRecord, SessionRegistry};

/// Configuration for the HTTP registry client.
#[derive(Clone)]
pub struct RegistryConfig {
    /// Base URL of the REST API, without trailing slash.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            access_token: None,
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Responses may come bare or wrapped as `{"data": ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(inner) => inner,
        }
    }
}

pub struct HttpRegistry {
    config: RegistryConfig,
    http: reqwest::Client,
}

impl HttpRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self, PersistenceError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PersistenceError::Network(e.to_string()))?;
        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PersistenceError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| PersistenceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = text.chars().take(200).collect::<String>();
            return Err(PersistenceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PersistenceError> {
        let response = self.execute(request).await?;
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| PersistenceError::Decode(e.to_string()))?;
        Ok(envelope.into_inner())
    }
}

#[async_trait]
impl SessionRegistry for HttpRegistry {
    async fn create_call(&self, remote_user_id: &str) -> Result<CallRecord, PersistenceError> {
        debug!(peer = remote_user_id, "Creating call record");
        let body = serde_json::json!({ "receiverId": remote_user_id });
        self.execute_json(self.http.post(self.url("/calls")).json(&body))
            .await
    }

    async fn join_call(&self, call_id: &CallId) -> Result<(), PersistenceError> {
        debug!(call_id = %call_id, "Joining call record");
        self.execute(self.http.post(self.url(&format!("/calls/{call_id}/join"))))
            .await
            .map(|_| ())
    }

    async fn end_call(&self, call_id: &CallId) -> Result<(), PersistenceError> {
        debug!(call_id = %call_id, "Ending call record");
        self.execute(self.http.post(self.url(&format!("/calls/{call_id}/end"))))
            .await
            .map(|_| ())
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<Message, PersistenceError> {
        let body = serde_json::json!({
            "content": content,
            "messageType": MessageKind::Text,
        });
        self.execute_json(
            self.http
                .post(self.url(&format!("/conversations/{conversation_id}/messages")))
                .json(&body),
        )
        .await
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, PersistenceError> {
        self.execute_json(
            self.http
                .get(self.url(&format!("/conversations/{conversation_id}/messages"))),
        )
        .await
    }

    async fn mark_read(&self, conversation_id: &str) -> Result<(), PersistenceError> {
        self.execute(
            self.http
                .put(self.url(&format!("/conversations/{conversation_id}/read"))),
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_accepts_wrapped_and_bare() {
        let wrapped: Envelope<CallRecord> =
            serde_json::from_str(r#"{"data":{"id":"c1","roomHint":"r"}}"#).unwrap();
        let bare: Envelope<CallRecord> = serde_json::from_str(r#"{"id":"c1","roomId":"r"}"#).unwrap();
        assert_eq!(wrapped.into_inner(), bare.into_inner());
    }

    #[test]
    fn url_joins_without_double_slash() {
        let registry = HttpRegistry::new(RegistryConfig {
            base_url: "https://api.example.com/v1/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            registry.url("/calls"),
            "https://api.example.com/v1/calls"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let config = RegistryConfig {
            access_token: Some("secret-token".into()),
            ..Default::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let registry = HttpRegistry::new(RegistryConfig {
            base_url: format!("http://{addr}"),
            request_timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();
        let err = registry.list_messages("conv").await.unwrap_err();
        assert!(matches!(err, PersistenceError::Network(_)));
    }
}
