use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures of the signaling channel itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalingError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },
}

/// Camera/microphone could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaAccessError {
    #[error("no camera or microphone found: {0}")]
    NoDevice(String),

    #[error("camera/microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("media device unavailable: {0}")]
    Unavailable(String),
}

/// Offer/answer/candidate processing failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("negotiation failed: {0}")]
pub struct NegotiationError(pub String);

impl NegotiationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// A write or read against the session registry failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("registry request failed: {0}")]
    Network(String),

    #[error("registry returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid registry response: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Signaling(#[from] SignalingError),

    #[error(transparent)]
    Media(#[from] MediaAccessError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("call error: {0}")]
    Call(String),

    #[error("chat error: {0}")]
    Chat(String),

    #[error("{0}")]
    Other(String),
}
