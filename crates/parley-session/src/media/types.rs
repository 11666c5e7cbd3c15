//! Media capture and transport abstractions.
//!
//! Camera/microphone access and the negotiated peer transport are platform
//! services; the call session reaches them only through these traits.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parley_common::NegotiationError;
use tokio::sync::mpsc;

use crate::protocol::IceCandidate;

// ---------------------------------------------------------------------------
// Local capture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// A captured local track (one microphone or camera stream).
pub trait LocalTrack: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    /// Enable or disable the track in place. Disabled tracks keep their
    /// transport slot and send silence/black frames.
    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Stop capturing. Idempotent.
    fn stop(&self);
}

/// What to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl MediaConstraints {
    pub const AUDIO_VIDEO: Self = Self {
        audio: true,
        video: true,
    };
    pub const AUDIO_ONLY: Self = Self {
        audio: true,
        video: false,
    };
}

/// Failure reported by the capture backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("no capture device found")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("device busy")]
    Busy,
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait CaptureDevices: Send + Sync {
    /// Open the requested devices. Returns every captured track.
    async fn open(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Vec<Arc<dyn LocalTrack>>, DeviceError>;
}

// ---------------------------------------------------------------------------
// Peer transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Connectivity state reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// A track received from the remote party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: TrackKind,
}

/// Callbacks from a transport, delivered through the channel handed to
/// [`TransportFactory::create`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    LocalCandidate(IceCandidate),
    RemoteTrack(RemoteTrack),
    StateChanged(TransportState),
}

/// The negotiated audio/video transport for one call.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn add_track(&self, track: Arc<dyn LocalTrack>) -> Result<(), NegotiationError>;

    async fn create_offer(&self) -> Result<String, NegotiationError>;

    async fn create_answer(&self) -> Result<String, NegotiationError>;

    async fn set_local_description(&self, kind: SdpKind, sdp: &str)
        -> Result<(), NegotiationError>;

    async fn set_remote_description(
        &self,
        kind: SdpKind,
        sdp: &str,
    ) -> Result<(), NegotiationError>;

    async fn add_ice_candidate(&self, candidate: &IceCandidate) -> Result<(), NegotiationError>;

    /// Close the transport. Idempotent.
    async fn close(&self);
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        ice_servers: &[String],
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>, NegotiationError>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Request the camera in addition to the microphone.
    pub video: bool,
    /// Retry audio-only once when audio+video capture fails.
    pub audio_fallback: bool,
    /// STUN/TURN URLs handed to the transport factory.
    pub ice_servers: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            video: true,
            audio_fallback: true,
            ice_servers: vec!["stun:stun.l.google.com:19302".to_string()],
        }
    }
}

impl MediaConfig {
    pub fn constraints(&self) -> MediaConstraints {
        MediaConstraints {
            audio: true,
            video: self.video,
        }
    }
}

// ---------------------------------------------------------------------------
// Read-only views
// ---------------------------------------------------------------------------

/// What the local capture currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureView {
    pub track_ids: Vec<String>,
    pub has_audio: bool,
    pub has_video: bool,
}

/// Tracks received from the remote party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub tracks: Vec<RemoteTrack>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaHandles {
    pub local_capture: Option<CaptureView>,
    /// Present only while connected and at least one track arrived.
    pub remote_stream: Option<RemoteStream>,
    pub is_audio_muted: bool,
    pub is_video_suspended: bool,
}
