//! Local capture and peer transport lifecycle for one call session.

use std::sync::Arc;

use parley_common::{CallId, MediaAccessError, NegotiationError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::{
    CaptureDevices, CaptureView, DeviceError, LocalTrack, MediaConfig, MediaConstraints,
    MediaHandles, PeerTransport, RemoteStream, RemoteTrack, TrackKind, TransportEvent,
    TransportFactory,
};
use crate::protocol::OutboundEvent;
use crate::signaling::SignalSender;

/// Transport callbacks tagged with the id of the transport that produced
/// them, so events from a replaced transport can be told apart.
pub type TaggedTransportEvent = (u64, TransportEvent);

fn access_error(error: DeviceError) -> MediaAccessError {
    match error {
        DeviceError::NotFound => MediaAccessError::NoDevice(error.to_string()),
        DeviceError::PermissionDenied => MediaAccessError::PermissionDenied(error.to_string()),
        DeviceError::Busy | DeviceError::Other(_) => {
            MediaAccessError::Unavailable(error.to_string())
        }
    }
}

struct ActiveTransport {
    id: u64,
    peer: Arc<dyn PeerTransport>,
    forwarder: JoinHandle<()>,
}

/// Owns the local capture and at most one peer transport.
pub struct MediaPipeline {
    config: MediaConfig,
    devices: Arc<dyn CaptureDevices>,
    transports: Arc<dyn TransportFactory>,
    capture: Option<Vec<Arc<dyn LocalTrack>>>,
    transport: Option<ActiveTransport>,
    remote_tracks: Vec<RemoteTrack>,
    next_transport_id: u64,
    audio_muted: bool,
    video_suspended: bool,
}

impl MediaPipeline {
    pub fn new(
        config: MediaConfig,
        devices: Arc<dyn CaptureDevices>,
        transports: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            config,
            devices,
            transports,
            capture: None,
            transport: None,
            remote_tracks: Vec::new(),
            next_transport_id: 1,
            audio_muted: false,
            video_suspended: false,
        }
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    // -- Capture --------------------------------------------------------------

    /// Open local capture. When video was requested and fails, retries
    /// audio-only once. Reuses an existing capture.
    pub async fn acquire(&mut self, constraints: MediaConstraints) -> Result<(), MediaAccessError> {
        if self.capture.is_some() {
            debug!("Reusing local capture");
            return Ok(());
        }

        let tracks = match self.devices.open(constraints).await {
            Ok(tracks) => tracks,
            Err(first) if constraints.video && self.config.audio_fallback => {
                warn!(error = %first, "Camera capture failed, falling back to audio only");
                self.devices
                    .open(MediaConstraints::AUDIO_ONLY)
                    .await
                    .map_err(access_error)?
            }
            Err(e) => return Err(access_error(e)),
        };

        info!(tracks = tracks.len(), "Local media acquired");
        self.capture = Some(tracks);
        self.audio_muted = false;
        self.video_suspended = false;
        Ok(())
    }

    /// Stop every local track. Returns false when nothing was held.
    pub fn release(&mut self) -> bool {
        let Some(tracks) = self.capture.take() else {
            return false;
        };
        for track in &tracks {
            track.stop();
        }
        self.audio_muted = false;
        self.video_suspended = false;
        info!(tracks = tracks.len(), "Local media released");
        true
    }

    pub fn has_capture(&self) -> bool {
        self.capture.is_some()
    }

    // -- Transport ------------------------------------------------------------

    /// Replace any existing transport with a fresh one carrying the local
    /// tracks. Local candidates go straight to `call:ice-candidate`; every
    /// other transport event is forwarded to `session_tx`.
    pub async fn build_transport(
        &mut self,
        remote_user_id: &str,
        call_id: &CallId,
        signaling: Arc<dyn SignalSender>,
        session_tx: mpsc::UnboundedSender<TaggedTransportEvent>,
    ) -> Result<(u64, Arc<dyn PeerTransport>), NegotiationError> {
        self.close_transport().await;

        let id = self.next_transport_id;
        self.next_transport_id += 1;

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let peer = self
            .transports
            .create(&self.config.ice_servers, events_tx)
            .await?;

        for track in self.capture.iter().flatten() {
            if let Err(e) = peer.add_track(Arc::clone(track)).await {
                peer.close().await;
                return Err(e);
            }
        }

        let to = remote_user_id.to_string();
        let call_id = call_id.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                match event {
                    TransportEvent::LocalCandidate(candidate) => {
                        signaling.send(&OutboundEvent::CallIceCandidate {
                            to: to.clone(),
                            candidate,
                            call_id: call_id.clone(),
                        });
                    }
                    other => {
                        if session_tx.send((id, other)).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        debug!(transport = id, peer = %remote_user_id, "Transport built");
        self.transport = Some(ActiveTransport {
            id,
            peer: Arc::clone(&peer),
            forwarder,
        });
        Ok((id, peer))
    }

    /// Close the transport and forget received remote tracks. Returns
    /// false when there was no transport.
    pub async fn close_transport(&mut self) -> bool {
        self.remote_tracks.clear();
        let Some(active) = self.transport.take() else {
            return false;
        };
        active.forwarder.abort();
        active.peer.close().await;
        debug!(transport = active.id, "Transport closed");
        true
    }

    /// Close the transport only if it is still the one identified by `id`.
    pub async fn close_transport_if(&mut self, id: u64) -> bool {
        if self.transport_id() == Some(id) {
            self.close_transport().await
        } else {
            false
        }
    }

    pub fn transport_id(&self) -> Option<u64> {
        self.transport.as_ref().map(|t| t.id)
    }

    pub fn transport(&self) -> Option<Arc<dyn PeerTransport>> {
        self.transport.as_ref().map(|t| Arc::clone(&t.peer))
    }

    /// Record an inbound track from the transport identified by `id`.
    pub fn add_remote_track(&mut self, id: u64, track: RemoteTrack) -> bool {
        if self.transport_id() != Some(id) {
            return false;
        }
        if !self.remote_tracks.iter().any(|t| t.id == track.id) {
            self.remote_tracks.push(track);
        }
        true
    }

    // -- Controls -------------------------------------------------------------

    /// Flip the microphone. Returns the new muted state, or `None` without
    /// local audio.
    pub fn toggle_mute(&mut self) -> Option<bool> {
        let muted = !self.audio_muted;
        if !self.set_kind_enabled(TrackKind::Audio, !muted) {
            return None;
        }
        self.audio_muted = muted;
        Some(muted)
    }

    /// Flip the camera. Returns the new suspended state, or `None` without
    /// local video.
    pub fn toggle_video(&mut self) -> Option<bool> {
        let suspended = !self.video_suspended;
        if !self.set_kind_enabled(TrackKind::Video, !suspended) {
            return None;
        }
        self.video_suspended = suspended;
        Some(suspended)
    }

    fn set_kind_enabled(&self, kind: TrackKind, enabled: bool) -> bool {
        let mut touched = false;
        for track in self.capture.iter().flatten().filter(|t| t.kind() == kind) {
            track.set_enabled(enabled);
            touched = true;
        }
        touched
    }

    /// Snapshot for consumers. The remote stream is only exposed while the
    /// call is connected.
    pub fn handles(&self, connected: bool) -> MediaHandles {
        let local_capture = self.capture.as_ref().map(|tracks| CaptureView {
            track_ids: tracks.iter().map(|t| t.id().to_string()).collect(),
            has_audio: tracks.iter().any(|t| t.kind() == TrackKind::Audio),
            has_video: tracks.iter().any(|t| t.kind() == TrackKind::Video),
        });
        let remote_stream = (connected && !self.remote_tracks.is_empty()).then(|| RemoteStream {
            tracks: self.remote_tracks.clone(),
        });
        MediaHandles {
            local_capture,
            remote_stream,
            is_audio_muted: self.audio_muted,
            is_video_suspended: self.video_suspended,
        }
    }
}
