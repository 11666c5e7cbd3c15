//! In-memory fakes for the session collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;
use parley_common::{CallId, NegotiationError, PersistenceError};
use tokio::sync::{mpsc, Notify};

use crate::chat::{Message, MessageKind, SenderRole};
use crate::media::{
    CaptureDevices, DeviceError, LocalTrack, MediaConstraints, PeerTransport, SdpKind, TrackKind,
    TransportEvent, TransportFactory,
};
use crate::protocol::{IceCandidate, OutboundEvent};
use crate::registry::{CallRecord, SessionRegistry};
use crate::signaling::SignalSender;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub(crate) struct FakeRegistry {
    local_user_id: String,
    calls: Mutex<Vec<String>>,
    failing: AtomicBool,
    counter: AtomicU64,
    stored: Mutex<HashMap<String, Vec<Message>>>,
}

impl FakeRegistry {
    pub(crate) fn new(local_user_id: &str) -> Self {
        Self {
            local_user_id: local_user_id.to_string(),
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            counter: AtomicU64::new(0),
            stored: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every request made so far, as `"operation:argument"`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn seed(&self, conversation_id: &str, messages: Vec<Message>) {
        self.stored
            .lock()
            .unwrap()
            .insert(conversation_id.to_string(), messages);
    }

    fn record(&self, call: String) -> Result<u64, PersistenceError> {
        self.calls.lock().unwrap().push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl SessionRegistry for FakeRegistry {
    async fn create_call(&self, remote_user_id: &str) -> Result<CallRecord, PersistenceError> {
        let n = self.record(format!("create_call:{remote_user_id}"))?;
        Ok(CallRecord {
            id: CallId::new(format!("call-{n}")),
            room_hint: Some(format!("room-{n}")),
        })
    }

    async fn join_call(&self, call_id: &CallId) -> Result<(), PersistenceError> {
        self.record(format!("join_call:{call_id}")).map(drop)
    }

    async fn end_call(&self, call_id: &CallId) -> Result<(), PersistenceError> {
        self.record(format!("end_call:{call_id}")).map(drop)
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<Message, PersistenceError> {
        let n = self.record(format!("create_message:{conversation_id}"))?;
        Ok(message(
            &format!("msg-{n}"),
            conversation_id,
            &self.local_user_id,
            content,
            Some(1_700_000_000 + n as i64),
        ))
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, PersistenceError> {
        self.record(format!("list_messages:{conversation_id}"))?;
        Ok(self
            .stored
            .lock()
            .unwrap()
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn mark_read(&self, conversation_id: &str) -> Result<(), PersistenceError> {
        self.record(format!("mark_read:{conversation_id}")).map(drop)
    }
}

/// Build a text message with an optional epoch-seconds timestamp.
pub(crate) fn message(
    id: &str,
    conversation_id: &str,
    sender_id: &str,
    content: &str,
    secs: Option<i64>,
) -> Message {
    Message {
        id: id.to_string(),
        conversation_id: conversation_id.to_string(),
        sender_id: sender_id.to_string(),
        sender_role: SenderRole::Candidate,
        content: content.to_string(),
        created_at: secs.and_then(|s| DateTime::from_timestamp(s, 0)),
        is_read: false,
        message_type: MessageKind::Text,
        file_url: None,
    }
}

// ---------------------------------------------------------------------------
// Signaling
// ---------------------------------------------------------------------------

pub(crate) struct RecordingSignals {
    connected: AtomicBool,
    sent: Mutex<Vec<OutboundEvent>>,
}

impl RecordingSignals {
    pub(crate) fn connected() -> Self {
        Self {
            connected: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn disconnected() -> Self {
        let signals = Self::connected();
        signals.set_connected(false);
        signals
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub(crate) fn sent(&self) -> Vec<OutboundEvent> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_names(&self) -> Vec<&'static str> {
        self.sent().iter().map(OutboundEvent::name).collect()
    }
}

impl SignalSender for RecordingSignals {
    fn send(&self, event: &OutboundEvent) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.sent.lock().unwrap().push(event.clone());
        true
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) struct FakeTrack {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl FakeTrack {
    fn new(id: String, kind: TrackKind) -> Self {
        Self {
            id,
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl LocalTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct FakeDevices {
    video_error: Option<DeviceError>,
    audio_error: Option<DeviceError>,
    gate: Option<Arc<Notify>>,
    requests: Mutex<Vec<MediaConstraints>>,
    opened: Mutex<Vec<Arc<FakeTrack>>>,
}

impl FakeDevices {
    /// The camera is missing; the microphone works.
    pub(crate) fn without_camera() -> Self {
        Self {
            video_error: Some(DeviceError::NotFound),
            ..Default::default()
        }
    }

    /// Every request fails with `error`.
    pub(crate) fn failing(error: DeviceError) -> Self {
        Self {
            video_error: Some(error.clone()),
            audio_error: Some(error),
            ..Default::default()
        }
    }

    /// `open` waits for `gate` to be notified before answering.
    pub(crate) fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }

    pub(crate) fn requests(&self) -> Vec<MediaConstraints> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn opened_tracks(&self) -> Vec<Arc<FakeTrack>> {
        self.opened.lock().unwrap().clone()
    }

    pub(crate) fn all_stopped(&self) -> bool {
        self.opened_tracks().iter().all(|t| t.is_stopped())
    }
}

#[async_trait]
impl CaptureDevices for FakeDevices {
    async fn open(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Vec<Arc<dyn LocalTrack>>, DeviceError> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(constraints);
            requests.len()
        };
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if constraints.video {
            if let Some(e) = &self.video_error {
                return Err(e.clone());
            }
        }
        if let Some(e) = &self.audio_error {
            return Err(e.clone());
        }

        let mut tracks = vec![Arc::new(FakeTrack::new(format!("mic-{n}"), TrackKind::Audio))];
        if constraints.video {
            tracks.push(Arc::new(FakeTrack::new(format!("cam-{n}"), TrackKind::Video)));
        }
        self.opened.lock().unwrap().extend(tracks.iter().cloned());
        Ok(tracks
            .into_iter()
            .map(|t| t as Arc<dyn LocalTrack>)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

pub(crate) struct FakeTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    calls: Mutex<Vec<String>>,
    tracks: Mutex<Vec<String>>,
    candidates: Mutex<Vec<IceCandidate>>,
    closed: AtomicBool,
}

impl FakeTransport {
    /// Deliver a transport callback as the platform would.
    pub(crate) fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn candidates(&self) -> Vec<IceCandidate> {
        self.candidates.lock().unwrap().clone()
    }

    pub(crate) fn track_count(&self) -> usize {
        self.tracks.lock().unwrap().len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

fn kind_label(kind: SdpKind) -> &'static str {
    match kind {
        SdpKind::Offer => "offer",
        SdpKind::Answer => "answer",
    }
}

#[async_trait]
impl PeerTransport for FakeTransport {
    async fn add_track(&self, track: Arc<dyn LocalTrack>) -> Result<(), NegotiationError> {
        self.tracks.lock().unwrap().push(track.id().to_string());
        Ok(())
    }

    async fn create_offer(&self) -> Result<String, NegotiationError> {
        self.record("create_offer");
        Ok("v=0 fake-offer".to_string())
    }

    async fn create_answer(&self) -> Result<String, NegotiationError> {
        self.record("create_answer");
        Ok("v=0 fake-answer".to_string())
    }

    async fn set_local_description(
        &self,
        kind: SdpKind,
        _sdp: &str,
    ) -> Result<(), NegotiationError> {
        self.record(format!("set_local:{}", kind_label(kind)));
        Ok(())
    }

    async fn set_remote_description(
        &self,
        kind: SdpKind,
        _sdp: &str,
    ) -> Result<(), NegotiationError> {
        self.record(format!("set_remote:{}", kind_label(kind)));
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: &IceCandidate) -> Result<(), NegotiationError> {
        self.record("add_candidate");
        self.candidates.lock().unwrap().push(candidate.clone());
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct FakeTransports {
    created: Mutex<Vec<Arc<FakeTransport>>>,
}

impl FakeTransports {
    pub(crate) fn created(&self) -> Vec<Arc<FakeTransport>> {
        self.created.lock().unwrap().clone()
    }

    pub(crate) fn last(&self) -> Option<Arc<FakeTransport>> {
        self.created.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TransportFactory for FakeTransports {
    async fn create(
        &self,
        _ice_servers: &[String],
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>, NegotiationError> {
        let transport = Arc::new(FakeTransport {
            events,
            calls: Mutex::new(Vec::new()),
            tracks: Mutex::new(Vec::new()),
            candidates: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        self.created.lock().unwrap().push(Arc::clone(&transport));
        Ok(transport)
    }
}
