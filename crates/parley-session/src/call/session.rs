//! One-to-one video call state machine.
//!
//! State lives behind a single async lock that is never held across
//! network or hardware calls. Every terminal transition bumps the call
//! generation; async steps re-check it after each await and back out when
//! they were overtaken.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parley_common::CallId;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::types::{CallConfig, CallError, CallEvent, CallRole, CallSnapshot, CallStatus};
use crate::media::{
    CaptureDevices, MediaConfig, MediaHandles, MediaPipeline, PeerTransport, SdpKind,
    TaggedTransportEvent, TransportEvent, TransportFactory, TransportState,
};
use crate::protocol::{events, IceCandidate, InboundEvent, OutboundEvent};
use crate::registry::SessionRegistry;
use crate::signaling::{Pump, SignalSender, SignalingChannel};

const EVENT_QUEUE: usize = 256;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct CallState {
    status: CallStatus,
    role: Option<CallRole>,
    call_id: Option<CallId>,
    remote_user_id: Option<String>,
    room_hint: Option<String>,
    error_detail: Option<String>,
    /// Offer/answer exchange finished on this side.
    negotiated: bool,
    /// The transport reported `Connected`.
    transport_live: bool,
    remote_description_set: bool,
    pending_candidates: VecDeque<IceCandidate>,
    generation: u64,
}

impl CallState {
    fn new() -> Self {
        Self {
            status: CallStatus::Idle,
            role: None,
            call_id: None,
            remote_user_id: None,
            room_hint: None,
            error_detail: None,
            negotiated: false,
            transport_live: false,
            remote_description_set: false,
            pending_candidates: VecDeque::new(),
            generation: 0,
        }
    }

    fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            status: self.status,
            role: self.role,
            call_id: self.call_id.clone(),
            remote_user_id: self.remote_user_id.clone(),
            error_detail: self.error_detail.clone(),
            room_hint: self.room_hint.clone(),
        }
    }

    fn is_current(&self, call_id: &CallId, from: &str) -> bool {
        self.call_id.as_ref() == Some(call_id) && self.remote_user_id.as_deref() == Some(from)
    }

    /// Forget the call. Status and generation are left to the caller.
    fn clear(&mut self) {
        self.role = None;
        self.call_id = None;
        self.remote_user_id = None;
        self.room_hint = None;
        self.error_detail = None;
        self.reset_negotiation();
    }

    fn reset_negotiation(&mut self) {
        self.negotiated = false;
        self.transport_live = false;
        self.remote_description_set = false;
        self.pending_candidates.clear();
    }

    fn call_label(&self) -> &str {
        self.call_id.as_ref().map_or("-", CallId::as_str)
    }
}

// ---------------------------------------------------------------------------
// Inner
// ---------------------------------------------------------------------------

struct SessionInner {
    config: CallConfig,
    local_user_id: String,
    registry: Arc<dyn SessionRegistry>,
    signaling: Arc<dyn SignalSender>,
    state: Mutex<CallState>,
    pipeline: Mutex<MediaPipeline>,
    events: mpsc::Sender<CallEvent>,
    transport_tx: mpsc::UnboundedSender<TaggedTransportEvent>,
}

impl SessionInner {
    fn emit(&self, event: CallEvent) {
        match self.events.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(event)) => warn!(?event, "Call event queue full, dropping"),
        }
    }

    fn set_status(&self, state: &mut CallState, status: CallStatus) {
        if state.status == status {
            return;
        }
        info!(
            call_id = state.call_label(),
            from = %state.status,
            to = %status,
            "Call status changed"
        );
        state.status = status;
        self.emit(CallEvent::StatusChanged(state.snapshot()));
    }

    fn maybe_connected(&self, state: &mut CallState) {
        if state.status == CallStatus::Connecting && state.negotiated && state.transport_live {
            self.set_status(state, CallStatus::Connected);
        }
    }

    async fn ensure_current(&self, generation: u64) -> Result<(), CallError> {
        if self.state.lock().await.generation == generation {
            Ok(())
        } else {
            Err(CallError::Cancelled)
        }
    }

    /// Close the transport and stop local capture.
    async fn teardown_media(&self) {
        let mut pipeline = self.pipeline.lock().await;
        pipeline.close_transport().await;
        pipeline.release();
    }

    /// A capture opened after the call was torn down belongs to nobody.
    /// Leave it alone if a newer call already owns the pipeline.
    async fn release_orphaned_capture(&self) {
        if self.state.lock().await.status.is_active() {
            return;
        }
        if self.pipeline.lock().await.release() {
            debug!("Released capture acquired after teardown");
        }
    }

    /// Best-effort: end the call record and tell the peer.
    async fn notify_end(&self, call_id: Option<CallId>, remote_user_id: Option<String>) {
        let Some(call_id) = call_id else {
            return;
        };
        if let Err(e) = self.registry.end_call(&call_id).await {
            warn!(call_id = %call_id, error = %e, "Failed to end call record");
        }
        if let Some(to) = remote_user_id {
            self.signaling.send(&OutboundEvent::CallEnd { to, call_id });
        }
    }

    /// Abandon a call that never got going and return to idle. Returns false
    /// when `generation` was already overtaken.
    async fn rollback(&self, generation: u64, detail: String) -> bool {
        {
            let mut state = self.state.lock().await;
            if state.generation != generation {
                return false;
            }
            state.generation += 1;
            state.clear();
            self.set_status(&mut state, CallStatus::Idle);
        }
        warn!(detail = %detail, "Call setup rolled back");
        self.emit(CallEvent::Error(detail));
        self.teardown_media().await;
        true
    }

    /// Move an active call to `error`, tear down media and tell the peer.
    /// Returns false when `generation` was already overtaken.
    async fn fail(&self, generation: u64, detail: String) -> bool {
        let (call_id, remote) = {
            let mut state = self.state.lock().await;
            if state.generation != generation || !state.status.is_active() {
                return false;
            }
            state.generation += 1;
            state.reset_negotiation();
            state.error_detail = Some(detail.clone());
            self.set_status(&mut state, CallStatus::Error);
            (state.call_id.clone(), state.remote_user_id.clone())
        };
        warn!(detail = %detail, "Call failed");
        self.emit(CallEvent::Error(detail));
        self.teardown_media().await;
        self.notify_end(call_id, remote).await;
        true
    }

    /// Turn the outcome of a negotiation step into a state change.
    async fn settle(&self, generation: u64, result: Result<(), CallError>) {
        match result {
            Ok(()) => {}
            Err(CallError::Cancelled) => debug!("Negotiation step overtaken"),
            Err(e) => {
                self.fail(generation, e.to_string()).await;
            }
        }
    }

    // -- Local operations -----------------------------------------------------

    async fn initiate(&self, remote_user_id: &str) -> Result<CallId, CallError> {
        let generation = {
            let mut state = self.state.lock().await;
            if state.status != CallStatus::Idle {
                return Err(CallError::InvalidState {
                    operation: "start a call",
                    status: state.status,
                });
            }
            if !self.signaling.is_connected() {
                return Err(CallError::NotConnected);
            }
            state.role = Some(CallRole::Caller);
            state.remote_user_id = Some(remote_user_id.to_string());
            self.set_status(&mut state, CallStatus::Initiating);
            state.generation
        };
        info!(peer = %remote_user_id, "Starting call");

        let acquired = {
            let mut pipeline = self.pipeline.lock().await;
            let constraints = pipeline.config().constraints();
            pipeline.acquire(constraints).await
        };
        if let Err(e) = acquired {
            return Err(if self.rollback(generation, format!("could not start call: {e}")).await {
                e.into()
            } else {
                CallError::Cancelled
            });
        }
        if let Err(e) = self.ensure_current(generation).await {
            self.release_orphaned_capture().await;
            return Err(e);
        }

        let record = match self.registry.create_call(remote_user_id).await {
            Ok(record) => record,
            Err(e) => {
                return Err(
                    if self.rollback(generation, format!("could not start call: {e}")).await {
                        e.into()
                    } else {
                        CallError::Cancelled
                    },
                );
            }
        };

        {
            let mut state = self.state.lock().await;
            if state.generation == generation {
                state.call_id = Some(record.id.clone());
                state.room_hint = record.room_hint.clone();
                self.set_status(&mut state, CallStatus::Ringing);
            } else {
                drop(state);
                self.notify_end(Some(record.id), None).await;
                return Err(CallError::Cancelled);
            }
        }

        let invite = OutboundEvent::CallInvite {
            to: remote_user_id.to_string(),
            call_id: record.id.clone(),
            room_hint: record.room_hint,
        };
        if !self.signaling.send(&invite) {
            warn!(call_id = %record.id, "Invite could not be sent");
        }
        Ok(record.id)
    }

    async fn accept(&self, call_id: &CallId, from: &str) -> Result<(), CallError> {
        let generation = {
            let mut state = self.state.lock().await;
            match state.status {
                CallStatus::Ringing if state.role == Some(CallRole::Callee) => {}
                CallStatus::Idle => return Err(CallError::NoPendingInvite),
                status => {
                    return Err(CallError::InvalidState {
                        operation: "accept a call",
                        status,
                    })
                }
            }
            if !state.is_current(call_id, from) {
                return Err(CallError::NoPendingInvite);
            }
            self.set_status(&mut state, CallStatus::Connecting);
            state.generation
        };
        info!(call_id = %call_id, peer = %from, "Accepting call");

        if let Err(e) = self.registry.join_call(call_id).await {
            return Err(if self.fail(generation, format!("could not join call: {e}")).await {
                e.into()
            } else {
                CallError::Cancelled
            });
        }
        self.ensure_current(generation).await?;

        let acquired = {
            let mut pipeline = self.pipeline.lock().await;
            let constraints = pipeline.config().constraints();
            pipeline.acquire(constraints).await
        };
        if let Err(e) = acquired {
            return Err(if self.fail(generation, format!("could not open media: {e}")).await {
                e.into()
            } else {
                CallError::Cancelled
            });
        }
        if let Err(e) = self.ensure_current(generation).await {
            self.release_orphaned_capture().await;
            return Err(e);
        }

        let accepted = OutboundEvent::CallAccepted {
            to: from.to_string(),
            call_id: call_id.clone(),
        };
        if !self.signaling.send(&accepted) {
            warn!(call_id = %call_id, "Acceptance could not be sent");
        }
        Ok(())
    }

    async fn decline(&self) -> Result<(), CallError> {
        let (call_id, remote) = {
            let mut state = self.state.lock().await;
            match state.status {
                CallStatus::Ringing if state.role == Some(CallRole::Callee) => {}
                CallStatus::Idle => return Err(CallError::NoPendingInvite),
                status => {
                    return Err(CallError::InvalidState {
                        operation: "decline a call",
                        status,
                    })
                }
            }
            let ids = (state.call_id.clone(), state.remote_user_id.clone());
            state.generation += 1;
            state.clear();
            self.set_status(&mut state, CallStatus::Idle);
            ids
        };
        self.teardown_media().await;

        if let (Some(call_id), Some(to)) = (call_id, remote) {
            info!(call_id = %call_id, peer = %to, "Call declined");
            self.signaling.send(&OutboundEvent::CallEnd { to, call_id });
        }
        Ok(())
    }

    async fn end(&self) {
        let ending = {
            let mut state = self.state.lock().await;
            match state.status {
                CallStatus::Idle => return,
                CallStatus::Ended | CallStatus::Error => None,
                _ => {
                    state.generation += 1;
                    state.reset_negotiation();
                    self.set_status(&mut state, CallStatus::Ended);
                    Some((state.call_id.clone(), state.remote_user_id.clone()))
                }
            }
        };
        self.teardown_media().await;

        if let Some((call_id, remote)) = ending {
            info!("Call ended locally");
            self.notify_end(call_id, remote).await;
        }
    }

    async fn reset(&self) -> Result<(), CallError> {
        {
            let mut state = self.state.lock().await;
            match state.status {
                CallStatus::Idle => return Ok(()),
                CallStatus::Ended | CallStatus::Error => {
                    state.generation += 1;
                    state.clear();
                    self.set_status(&mut state, CallStatus::Idle);
                }
                status => {
                    return Err(CallError::InvalidState {
                        operation: "reset",
                        status,
                    })
                }
            }
        }
        self.teardown_media().await;
        Ok(())
    }

    // -- Signaling ------------------------------------------------------------

    async fn on_invite(&self, from: String, call_id: CallId, room_hint: Option<String>) {
        let busy = {
            let mut state = self.state.lock().await;
            if state.call_id.as_ref() == Some(&call_id) {
                debug!(call_id = %call_id, "Duplicate invite");
                return;
            }
            if state.status.is_active() {
                true
            } else {
                if state.status.is_terminal() {
                    state.generation += 1;
                    state.clear();
                    self.set_status(&mut state, CallStatus::Idle);
                }
                state.role = Some(CallRole::Callee);
                state.call_id = Some(call_id.clone());
                state.remote_user_id = Some(from.clone());
                state.room_hint = room_hint;
                self.set_status(&mut state, CallStatus::Ringing);
                false
            }
        };

        if busy {
            info!(call_id = %call_id, peer = %from, "Already in a call, declining");
            self.signaling
                .send(&OutboundEvent::CallBusy { to: from, call_id });
        } else {
            info!(call_id = %call_id, peer = %from, "Incoming call");
            self.emit(CallEvent::IncomingCall { call_id, from });
        }
    }

    async fn on_accepted(&self, from: String, call_id: CallId) {
        let generation = {
            let mut state = self.state.lock().await;
            if state.status != CallStatus::Ringing
                || state.role != Some(CallRole::Caller)
                || !state.is_current(&call_id, &from)
            {
                debug!(call_id = %call_id, "Ignoring acceptance for another call");
                return;
            }
            self.set_status(&mut state, CallStatus::Connecting);
            state.generation
        };
        let result = self.send_offer(generation, &from, &call_id).await;
        self.settle(generation, result).await;
    }

    async fn send_offer(
        &self,
        generation: u64,
        to: &str,
        call_id: &CallId,
    ) -> Result<(), CallError> {
        let peer = self.build_transport(generation, to, call_id).await?;
        let offer = peer.create_offer().await?;
        peer.set_local_description(SdpKind::Offer, &offer).await?;
        self.ensure_current(generation).await?;

        self.signaling.send(&OutboundEvent::CallOffer {
            to: to.to_string(),
            sdp: offer,
            call_id: call_id.clone(),
        });
        Ok(())
    }

    async fn on_offer(&self, from: String, sdp: String, call_id: CallId) {
        let generation = {
            let state = self.state.lock().await;
            if state.status != CallStatus::Connecting
                || state.role != Some(CallRole::Callee)
                || !state.is_current(&call_id, &from)
            {
                debug!(call_id = %call_id, "Ignoring offer for another call");
                return;
            }
            state.generation
        };
        let result = self.send_answer(generation, &from, &sdp, &call_id).await;
        self.settle(generation, result).await;
    }

    async fn send_answer(
        &self,
        generation: u64,
        to: &str,
        offer: &str,
        call_id: &CallId,
    ) -> Result<(), CallError> {
        let peer = self.build_transport(generation, to, call_id).await?;
        peer.set_remote_description(SdpKind::Offer, offer).await?;
        self.flush_candidates(generation, peer.as_ref()).await?;

        let answer = peer.create_answer().await?;
        peer.set_local_description(SdpKind::Answer, &answer).await?;
        self.ensure_current(generation).await?;

        self.signaling.send(&OutboundEvent::CallAnswer {
            to: to.to_string(),
            sdp: answer,
            call_id: call_id.clone(),
        });
        self.mark_negotiated(generation).await;
        Ok(())
    }

    async fn on_answer(&self, from: String, sdp: String, call_id: CallId) {
        let generation = {
            let state = self.state.lock().await;
            if state.status != CallStatus::Connecting
                || state.role != Some(CallRole::Caller)
                || !state.is_current(&call_id, &from)
            {
                debug!(call_id = %call_id, "Ignoring answer for another call");
                return;
            }
            state.generation
        };
        let result = self.apply_answer(generation, &sdp).await;
        self.settle(generation, result).await;
    }

    async fn apply_answer(&self, generation: u64, answer: &str) -> Result<(), CallError> {
        let peer = self.pipeline.lock().await.transport();
        let Some(peer) = peer else {
            warn!("Answer arrived before the transport was built");
            return Ok(());
        };
        peer.set_remote_description(SdpKind::Answer, answer).await?;
        self.flush_candidates(generation, peer.as_ref()).await?;
        self.mark_negotiated(generation).await;
        Ok(())
    }

    async fn on_remote_candidate(&self, from: String, candidate: IceCandidate, call_id: CallId) {
        {
            let mut state = self.state.lock().await;
            if !state.status.is_active() || !state.is_current(&call_id, &from) {
                debug!(call_id = %call_id, "Ignoring candidate for another call");
                return;
            }
            if !state.remote_description_set {
                let capacity = self.config.ice_candidate_buffer;
                if capacity == 0 {
                    warn!(call_id = %call_id, "Candidate buffering disabled, dropping early candidate");
                    return;
                }
                if state.pending_candidates.len() >= capacity {
                    state.pending_candidates.pop_front();
                    warn!(call_id = %call_id, capacity, "Candidate buffer full, dropped oldest");
                }
                state.pending_candidates.push_back(candidate);
                return;
            }
        }

        let peer = self.pipeline.lock().await.transport();
        if let Some(peer) = peer {
            if let Err(e) = peer.add_ice_candidate(&candidate).await {
                warn!(call_id = %call_id, error = %e, "Remote candidate rejected");
            }
        }
    }

    async fn on_remote_end(&self, from: String, call_id: CallId) {
        {
            let mut state = self.state.lock().await;
            if !state.status.is_active() || !state.is_current(&call_id, &from) {
                debug!(call_id = %call_id, "Ignoring end for another call");
                return;
            }
            state.generation += 1;
            state.reset_negotiation();
            self.set_status(&mut state, CallStatus::Ended);
        }
        info!(call_id = %call_id, peer = %from, "Call ended by peer");
        self.teardown_media().await;
    }

    async fn on_busy(&self, from: String, call_id: CallId) {
        {
            let mut state = self.state.lock().await;
            if state.status != CallStatus::Ringing
                || state.role != Some(CallRole::Caller)
                || !state.is_current(&call_id, &from)
            {
                debug!(call_id = %call_id, "Ignoring busy for another call");
                return;
            }
            state.generation += 1;
            self.set_status(&mut state, CallStatus::Ended);
        }
        info!(call_id = %call_id, peer = %from, "Peer is busy");
        self.emit(CallEvent::RemoteBusy {
            call_id: call_id.clone(),
        });
        self.teardown_media().await;
        if let Err(e) = self.registry.end_call(&call_id).await {
            warn!(call_id = %call_id, error = %e, "Failed to end call record");
        }
    }

    // -- Negotiation helpers --------------------------------------------------

    async fn build_transport(
        &self,
        generation: u64,
        remote_user_id: &str,
        call_id: &CallId,
    ) -> Result<Arc<dyn PeerTransport>, CallError> {
        let (id, peer) = self
            .pipeline
            .lock()
            .await
            .build_transport(
                remote_user_id,
                call_id,
                Arc::clone(&self.signaling),
                self.transport_tx.clone(),
            )
            .await?;
        if let Err(e) = self.ensure_current(generation).await {
            self.pipeline.lock().await.close_transport_if(id).await;
            return Err(e);
        }
        Ok(peer)
    }

    /// Mark the remote description applied and hand over buffered
    /// candidates in arrival order.
    async fn flush_candidates(
        &self,
        generation: u64,
        peer: &dyn PeerTransport,
    ) -> Result<(), CallError> {
        let pending = {
            let mut state = self.state.lock().await;
            if state.generation != generation {
                return Err(CallError::Cancelled);
            }
            state.remote_description_set = true;
            std::mem::take(&mut state.pending_candidates)
        };
        if !pending.is_empty() {
            debug!(count = pending.len(), "Applying buffered candidates");
        }
        for candidate in &pending {
            if let Err(e) = peer.add_ice_candidate(candidate).await {
                warn!(error = %e, "Buffered candidate rejected");
            }
        }
        Ok(())
    }

    async fn mark_negotiated(&self, generation: u64) {
        let mut state = self.state.lock().await;
        if state.generation == generation {
            state.negotiated = true;
            self.maybe_connected(&mut state);
        }
    }

    // -- Transport callbacks --------------------------------------------------

    async fn on_transport_event(&self, transport_id: u64, event: TransportEvent) {
        match event {
            // Sent to the peer by the pipeline's forwarder.
            TransportEvent::LocalCandidate(_) => {}
            TransportEvent::RemoteTrack(track) => {
                let kind = track.kind;
                if self.pipeline.lock().await.add_remote_track(transport_id, track) {
                    debug!(?kind, "Remote track received");
                    self.emit(CallEvent::RemoteMedia);
                }
            }
            TransportEvent::StateChanged(transport_state) => {
                if self.pipeline.lock().await.transport_id() != Some(transport_id) {
                    debug!(transport = transport_id, "Ignoring event from replaced transport");
                    return;
                }
                self.on_transport_state(transport_state).await;
            }
        }
    }

    async fn on_transport_state(&self, transport_state: TransportState) {
        match transport_state {
            TransportState::Connected => {
                let mut state = self.state.lock().await;
                state.transport_live = true;
                self.maybe_connected(&mut state);
            }
            TransportState::Failed | TransportState::Disconnected => {
                let generation = {
                    let state = self.state.lock().await;
                    if !matches!(state.status, CallStatus::Connecting | CallStatus::Connected) {
                        return;
                    }
                    state.generation
                };
                self.fail(generation, format!("media transport {transport_state:?}").to_lowercase())
                    .await;
            }
            other => debug!(state = ?other, "Transport state"),
        }
    }
}

async fn pump_transport_events(
    inner: Weak<SessionInner>,
    mut events: mpsc::UnboundedReceiver<TaggedTransportEvent>,
) {
    while let Some((transport_id, event)) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.on_transport_event(transport_id, event).await;
    }
}

// ---------------------------------------------------------------------------
// CallSession
// ---------------------------------------------------------------------------

/// The one call this client can be in at a time.
///
/// Cheap to clone; clones drive the same call.
#[derive(Clone)]
pub struct CallSession {
    inner: Arc<SessionInner>,
}

impl CallSession {
    /// Create an idle session. Must be called inside a Tokio runtime.
    pub fn new(
        config: CallConfig,
        media: MediaConfig,
        local_user_id: impl Into<String>,
        registry: Arc<dyn SessionRegistry>,
        signaling: Arc<dyn SignalSender>,
        devices: Arc<dyn CaptureDevices>,
        transports: Arc<dyn TransportFactory>,
    ) -> (Self, mpsc::Receiver<CallEvent>) {
        let (events, events_rx) = mpsc::channel(EVENT_QUEUE);
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(SessionInner {
            config,
            local_user_id: local_user_id.into(),
            registry,
            signaling,
            state: Mutex::new(CallState::new()),
            pipeline: Mutex::new(MediaPipeline::new(media, devices, transports)),
            events,
            transport_tx,
        });
        tokio::spawn(pump_transport_events(Arc::downgrade(&inner), transport_rx));
        (Self { inner }, events_rx)
    }

    pub fn local_user_id(&self) -> &str {
        &self.inner.local_user_id
    }

    /// Call `remote_user_id`. Requires `idle` and a connected signaling
    /// channel; rolls back to `idle` if media or the call record fails.
    pub async fn initiate_call(&self, remote_user_id: &str) -> Result<CallId, CallError> {
        self.inner.initiate(remote_user_id).await
    }

    /// Answer the pending invite `call_id` from `from`.
    pub async fn accept_call(&self, call_id: &CallId, from: &str) -> Result<(), CallError> {
        self.inner.accept(call_id, from).await
    }

    /// Refuse the pending invite and go straight back to `idle`.
    pub async fn decline_call(&self) -> Result<(), CallError> {
        self.inner.decline().await
    }

    /// Hang up. Media is always released, even when the peer or the
    /// registry cannot be told. No-op while idle.
    pub async fn end_call(&self) {
        self.inner.end().await;
    }

    /// Leave `ended`/`error` for `idle`.
    pub async fn reset(&self) -> Result<(), CallError> {
        self.inner.reset().await
    }

    pub async fn toggle_mute(&self) -> Option<bool> {
        self.inner.pipeline.lock().await.toggle_mute()
    }

    pub async fn toggle_video(&self) -> Option<bool> {
        self.inner.pipeline.lock().await.toggle_video()
    }

    pub async fn snapshot(&self) -> CallSnapshot {
        self.inner.state.lock().await.snapshot()
    }

    pub async fn status(&self) -> CallStatus {
        self.inner.state.lock().await.status
    }

    pub async fn media(&self) -> MediaHandles {
        let connected = self.status().await == CallStatus::Connected;
        self.inner.pipeline.lock().await.handles(connected)
    }

    /// Apply one inbound signaling event. Non-call events are ignored.
    pub async fn handle_signal(&self, event: InboundEvent) {
        match event {
            InboundEvent::CallInvite {
                from,
                call_id,
                room_hint,
            } => self.inner.on_invite(from, call_id, room_hint).await,
            InboundEvent::CallAccepted { from, call_id } => {
                self.inner.on_accepted(from, call_id).await
            }
            InboundEvent::CallOffer { from, sdp, call_id } => {
                self.inner.on_offer(from, sdp, call_id).await
            }
            InboundEvent::CallAnswer { from, sdp, call_id } => {
                self.inner.on_answer(from, sdp, call_id).await
            }
            InboundEvent::CallIceCandidate {
                from,
                candidate,
                call_id,
            } => self.inner.on_remote_candidate(from, candidate, call_id).await,
            InboundEvent::CallEnd { from, call_id } => self.inner.on_remote_end(from, call_id).await,
            InboundEvent::CallBusy { from, call_id } => self.inner.on_busy(from, call_id).await,
            other => debug!(event = other.name(), "Ignoring non-call event"),
        }
    }

    /// Apply one transport callback from the transport `transport_id`.
    #[cfg(test)]
    pub(crate) async fn handle_transport_event(&self, transport_id: u64, event: TransportEvent) {
        self.inner.on_transport_event(transport_id, event).await;
    }

    /// Consume call events from `channel` until the returned pump is dropped.
    pub fn attach(&self, channel: &SignalingChannel) -> Pump {
        let session = self.clone();
        channel.pump(events::CALL_EVENTS, move |event| {
            let session = session.clone();
            async move { session.handle_signal(event).await }
        })
    }
}
