pub mod call;
pub mod chat;
pub mod identity;
pub mod media;
pub mod protocol;
pub mod registry;
pub mod signaling;

#[cfg(test)]
mod testing;

pub use call::{CallConfig, CallError, CallEvent, CallRole, CallSession, CallSnapshot, CallStatus};
pub use chat::{
    ChatConfig, ChatError, ChatEvent, ChatSession, ConversationThread, Delivery, Message,
    MessageKind, Participant, SenderRole,
};
pub use identity::Identity;
pub use media::{
    CaptureDevices, LocalTrack, MediaConfig, MediaConstraints, MediaHandles, MediaPipeline,
    PeerTransport, TransportFactory,
};
pub use protocol::{IceCandidate, InboundEvent, OutboundEvent};
pub use registry::{CallRecord, HttpRegistry, RegistryConfig, SessionRegistry};
pub use signaling::{ConnectionStatus, FailureReason, SignalSender, SignalingChannel, SignalingConfig};
