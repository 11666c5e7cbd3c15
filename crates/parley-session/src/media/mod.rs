//! Local media capture and the per-call peer transport.

mod pipeline;
mod types;

pub use pipeline::{MediaPipeline, TaggedTransportEvent};
pub use types::{
    CaptureDevices, CaptureView, DeviceError, LocalTrack, MediaConfig, MediaConstraints,
    MediaHandles, PeerTransport, RemoteStream, RemoteTrack, SdpKind, TrackKind, TransportEvent,
    TransportFactory, TransportState,
};
