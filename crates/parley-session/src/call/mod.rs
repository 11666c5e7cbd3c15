//! One-to-one video calls: state machine, negotiation, and teardown.

mod session;
mod types;


pub use session::CallSession;
pub use types::{CallConfig, CallError, CallEvent, CallRole, CallSnapshot, CallStatus};
