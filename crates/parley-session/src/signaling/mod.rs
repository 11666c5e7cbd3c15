//! WebSocket signaling channel.
//!
//! One authenticated connection per client session, carrying named JSON
//! events in both directions. Handles heartbeats, handler dispatch, and
//! bounded auto-reconnect with exponential backoff.

mod client;
mod connection;
mod handler;
mod types;


pub use client::{Pump, SignalSender, SignalingChannel};
pub use handler::{Handler, HandlerId, Subscription};
pub use types::{ConnectionStatus, FailureReason, SignalingConfig};
