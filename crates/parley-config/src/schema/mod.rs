//! Configuration schema types for Parley.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod identity;
mod network;
mod session;
mod system;

pub use identity::*;
pub use network::*;
pub use session::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Parley.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ParleyConfig {
    pub identity: IdentityConfig,
    pub signaling: SignalingSection,
    pub registry: RegistrySection,
    pub chat: ChatSection,
    pub call: CallSection,
    pub media: MediaSection,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================
