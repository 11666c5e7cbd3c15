pub mod errors;
pub mod id;

pub use errors::{
    ConfigError, MediaAccessError, NegotiationError, ParleyError, PersistenceError,
    SignalingError,
};
pub use id::{new_correlation_id, CallId};

pub type Result<T> = std::result::Result<T, ParleyError>;
