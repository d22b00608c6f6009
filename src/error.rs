//! Error types for planink.

use crate::auth::AuthError;
use crate::autosave::gateway::GatewayError;
use crate::drawing::codec::CodecError;
use crate::store::StoreError;

/// Top-level error type for the planner workspace and host bridge.
#[derive(Debug, thiserror::Error)]
pub enum PlaninkError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Entity store error (SQLite, missing or foreign entity).
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No authenticated owner in context.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Drawing snapshot could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Drawing persistence gateway error.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Malformed host command payload.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PlaninkError>;
