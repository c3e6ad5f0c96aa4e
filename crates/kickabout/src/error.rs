//! Unified error type for the Kickabout server.

use kickabout_protocol::ProtocolError;
use kickabout_room::RoomError;
use kickabout_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Nothing in the relay core is fatal to the process: these surface to
/// the per-connection handler (ending one connection at worst) or to the
/// caller of [`run()`](crate::KickaboutServer::run) when binding fails.
#[derive(Debug, thiserror::Error)]
pub enum KickaboutError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (full, not found, invalid team).
    #[error(transparent)]
    Room(#[from] RoomError),
}
