//! Error types for the room layer.

use kickabout_protocol::RoomCode;
use kickabout_transport::ConnectionId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room with that code in the directory.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Both occupant slots are taken.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The connection is already seated in a room.
    #[error("connection {0} is already seated in room {1}")]
    AlreadySeated(ConnectionId, RoomCode),

    /// A goal was claimed for something other than "home" or "away".
    #[error("invalid team {0:?}")]
    InvalidTeam(String),

    /// The room's command channel is closed — its actor has shut down.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}
