//! Room directory: creates, tracks, and garbage-collects rooms, and
//! maps each live connection to the room it occupies.
//!
//! The membership index is what makes disconnect handling O(1): instead
//! of scanning every room for the vanished connection, the directory
//! looks the room up directly. It also enforces the invariant that a
//! connection sits in at most one room — a second seat attempt is
//! rejected here, before any room actor is involved.

use std::collections::HashMap;

use kickabout_protocol::{BallDelta, RoomCode};
use kickabout_transport::ConnectionId;
use rand::Rng;

use crate::room::{spawn_room, PlayerSender, RoomHandle, SeatOutcome};
use crate::RoomError;

/// Command channel size for room actors.
const ROOM_CHANNEL_SIZE: usize = 64;

/// Hex characters in a room code: 6 random bytes, 48 bits of entropy.
const CODE_BYTES: usize = 6;

/// Maps room codes to running rooms, and connections to their rooms.
///
/// This is the entry point for room operations from the event router.
/// Not thread-safe by itself — the server owns it behind a mutex, and
/// each room's state lives in its own actor task.
pub struct RoomDirectory {
    /// Active rooms, keyed by join code.
    rooms: HashMap<RoomCode, RoomHandle>,

    /// Connection registry: which room each connection occupies.
    /// At most one entry per connection (key invariant).
    memberships: HashMap<ConnectionId, RoomCode>,
}

impl RoomDirectory {
    /// Creates a new, empty directory.
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            memberships: HashMap::new(),
        }
    }

    /// Creates a room and seats its creator as the first occupant.
    ///
    /// The creator gets no join notices — only the `room_created` reply
    /// the router sends them.
    pub async fn create_room(
        &mut self,
        conn_id: ConnectionId,
        name: String,
        sender: PlayerSender,
    ) -> Result<(RoomCode, SeatOutcome), RoomError> {
        if let Some(current) = self.memberships.get(&conn_id) {
            return Err(RoomError::AlreadySeated(conn_id, current.clone()));
        }

        let code = self.fresh_code();
        let handle = spawn_room(code.clone(), ROOM_CHANNEL_SIZE);
        let outcome = handle.seat(conn_id, name, sender, false).await?;

        self.rooms.insert(code.clone(), handle);
        self.memberships.insert(conn_id, code.clone());
        tracing::info!(room_code = %code, %conn_id, "room created");
        Ok((code, outcome))
    }

    /// Seats a connection in an existing room.
    ///
    /// The room actor delivers the join notices (`joined_room`,
    /// `player_joined`, and `game_start` when the seat fills the room).
    pub async fn join_room(
        &mut self,
        code: &RoomCode,
        conn_id: ConnectionId,
        name: String,
        sender: PlayerSender,
    ) -> Result<SeatOutcome, RoomError> {
        if let Some(current) = self.memberships.get(&conn_id) {
            return Err(RoomError::AlreadySeated(conn_id, current.clone()));
        }

        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        let outcome = handle.seat(conn_id, name, sender, true).await?;
        self.memberships.insert(conn_id, code.clone());
        Ok(outcome)
    }

    /// Looks up a running room by code.
    pub fn get(&self, code: &RoomCode) -> Option<&RoomHandle> {
        self.rooms.get(code)
    }

    /// Relays a position update into the addressed room.
    pub async fn player_move(
        &self,
        code: &RoomCode,
        conn_id: ConnectionId,
        x: f64,
        y: f64,
        vx: f64,
        vy: f64,
    ) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.player_move(conn_id, x, y, vx, vy).await
    }

    /// Relays a partial ball update into the addressed room.
    pub async fn ball_update(
        &self,
        code: &RoomCode,
        conn_id: ConnectionId,
        delta: BallDelta,
    ) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.ball_update(conn_id, delta).await
    }

    /// Records a goal in the addressed room.
    pub async fn goal(
        &self,
        code: &RoomCode,
        team: String,
    ) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.goal(team).await
    }

    /// Handles a connection going away: unseats it from its room (if
    /// any) and destroys the room once it stands empty.
    ///
    /// Idempotent — the membership entry is claimed with `remove`, so a
    /// second disconnect for the same connection finds nothing and
    /// no-ops. Returns the room the connection was unseated from.
    pub async fn disconnect(
        &mut self,
        conn_id: ConnectionId,
    ) -> Option<RoomCode> {
        let code = self.memberships.remove(&conn_id)?;

        let remaining = match self.rooms.get(&code) {
            Some(handle) => handle.unseat(conn_id).await.unwrap_or(0),
            None => return Some(code),
        };

        if remaining == 0 {
            self.remove(&code);
        }
        Some(code)
    }

    /// Deletes a room, shutting its actor down. No-op if absent.
    pub fn remove(&mut self, code: &RoomCode) {
        if let Some(handle) = self.rooms.remove(code) {
            handle.shutdown();
            tracing::info!(room_code = %code, "room removed");
        }
    }

    /// Returns the room a connection currently occupies, if any.
    pub fn member_room(&self, conn_id: ConnectionId) -> Option<&RoomCode> {
        self.memberships.get(&conn_id)
    }

    /// Returns the number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Generates a code not currently present in the directory.
    ///
    /// 48 bits make a collision negligible, but the loop makes the
    /// uniqueness invariant structural rather than probabilistic.
    fn fresh_code(&self) -> RoomCode {
        loop {
            let code = generate_code();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a random room code: 6 bytes rendered as 12 lowercase hex
/// characters.
fn generate_code() -> RoomCode {
    let mut rng = rand::rng();
    let bytes: [u8; CODE_BYTES] = rng.random();
    RoomCode::new(
        bytes
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>(),
    )
}
