//! Core protocol types for Kickabout's wire format.
//!
//! Every structure here travels on the wire between a browser client and
//! the relay, except [`Recipient`], which tells the room layer where an
//! outbound event should be delivered.
//!
//! Clients simulate the match locally; the relay mirrors whatever state
//! they report and fans it out, so these shapes are exactly the shapes
//! clients produce — no server-side authority is encoded here.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use kickabout_transport::ConnectionId;
use serde::{Deserialize, Serialize};

/// Default display name when a client doesn't send one.
pub(crate) fn default_player_name() -> String {
    "Player".to_string()
}

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A room's join code: a short random token, unique across the directory.
///
/// Newtype over `String` so a code can't be confused with a player name
/// or any other wire string. Codes are generated by the room directory
/// with 48 bits of entropy (12 lowercase hex characters), which makes
/// collisions negligible at any plausible room count.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps an existing code string.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// Which side an occupant plays for.
///
/// Assigned by arrival order: the first occupant is `Home`, the second
/// is `Away`. Serialized lowercase (`"home"` / `"away"`) to match the
/// client protocol.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Home,
    Away,
}

impl Team {
    /// The default spawn position for this team's player.
    pub fn spawn_position(self) -> (f64, f64) {
        match self {
            Team::Home => (200.0, 300.0),
            Team::Away => (600.0, 300.0),
        }
    }

    /// Returns the wire name of the team.
    pub fn as_str(self) -> &'static str {
        match self {
            Team::Home => "home",
            Team::Away => "away",
        }
    }
}

impl FromStr for Team {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(Team::Home),
            "away" => Ok(Team::Away),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Match state
// ---------------------------------------------------------------------------

/// One occupant's avatar within a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Client-supplied display name.
    pub name: String,
    /// Assigned side.
    pub team: Team,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl PlayerState {
    /// Creates a freshly seated player at their team's spawn position.
    pub fn spawn(name: String, team: Team) -> Self {
        let (x, y) = team.spawn_position();
        Self {
            name,
            team,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
        }
    }
}

/// Ball kinematic state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl Ball {
    /// The centre-spot rest state: where the ball starts and returns
    /// after every goal.
    pub fn kickoff() -> Self {
        Self {
            x: 400.0,
            y: 300.0,
            vx: 0.0,
            vy: 0.0,
        }
    }

    /// Merges a partial update into this ball, leaving unspecified
    /// fields untouched.
    pub fn apply(&mut self, delta: &BallDelta) {
        if let Some(x) = delta.x {
            self.x = x;
        }
        if let Some(y) = delta.y {
            self.y = y;
        }
        if let Some(vx) = delta.vx {
            self.vx = vx;
        }
        if let Some(vy) = delta.vy {
            self.vy = vy;
        }
    }
}

impl Default for Ball {
    fn default() -> Self {
        Self::kickoff()
    }
}

/// A partial ball update: only the supplied fields overwrite.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize,
)]
pub struct BallDelta {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub vx: Option<f64>,
    #[serde(default)]
    pub vy: Option<f64>,
}

/// Goal counters for both sides.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    /// Increments the counter for the given team.
    pub fn record_goal(&mut self, team: Team) {
        match team {
            Team::Home => self.home += 1,
            Team::Away => self.away += 1,
        }
    }
}

/// Match length in seconds. Carried in [`GameState`] for clients; the
/// relay never decrements it.
pub const MATCH_SECONDS: u32 = 300;

/// The full state of one match, as broadcast in `game_start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Occupant map, keyed by connection identity.
    pub players: HashMap<ConnectionId, PlayerState>,
    pub ball: Ball,
    pub score: Score,
    /// Countdown seconds. Inert on the server side — clients own the clock.
    pub timer: u32,
    /// Becomes `true` when the second occupant is seated; never reverts
    /// for the lifetime of the room.
    pub game_active: bool,
}

// ---------------------------------------------------------------------------
// Recipient — who should receive an outbound event?
// ---------------------------------------------------------------------------

/// Specifies which occupants of a room should receive a [`ServerEvent`].
///
/// Relay semantics need exactly two fan-out shapes: the whole room
/// (join/goal/leave notices) and the whole room minus the client whose
/// own update is being mirrored back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every occupant of the room.
    All,
    /// Every occupant except the originating sender.
    AllExcept(ConnectionId),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Inbound events, tagged with their event kind.
///
/// `#[serde(tag = "type")]` gives internally tagged JSON, e.g.
/// `{ "type": "join_room", "room_id": "ab12…", "player_name": "Sam" }`.
/// Optional fields default exactly as the protocol states: names to
/// `"Player"`, velocities to `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Open a new room and take the first seat.
    CreateRoom {
        #[serde(default = "default_player_name")]
        player_name: String,
    },

    /// Take the second seat in an existing room.
    JoinRoom {
        room_id: RoomCode,
        #[serde(default = "default_player_name")]
        player_name: String,
    },

    /// Report the sender's own position and velocity.
    PlayerMove {
        room_id: RoomCode,
        x: f64,
        y: f64,
        #[serde(default)]
        vx: f64,
        #[serde(default)]
        vy: f64,
    },

    /// Report ball state; only the supplied fields are merged.
    BallUpdate {
        room_id: RoomCode,
        #[serde(default)]
        ball: BallDelta,
    },

    /// Claim a goal for a team. The team arrives as a raw string so the
    /// relay can drop invalid values silently instead of rejecting the
    /// whole frame.
    GoalScored { room_id: RoomCode, team: String },
}

/// Outbound events, tagged with their event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// To the creator only: the fresh room code and their own identity.
    RoomCreated {
        room_id: RoomCode,
        player_id: ConnectionId,
    },

    /// To the joiner only: their identity and the current occupant map.
    JoinedRoom {
        room_id: RoomCode,
        player_id: ConnectionId,
        players: HashMap<ConnectionId, PlayerState>,
    },

    /// To the whole room: someone was seated.
    PlayerJoined {
        player_id: ConnectionId,
        player_name: String,
        players: HashMap<ConnectionId, PlayerState>,
    },

    /// To the whole room when the second seat fills: the match is on.
    GameStart {
        #[serde(flatten)]
        state: GameState,
    },

    /// To everyone but the mover: mirrored positions plus current ball.
    GameUpdate {
        players: HashMap<ConnectionId, PlayerState>,
        ball: Ball,
    },

    /// To everyone but the reporter: merged ball state.
    BallSync { ball: Ball },

    /// To the whole room: updated score and the ball back on the spot.
    GoalScored { team: Team, score: Score, ball: Ball },

    /// To the remaining occupants: someone left, with the updated map.
    PlayerLeft {
        player_id: ConnectionId,
        players: HashMap<ConnectionId, PlayerState>,
    },

    /// To the sender only: the room already has two occupants.
    RoomFull,

    /// To the sender only: no room with that code.
    RoomNotFound,
}

// =========================================================================
// Tests
// =========================================================================
