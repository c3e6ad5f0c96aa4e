//! Room actor: an isolated Tokio task that owns one match.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. No shared mutable state — the channel
//! serializes every mutation of the room, which is exactly the per-room
//! mutual exclusion the relay needs: the occupant-count check and the
//! seat that follows it are a single command.

use std::collections::HashMap;

use kickabout_protocol::{
    Ball, BallDelta, GameState, PlayerState, Recipient, RoomCode, Score,
    ServerEvent, Team, MATCH_SECONDS,
};
use kickabout_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::RoomError;

/// Occupant slots per room: one per team.
pub const MAX_OCCUPANTS: usize = 2;

/// Channel sender for delivering outbound events to one occupant's
/// connection. Unbounded: broadcasts are fire-and-forget and must never
/// stall the actor on a slow client.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// What a successful seat reports back to the caller.
#[derive(Debug)]
pub struct SeatOutcome {
    /// The side assigned by arrival order.
    pub team: Team,
    /// Occupant count after this seat.
    pub player_count: usize,
    /// Whether this seat brought the room to two occupants and started
    /// the match.
    pub started: bool,
}

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    /// Seat a connection. With `announce`, the actor delivers the
    /// `joined_room` / `player_joined` / `game_start` notices itself so
    /// the joiner sees them in protocol order.
    Seat {
        conn_id: ConnectionId,
        name: String,
        sender: PlayerSender,
        announce: bool,
        reply: oneshot::Sender<Result<SeatOutcome, RoomError>>,
    },

    /// Remove a connection's occupant, if present. Replies with the
    /// remaining occupant count.
    Unseat {
        conn_id: ConnectionId,
        reply: oneshot::Sender<usize>,
    },

    /// Overwrite the sender's position and velocity.
    Move {
        conn_id: ConnectionId,
        x: f64,
        y: f64,
        vx: f64,
        vy: f64,
    },

    /// Merge a partial ball update.
    Ball {
        conn_id: ConnectionId,
        delta: BallDelta,
    },

    /// Claim a goal for a team (raw wire string, validated here).
    Goal {
        team: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Request a snapshot of the match state.
    GetState {
        reply: oneshot::Sender<GameState>,
    },

    /// Shut down the room.
    Shutdown,
}

/// Handle to a running room actor. Cheap to clone — it's just an
/// `mpsc::Sender` wrapper. The `RoomDirectory` holds one per room.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's join code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Seats a connection, assigning a team by arrival order.
    pub async fn seat(
        &self,
        conn_id: ConnectionId,
        name: String,
        sender: PlayerSender,
        announce: bool,
    ) -> Result<SeatOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Seat {
                conn_id,
                name,
                sender,
                announce,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Removes a connection's occupant. No-op if not seated. Returns the
    /// remaining occupant count — the caller uses it to decide whether
    /// the room should be destroyed.
    pub async fn unseat(
        &self,
        conn_id: ConnectionId,
    ) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Unseat {
                conn_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Relays a position update (fire-and-forget).
    pub async fn player_move(
        &self,
        conn_id: ConnectionId,
        x: f64,
        y: f64,
        vx: f64,
        vy: f64,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Move { conn_id, x, y, vx, vy })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Relays a partial ball update (fire-and-forget).
    pub async fn ball_update(
        &self,
        conn_id: ConnectionId,
        delta: BallDelta,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Ball { conn_id, delta })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Records a goal for `team`, resetting the ball to the centre spot.
    pub async fn goal(&self, team: String) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Goal { team, reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Requests a snapshot of the match state.
    pub async fn game_state(&self) -> Result<GameState, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::GetState { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Tells the room to shut down. Fire-and-forget: if the channel is
    /// already closed the actor is gone anyway.
    pub fn shutdown(&self) {
        let _ = self.sender.try_send(RoomCommand::Shutdown);
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    code: RoomCode,
    players: HashMap<ConnectionId, PlayerState>,
    /// Per-occupant outbound channels, kept in sync with `players`.
    senders: HashMap<ConnectionId, PlayerSender>,
    ball: Ball,
    score: Score,
    /// Monotonic: set when the second occupant arrives, never cleared.
    game_active: bool,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        tracing::info!(room_code = %self.code, "room opened");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Seat {
                    conn_id,
                    name,
                    sender,
                    announce,
                    reply,
                } => {
                    let result =
                        self.handle_seat(conn_id, name, sender, announce);
                    let _ = reply.send(result);
                }
                RoomCommand::Unseat { conn_id, reply } => {
                    let count = self.handle_unseat(conn_id);
                    let _ = reply.send(count);
                }
                RoomCommand::Move { conn_id, x, y, vx, vy } => {
                    self.handle_move(conn_id, x, y, vx, vy);
                }
                RoomCommand::Ball { conn_id, delta } => {
                    self.handle_ball(conn_id, delta);
                }
                RoomCommand::Goal { team, reply } => {
                    let result = self.handle_goal(&team);
                    let _ = reply.send(result);
                }
                RoomCommand::GetState { reply } => {
                    let _ = reply.send(self.game_state());
                }
                RoomCommand::Shutdown => break,
            }
        }

        tracing::info!(room_code = %self.code, "room closed");
    }

    fn handle_seat(
        &mut self,
        conn_id: ConnectionId,
        name: String,
        sender: PlayerSender,
        announce: bool,
    ) -> Result<SeatOutcome, RoomError> {
        if self.players.len() >= MAX_OCCUPANTS {
            return Err(RoomError::RoomFull(self.code.clone()));
        }

        // Arrival order fixes the side: first in is home.
        let team = if self.players.is_empty() {
            Team::Home
        } else {
            Team::Away
        };
        self.players
            .insert(conn_id, PlayerState::spawn(name.clone(), team));
        self.senders.insert(conn_id, sender);

        let player_count = self.players.len();
        let started = player_count == MAX_OCCUPANTS;
        if started {
            self.game_active = true;
        }

        tracing::info!(
            room_code = %self.code,
            %conn_id,
            %team,
            occupants = player_count,
            "player seated"
        );

        if announce {
            // The joiner's own confirmation goes out first so it beats
            // the room-wide notices on their connection.
            self.send_to(
                conn_id,
                ServerEvent::JoinedRoom {
                    room_id: self.code.clone(),
                    player_id: conn_id,
                    players: self.players.clone(),
                },
            );
            self.dispatch(
                Recipient::All,
                ServerEvent::PlayerJoined {
                    player_id: conn_id,
                    player_name: name,
                    players: self.players.clone(),
                },
            );
            if started {
                self.dispatch(
                    Recipient::All,
                    ServerEvent::GameStart { state: self.game_state() },
                );
            }
        }

        Ok(SeatOutcome { team, player_count, started })
    }

    fn handle_unseat(&mut self, conn_id: ConnectionId) -> usize {
        if self.players.remove(&conn_id).is_none() {
            return self.players.len();
        }
        self.senders.remove(&conn_id);

        tracing::info!(
            room_code = %self.code,
            %conn_id,
            occupants = self.players.len(),
            "player left"
        );

        // game_active stays as-is: the flag is monotonic for the room's
        // lifetime even when the match is down to one player.
        self.dispatch(
            Recipient::All,
            ServerEvent::PlayerLeft {
                player_id: conn_id,
                players: self.players.clone(),
            },
        );

        self.players.len()
    }

    fn handle_move(
        &mut self,
        conn_id: ConnectionId,
        x: f64,
        y: f64,
        vx: f64,
        vy: f64,
    ) {
        // Unknown senders are dropped silently: best-effort relay.
        let Some(player) = self.players.get_mut(&conn_id) else {
            tracing::debug!(
                room_code = %self.code,
                %conn_id,
                "move from a connection not seated here, ignoring"
            );
            return;
        };
        player.x = x;
        player.y = y;
        player.vx = vx;
        player.vy = vy;

        self.dispatch(
            Recipient::AllExcept(conn_id),
            ServerEvent::GameUpdate {
                players: self.players.clone(),
                ball: self.ball,
            },
        );
    }

    fn handle_ball(&mut self, conn_id: ConnectionId, delta: BallDelta) {
        self.ball.apply(&delta);
        self.dispatch(
            Recipient::AllExcept(conn_id),
            ServerEvent::BallSync { ball: self.ball },
        );
    }

    fn handle_goal(&mut self, team: &str) -> Result<(), RoomError> {
        let team: Team = team
            .parse()
            .map_err(|()| RoomError::InvalidTeam(team.to_string()))?;

        self.score.record_goal(team);
        self.ball = Ball::kickoff();

        tracing::info!(
            room_code = %self.code,
            %team,
            home = self.score.home,
            away = self.score.away,
            "goal"
        );

        self.dispatch(
            Recipient::All,
            ServerEvent::GoalScored {
                team,
                score: self.score,
                ball: self.ball,
            },
        );
        Ok(())
    }

    fn game_state(&self) -> GameState {
        GameState {
            players: self.players.clone(),
            ball: self.ball,
            score: self.score,
            timer: MATCH_SECONDS,
            game_active: self.game_active,
        }
    }

    /// Fans an event out to the room's occupant set.
    fn dispatch(&self, recipient: Recipient, event: ServerEvent) {
        match recipient {
            Recipient::All => {
                for conn_id in self.senders.keys() {
                    self.send_to(*conn_id, event.clone());
                }
            }
            Recipient::AllExcept(excluded) => {
                for conn_id in self.senders.keys() {
                    if *conn_id != excluded {
                        self.send_to(*conn_id, event.clone());
                    }
                }
            }
        }
    }

    /// Sends an event to a single occupant. Silently drops if the
    /// receiver is gone (connection already closing).
    fn send_to(&self, conn_id: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&conn_id) {
            let _ = sender.send(event);
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
pub(crate) fn spawn_room(
    code: RoomCode,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        code: code.clone(),
        players: HashMap::new(),
        senders: HashMap::new(),
        ball: Ball::kickoff(),
        score: Score::default(),
        game_active: false,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
