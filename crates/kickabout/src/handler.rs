//! Per-connection handler: the event router.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler. The flow is:
//!   1. Spawn a writer task pumping the connection's outbound channel
//!      (the sender the room actor broadcasts into) onto the socket.
//!   2. Loop: decode inbound `ClientEvent` frames, resolve the room via
//!      the directory, dispatch.
//!   3. On any exit path, unseat the connection from its room.
//!
//! Validation is uniform and best-effort: an unknown room code earns
//! the sender a `room_not_found`, a full room earns `room_full`, and
//! everything else malformed is logged at debug level and dropped.

use std::sync::Arc;

use kickabout_protocol::{ClientEvent, Codec, ServerEvent};
use kickabout_room::{PlayerSender, RoomError};
use kickabout_transport::{
    Connection, ConnectionId, WebSocketConnection,
};

use crate::KickaboutError;
use crate::server::ServerState;

/// Drop guard that unseats a connection when its handler exits.
///
/// Cleanup runs even if the handler errors or panics. `Drop` is
/// synchronous, so the async directory work is spawned fire-and-forget;
/// `RoomDirectory::disconnect` is idempotent, so a stray double-fire is
/// harmless.
struct RoomGuard {
    conn_id: ConnectionId,
    state: Arc<ServerState>,
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut rooms = state.rooms.lock().await;
            if let Some(code) = rooms.disconnect(conn_id).await {
                tracing::info!(
                    %conn_id,
                    room_code = %code,
                    "connection unseated on disconnect"
                );
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), KickaboutError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let conn = Arc::new(conn);

    // Outbound path: room broadcasts and direct replies both flow
    // through this channel, so one writer owns the socket's send side
    // and the relative order of events is preserved per connection.
    let (tx, mut rx) =
        tokio::sync::mpsc::unbounded_channel::<ServerEvent>();
    let writer = tokio::spawn({
        let conn = Arc::clone(&conn);
        let codec = state.codec;
        async move {
            while let Some(event) = rx.recv().await {
                let bytes = match codec.encode(&event) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::error!(error = %e, "encode failed");
                        continue;
                    }
                };
                if conn.send(&bytes).await.is_err() {
                    break;
                }
            }
        }
    });

    let guard = RoomGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(
                    %conn_id, error = %e,
                    "undecodable frame, ignoring"
                );
                continue;
            }
        };

        dispatch(&state, conn_id, &tx, event).await;
    }

    // Unseat before waiting on the writer: the room actor holds a clone
    // of `tx`, so the writer's channel only closes once the disconnect
    // has released it.
    drop(tx);
    drop(guard);
    let _ = writer.await;
    Ok(())
}

/// Routes one inbound event: resolve the room, mutate, reply.
///
/// Directory lock scope: held for the room operation, released before
/// anything that waits on the network (replies go through the unbounded
/// channel, which never blocks).
async fn dispatch(
    state: &Arc<ServerState>,
    conn_id: ConnectionId,
    tx: &PlayerSender,
    event: ClientEvent,
) {
    match event {
        ClientEvent::CreateRoom { player_name } => {
            let result = {
                let mut rooms = state.rooms.lock().await;
                rooms
                    .create_room(conn_id, player_name, tx.clone())
                    .await
            };
            match result {
                Ok((room_id, _outcome)) => {
                    let _ = tx.send(ServerEvent::RoomCreated {
                        room_id,
                        player_id: conn_id,
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        %conn_id, error = %e, "create_room rejected"
                    );
                }
            }
        }

        ClientEvent::JoinRoom { room_id, player_name } => {
            let result = {
                let mut rooms = state.rooms.lock().await;
                rooms
                    .join_room(&room_id, conn_id, player_name, tx.clone())
                    .await
            };
            // The room actor delivers joined_room / player_joined /
            // game_start itself; only failures are answered here.
            if let Err(e) = result {
                reject(conn_id, tx, e);
            }
        }

        ClientEvent::PlayerMove { room_id, x, y, vx, vy } => {
            let result = {
                let rooms = state.rooms.lock().await;
                rooms.player_move(&room_id, conn_id, x, y, vx, vy).await
            };
            if let Err(e) = result {
                reject(conn_id, tx, e);
            }
        }

        ClientEvent::BallUpdate { room_id, ball } => {
            let result = {
                let rooms = state.rooms.lock().await;
                rooms.ball_update(&room_id, conn_id, ball).await
            };
            if let Err(e) = result {
                reject(conn_id, tx, e);
            }
        }

        ClientEvent::GoalScored { room_id, team } => {
            let result = {
                let rooms = state.rooms.lock().await;
                rooms.goal(&room_id, team).await
            };
            if let Err(e) = result {
                reject(conn_id, tx, e);
            }
        }
    }
}

/// Applies the uniform validation policy to a failed room operation:
/// `room_not_found` and `room_full` go back to the sender as bare
/// notices; everything else is absorbed with a debug log.
fn reject(conn_id: ConnectionId, tx: &PlayerSender, err: RoomError) {
    match err {
        RoomError::NotFound(_) | RoomError::Unavailable(_) => {
            let _ = tx.send(ServerEvent::RoomNotFound);
        }
        RoomError::RoomFull(_) => {
            let _ = tx.send(ServerEvent::RoomFull);
        }
        other => {
            tracing::debug!(
                %conn_id, error = %other, "event rejected silently"
            );
        }
    }
}
