//! Integration tests for the room directory and room actors.
//!
//! Each test drives the directory the way the event router does: per
//! occupant, an unbounded channel stands in for the connection's writer
//! task, and `try_recv` (after a short sleep where the actor needs a
//! moment) observes what the room fanned out.

use std::time::Duration;

use kickabout_protocol::{
    Ball, BallDelta, RoomCode, ServerEvent, Team,
};
use kickabout_room::{PlayerSender, RoomDirectory, RoomError};
use kickabout_transport::ConnectionId;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

fn cid(id: u64) -> ConnectionId {
    ConnectionId::new(id)
}

/// Creates a dummy occupant sender (receiver is dropped immediately).
fn dummy_sender() -> PlayerSender {
    mpsc::unbounded_channel().0
}

type EventRx = mpsc::UnboundedReceiver<ServerEvent>;

fn channel() -> (PlayerSender, EventRx) {
    mpsc::unbounded_channel()
}

/// Gives a room actor a moment to process fire-and-forget commands.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Creates a room with one occupant and returns its code plus the
/// creator's receiver.
async fn one_seat_room(dir: &mut RoomDirectory) -> (RoomCode, EventRx) {
    let (tx, rx) = channel();
    let (code, outcome) = dir
        .create_room(cid(1), "Host".into(), tx)
        .await
        .expect("create should succeed");
    assert_eq!(outcome.team, Team::Home);
    (code, rx)
}

// =========================================================================
// Creation and seating
// =========================================================================

#[tokio::test]
async fn test_create_room_returns_unique_codes() {
    let mut dir = RoomDirectory::new();
    let (c1, _) = dir
        .create_room(cid(1), "A".into(), dummy_sender())
        .await
        .unwrap();
    let (c2, _) = dir
        .create_room(cid(2), "B".into(), dummy_sender())
        .await
        .unwrap();
    assert_ne!(c1, c2);
    assert_eq!(dir.room_count(), 2);
}

#[tokio::test]
async fn test_creator_is_seated_home_at_spawn() {
    let mut dir = RoomDirectory::new();
    let (code, outcome) = dir
        .create_room(cid(1), "Host".into(), dummy_sender())
        .await
        .unwrap();

    assert_eq!(outcome.team, Team::Home);
    assert_eq!(outcome.player_count, 1);
    assert!(!outcome.started);

    let state = dir.get(&code).unwrap().game_state().await.unwrap();
    let host = &state.players[&cid(1)];
    assert_eq!(host.name, "Host");
    assert_eq!((host.x, host.y), (200.0, 300.0));
    assert_eq!((host.vx, host.vy), (0.0, 0.0));
    assert!(!state.game_active);
    assert_eq!(state.ball, Ball::kickoff());
    assert_eq!(state.timer, 300);
}

#[tokio::test]
async fn test_second_join_seats_away_and_starts_game() {
    let mut dir = RoomDirectory::new();
    let (code, _host_rx) = one_seat_room(&mut dir).await;

    let outcome = dir
        .join_room(&code, cid(2), "Guest".into(), dummy_sender())
        .await
        .unwrap();

    assert_eq!(outcome.team, Team::Away);
    assert_eq!(outcome.player_count, 2);
    assert!(outcome.started);

    let state = dir.get(&code).unwrap().game_state().await.unwrap();
    assert!(state.game_active);
    let guest = &state.players[&cid(2)];
    assert_eq!((guest.x, guest.y), (600.0, 300.0));
}

#[tokio::test]
async fn test_join_unknown_code_is_not_found() {
    let mut dir = RoomDirectory::new();
    let result = dir
        .join_room(
            &RoomCode::new("000000000000"),
            cid(1),
            "Guest".into(),
            dummy_sender(),
        )
        .await;
    assert!(matches!(result, Err(RoomError::NotFound(_))));
}

#[tokio::test]
async fn test_third_join_fails_room_full_and_leaves_room_unchanged() {
    let mut dir = RoomDirectory::new();
    let (code, _host_rx) = one_seat_room(&mut dir).await;
    dir.join_room(&code, cid(2), "Guest".into(), dummy_sender())
        .await
        .unwrap();

    let result = dir
        .join_room(&code, cid(3), "Latecomer".into(), dummy_sender())
        .await;
    assert!(matches!(result, Err(RoomError::RoomFull(_))));

    let state = dir.get(&code).unwrap().game_state().await.unwrap();
    assert_eq!(state.players.len(), 2);
    assert!(!state.players.contains_key(&cid(3)));
    assert_eq!(dir.member_room(cid(3)), None);
}

#[tokio::test]
async fn test_connection_cannot_occupy_two_rooms() {
    let mut dir = RoomDirectory::new();
    let (_c1, _rx) = one_seat_room(&mut dir).await;
    let (c2, _) = dir
        .create_room(cid(2), "Other".into(), dummy_sender())
        .await
        .unwrap();

    let result = dir
        .join_room(&c2, cid(1), "Host".into(), dummy_sender())
        .await;
    assert!(matches!(result, Err(RoomError::AlreadySeated(..))));

    let result = dir
        .create_room(cid(1), "Host".into(), dummy_sender())
        .await;
    assert!(matches!(result, Err(RoomError::AlreadySeated(..))));
}

#[tokio::test]
async fn test_team_assignment_is_a_bijection_after_churn() {
    // Seat, clear the room, seat two fresh connections: the first of
    // the new pair must be home again.
    let mut dir = RoomDirectory::new();
    let (code, _rx) = one_seat_room(&mut dir).await;
    dir.join_room(&code, cid(2), "B".into(), dummy_sender())
        .await
        .unwrap();

    dir.disconnect(cid(2)).await;
    let outcome = dir
        .join_room(&code, cid(3), "C".into(), dummy_sender())
        .await
        .unwrap();
    assert_eq!(outcome.team, Team::Away);

    let state = dir.get(&code).unwrap().game_state().await.unwrap();
    let teams: Vec<Team> =
        state.players.values().map(|p| p.team).collect();
    assert!(teams.contains(&Team::Home));
    assert!(teams.contains(&Team::Away));
}

// =========================================================================
// Join notices
// =========================================================================

#[tokio::test]
async fn test_joiner_gets_confirmation_then_notice_then_game_start() {
    let mut dir = RoomDirectory::new();
    let (code, _host_rx) = one_seat_room(&mut dir).await;

    let (tx, mut rx) = channel();
    dir.join_room(&code, cid(2), "Guest".into(), tx)
        .await
        .unwrap();
    settle().await;

    match rx.try_recv().expect("joiner should get joined_room first") {
        ServerEvent::JoinedRoom { room_id, player_id, players } => {
            assert_eq!(room_id, code);
            assert_eq!(player_id, cid(2));
            assert_eq!(players.len(), 2);
        }
        other => panic!("expected JoinedRoom, got {other:?}"),
    }
    assert!(matches!(
        rx.try_recv().expect("then player_joined"),
        ServerEvent::PlayerJoined { .. }
    ));
    match rx.try_recv().expect("then game_start") {
        ServerEvent::GameStart { state } => {
            assert!(state.game_active);
            assert_eq!(state.players.len(), 2);
            assert_eq!(state.ball, Ball::kickoff());
        }
        other => panic!("expected GameStart, got {other:?}"),
    }
}

#[tokio::test]
async fn test_host_is_notified_of_join_and_start() {
    let mut dir = RoomDirectory::new();
    let (code, mut host_rx) = one_seat_room(&mut dir).await;

    dir.join_room(&code, cid(2), "Guest".into(), dummy_sender())
        .await
        .unwrap();
    settle().await;

    match host_rx.try_recv().expect("host should get player_joined") {
        ServerEvent::PlayerJoined { player_id, player_name, players } => {
            assert_eq!(player_id, cid(2));
            assert_eq!(player_name, "Guest");
            assert_eq!(players.len(), 2);
        }
        other => panic!("expected PlayerJoined, got {other:?}"),
    }
    assert!(matches!(
        host_rx.try_recv().expect("host should get game_start"),
        ServerEvent::GameStart { .. }
    ));
}

#[tokio::test]
async fn test_creator_gets_no_notices_for_their_own_seat() {
    let mut dir = RoomDirectory::new();
    let (_code, mut host_rx) = one_seat_room(&mut dir).await;
    settle().await;
    assert!(host_rx.try_recv().is_err());
}

// =========================================================================
// Relay: moves and ball
// =========================================================================

/// Two-occupant room: returns (code, host_rx, guest_rx) with the join
/// notices already drained.
async fn full_room(
    dir: &mut RoomDirectory,
) -> (RoomCode, EventRx, EventRx) {
    let (host_tx, mut host_rx) = channel();
    let (code, _) = dir
        .create_room(cid(1), "Host".into(), host_tx)
        .await
        .unwrap();
    let (guest_tx, mut guest_rx) = channel();
    dir.join_room(&code, cid(2), "Guest".into(), guest_tx)
        .await
        .unwrap();
    settle().await;
    while host_rx.try_recv().is_ok() {}
    while guest_rx.try_recv().is_ok() {}
    (code, host_rx, guest_rx)
}

#[tokio::test]
async fn test_move_is_mirrored_to_everyone_but_the_mover() {
    let mut dir = RoomDirectory::new();
    let (code, mut host_rx, mut guest_rx) = full_room(&mut dir).await;

    dir.player_move(&code, cid(1), 250.0, 280.0, 1.5, -2.0)
        .await
        .unwrap();
    settle().await;

    match guest_rx.try_recv().expect("guest should get game_update") {
        ServerEvent::GameUpdate { players, ball } => {
            let mover = &players[&cid(1)];
            assert_eq!((mover.x, mover.y), (250.0, 280.0));
            assert_eq!((mover.vx, mover.vy), (1.5, -2.0));
            assert_eq!(ball, Ball::kickoff());
        }
        other => panic!("expected GameUpdate, got {other:?}"),
    }
    assert!(
        host_rx.try_recv().is_err(),
        "the mover must not get their own update echoed back"
    );
}

#[tokio::test]
async fn test_move_from_unseated_connection_is_ignored() {
    let mut dir = RoomDirectory::new();
    let (code, mut host_rx, mut guest_rx) = full_room(&mut dir).await;

    dir.player_move(&code, cid(99), 1.0, 1.0, 0.0, 0.0)
        .await
        .unwrap();
    settle().await;

    assert!(host_rx.try_recv().is_err());
    assert!(guest_rx.try_recv().is_err());
    let state = dir.get(&code).unwrap().game_state().await.unwrap();
    assert_eq!(state.players.len(), 2);
}

#[tokio::test]
async fn test_ball_update_merges_partial_fields_and_excludes_sender() {
    let mut dir = RoomDirectory::new();
    let (code, mut host_rx, mut guest_rx) = full_room(&mut dir).await;

    dir.ball_update(
        &code,
        cid(2),
        BallDelta { x: Some(420.0), vx: Some(3.0), ..Default::default() },
    )
    .await
    .unwrap();
    settle().await;

    match host_rx.try_recv().expect("host should get ball_sync") {
        ServerEvent::BallSync { ball } => {
            assert_eq!(ball.x, 420.0);
            assert_eq!(ball.y, 300.0); // untouched
            assert_eq!(ball.vx, 3.0);
            assert_eq!(ball.vy, 0.0); // untouched
        }
        other => panic!("expected BallSync, got {other:?}"),
    }
    assert!(guest_rx.try_recv().is_err());
}

// =========================================================================
// Goals
// =========================================================================

#[tokio::test]
async fn test_goal_increments_one_counter_and_resets_ball() {
    let mut dir = RoomDirectory::new();
    let (code, mut host_rx, mut guest_rx) = full_room(&mut dir).await;

    // Move the ball off the spot first so the reset is observable.
    dir.ball_update(
        &code,
        cid(1),
        BallDelta { x: Some(50.0), y: Some(290.0), ..Default::default() },
    )
    .await
    .unwrap();
    settle().await;
    while guest_rx.try_recv().is_ok() {}

    dir.goal(&code, "home".into()).await.unwrap();
    settle().await;

    // Everyone gets the goal notice, scorer included.
    for rx in [&mut host_rx, &mut guest_rx] {
        match rx.try_recv().expect("both occupants should get the goal") {
            ServerEvent::GoalScored { team, score, ball } => {
                assert_eq!(team, Team::Home);
                assert_eq!(score.home, 1);
                assert_eq!(score.away, 0);
                assert_eq!(ball, Ball::kickoff());
            }
            other => panic!("expected GoalScored, got {other:?}"),
        }
    }

    let state = dir.get(&code).unwrap().game_state().await.unwrap();
    assert_eq!(state.score.home, 1);
    assert_eq!(state.ball, Ball::kickoff());
}

#[tokio::test]
async fn test_invalid_team_leaves_score_and_ball_unchanged() {
    let mut dir = RoomDirectory::new();
    let (code, mut host_rx, _guest_rx) = full_room(&mut dir).await;

    dir.ball_update(
        &code,
        cid(2),
        BallDelta { x: Some(111.0), ..Default::default() },
    )
    .await
    .unwrap();
    settle().await;
    while host_rx.try_recv().is_ok() {}

    let result = dir.goal(&code, "referee".into()).await;
    assert!(matches!(result, Err(RoomError::InvalidTeam(_))));
    settle().await;

    assert!(host_rx.try_recv().is_err(), "no broadcast on invalid team");
    let state = dir.get(&code).unwrap().game_state().await.unwrap();
    assert_eq!(state.score.home, 0);
    assert_eq!(state.score.away, 0);
    assert_eq!(state.ball.x, 111.0, "ball must not be reset");
}

// =========================================================================
// Disconnect and room lifecycle
// =========================================================================

#[tokio::test]
async fn test_disconnect_notifies_remaining_occupant() {
    let mut dir = RoomDirectory::new();
    let (code, _host_rx, mut guest_rx) = full_room(&mut dir).await;

    let left = dir.disconnect(cid(1)).await;
    assert_eq!(left, Some(code.clone()));
    settle().await;

    match guest_rx.try_recv().expect("guest should get player_left") {
        ServerEvent::PlayerLeft { player_id, players } => {
            assert_eq!(player_id, cid(1));
            assert_eq!(players.len(), 1);
            assert!(players.contains_key(&cid(2)));
        }
        other => panic!("expected PlayerLeft, got {other:?}"),
    }

    // One occupant remains: the room persists.
    assert_eq!(dir.room_count(), 1);
    assert!(dir.get(&code).is_some());
}

#[tokio::test]
async fn test_last_disconnect_removes_the_room() {
    let mut dir = RoomDirectory::new();
    let (code, _host_rx, _guest_rx) = full_room(&mut dir).await;

    dir.disconnect(cid(1)).await;
    dir.disconnect(cid(2)).await;

    assert_eq!(dir.room_count(), 0);
    assert!(dir.get(&code).is_none());

    // The code is gone for good: a later join must see NotFound.
    let result = dir
        .join_room(&code, cid(3), "Late".into(), dummy_sender())
        .await;
    assert!(matches!(result, Err(RoomError::NotFound(_))));
}

#[tokio::test]
async fn test_creator_disconnect_before_anyone_joins_removes_room() {
    let mut dir = RoomDirectory::new();
    let (code, _rx) = one_seat_room(&mut dir).await;

    dir.disconnect(cid(1)).await;
    assert_eq!(dir.room_count(), 0);
    assert!(dir.get(&code).is_none());
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let mut dir = RoomDirectory::new();
    let (code, _host_rx, _guest_rx) = full_room(&mut dir).await;

    assert_eq!(dir.disconnect(cid(1)).await, Some(code));
    assert_eq!(dir.disconnect(cid(1)).await, None);
    assert_eq!(dir.disconnect(cid(77)).await, None);
    assert_eq!(dir.room_count(), 1);
}

#[tokio::test]
async fn test_game_active_survives_unseat() {
    let mut dir = RoomDirectory::new();
    let (code, _host_rx, _guest_rx) = full_room(&mut dir).await;

    dir.disconnect(cid(2)).await;

    let state = dir.get(&code).unwrap().game_state().await.unwrap();
    assert!(
        state.game_active,
        "active flag must not revert when an occupant leaves"
    );
}

#[tokio::test]
async fn test_departed_occupant_receives_nothing_further() {
    let mut dir = RoomDirectory::new();
    let (code, mut host_rx, _guest_rx) = full_room(&mut dir).await;

    dir.disconnect(cid(1)).await;
    settle().await;
    while host_rx.try_recv().is_ok() {}

    dir.player_move(&code, cid(2), 610.0, 305.0, 0.0, 0.0)
        .await
        .unwrap();
    settle().await;

    assert!(host_rx.try_recv().is_err());
}
