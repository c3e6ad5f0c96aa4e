//! Room lifecycle management for Kickabout.
//!
//! Each room runs as an isolated Tokio task (actor model) owning one
//! match's state: two occupant slots, the ball, the score, and the
//! monotonic active flag. The actor's command channel is the mutual
//! exclusion for that room — a seat check and the seat itself can never
//! interleave with another occupant's arrival or departure.
//!
//! # Key types
//!
//! - [`RoomDirectory`] — room-code → room mapping, creation and
//!   garbage-collection of empty rooms, plus the connection registry
//!   (which connection sits in which room)
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`SeatOutcome`] — what a successful seat reports back
//! - [`RoomError`] — room-layer failures

mod directory;
mod error;
mod room;

pub use directory::RoomDirectory;
pub use error::RoomError;
pub use room::{PlayerSender, RoomHandle, SeatOutcome, MAX_OCCUPANTS};
