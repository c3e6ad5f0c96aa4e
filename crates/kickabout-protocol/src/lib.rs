//! Wire protocol for Kickabout.
//!
//! This crate defines the language that browser clients and the relay
//! speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`GameState`], etc.) —
//!   the event structures that travel on the wire, one event-kind tag
//!   per message.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those events are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer sits between transport (raw frames) and the room
//! layer (match state). It doesn't know about connections or rooms — it
//! only knows how to serialize and deserialize events.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Ball, BallDelta, ClientEvent, GameState, MATCH_SECONDS, PlayerState,
    Recipient, RoomCode, Score, ServerEvent, Team,
};
