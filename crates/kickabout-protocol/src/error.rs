//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire events.
///
/// Decode failures are expected in normal operation — the relay absorbs
/// malformed frames rather than dropping the connection — so these carry
/// enough detail to log and move on.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
