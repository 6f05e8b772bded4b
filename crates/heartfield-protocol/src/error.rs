//! Error types for the protocol layer.
//!
//! Each crate in Heartfield defines its own error enum. When you see a
//! `ProtocolError`, the problem is in serialization or in a malformed
//! identifier, not in networking or game rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields,
    /// wrong data types, or truncated messages.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message is invalid at the protocol level, e.g. the first
    /// frame was not a handshake or carried the wrong version.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A room code was not exactly six ASCII alphanumerics.
    #[error("invalid room code {0:?}")]
    InvalidRoomCode(String),
}
