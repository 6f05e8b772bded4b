//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The same codec encodes the outer [`Envelope`](crate::Envelope) and the
//! game payload carried inside `Payload::Game`, so a server only ever picks
//! one wire format.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Browser clients can read it without a schema, which is what the
/// real-time surface targets.
///
/// ```rust
/// use heartfield_protocol::{Codec, Envelope, JsonCodec, Payload, SystemMessage};
///
/// let codec = JsonCodec;
/// let envelope = Envelope {
///     seq: 1,
///     timestamp: 5000,
///     payload: Payload::System(SystemMessage::Heartbeat { client_time: 5000 }),
/// };
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Envelope, Payload, SystemMessage};

    #[test]
    fn test_json_codec_decode_garbage_returns_decode_error() {
        let result: Result<Envelope, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_game_payload_nests_inside_envelope() {
        // Game actions are encoded first, then wrapped; the outer decode
        // must hand back the exact inner bytes.
        let inner = JsonCodec
            .encode(&serde_json::json!({ "type": "EndTurn" }))
            .unwrap();
        let envelope = Envelope {
            seq: 3,
            timestamp: 10,
            payload: Payload::Game(inner.clone()),
        };
        let bytes = JsonCodec.encode(&envelope).unwrap();
        let decoded: Envelope = JsonCodec.decode(&bytes).unwrap();
        assert_eq!(decoded.payload, Payload::Game(inner));
    }

    #[test]
    fn test_json_codec_system_message_survives_encode() {
        let msg = SystemMessage::LeaveRoom;
        let bytes = JsonCodec.encode(&msg).unwrap();
        let decoded: SystemMessage = JsonCodec.decode(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }
}
