//! Core protocol types for Heartfield's wire format.
//!
//! Every frame on the wire is an [`Envelope`]. Its [`Payload`] is either a
//! [`SystemMessage`] the server core handles itself (handshake, heartbeat,
//! room membership, errors) or opaque game bytes the room layer decodes.

use serde::{Deserialize, Serialize};

use crate::{RoomCode, UserId};

// ---------------------------------------------------------------------------
// Recipient — who should receive a server event?
// ---------------------------------------------------------------------------

/// Who an event produced by a room action is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every connection currently joined to the room.
    All,

    /// Only the connection that issued the action (acknowledgements).
    Sender,
}

// ---------------------------------------------------------------------------
// SystemMessage — framework-level messages
// ---------------------------------------------------------------------------

/// Messages handled by the server core rather than the game rules.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
///   `{ "type": "JoinRoom", "code": "ABC123", "previous_user_id": null }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    // -- Connection lifecycle --
    /// Client → Server: first frame on every connection. `token` is the
    /// bearer token issued by the external identity provider.
    Handshake {
        version: u32,
        token: Option<String>,
    },

    /// Server → Client: the token was verified and a session is bound.
    /// `session_id` is the subject's session marker.
    HandshakeAck {
        user_id: UserId,
        session_id: String,
        server_time: u64,
    },

    /// Either direction: "I'm disconnecting."
    Disconnect { reason: String },

    // -- Heartbeat (keep-alive) --
    /// Client → Server: "I'm still here."
    Heartbeat { client_time: u64 },

    /// Server → Client: echo with the server clock.
    HeartbeatAck {
        client_time: u64,
        server_time: u64,
    },

    // -- Room membership --
    /// Client → Server: join (or create) the room with this code.
    ///
    /// `code` is optional so a missing code can be reported distinctly
    /// from a malformed one. `previous_user_id` names the identity this
    /// client played under before re-authenticating; when it matches a
    /// roster entry the entry is migrated instead of a new seat taken.
    JoinRoom {
        code: Option<String>,
        #[serde(default)]
        previous_user_id: Option<UserId>,
    },

    /// Server → Client: you are now seated in `code`.
    RoomJoined { code: RoomCode, user_id: UserId },

    /// Client → Server: "I'm leaving my room."
    LeaveRoom,

    /// Server → Client: you have left `code`.
    RoomLeft { code: RoomCode },

    // -- Errors --
    /// Server → Client: an action was rejected.
    ///
    /// `code` follows HTTP-style conventions (400 bad request, 401
    /// unauthorized, 404 not found, 409 conflict, 429 too many). `kind`
    /// is a stable machine-readable name such as `"NotYourTurn"`.
    Error {
        code: u16,
        kind: String,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Payload — what's inside an envelope
// ---------------------------------------------------------------------------

/// The content of a message: either a system message or game data.
///
/// Adjacently tagged:
///   `{ "type": "System", "data": { "type": "Heartbeat", ... } }`
///   `{ "type": "Game", "data": [123, 34, ...] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// A core-level message (handshake, heartbeat, membership, errors).
    System(SystemMessage),

    /// A codec-encoded game action (client → server) or room event
    /// (server → client). Opaque at this layer.
    Game(Vec<u8>),
}

// ---------------------------------------------------------------------------
// Envelope — the top-level wire format
// ---------------------------------------------------------------------------

/// The top-level message wrapper. Every frame on the wire is an Envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-connection, per-direction sequence number.
    pub seq: u64,

    /// Milliseconds since the server started.
    pub timestamp: u64,

    /// The actual message content.
    pub payload: Payload,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! JSON-shape tests. Browser clients parse these frames by hand, so a
    //! drifting serde attribute is a breaking change.

    use super::*;

    #[test]
    fn test_system_message_handshake_json_format() {
        let msg = SystemMessage::Handshake {
            version: 1,
            token: Some("abc".into()),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "Handshake");
        assert_eq!(json["version"], 1);
        assert_eq!(json["token"], "abc");
    }

    #[test]
    fn test_system_message_handshake_ack_json_format() {
        let msg = SystemMessage::HandshakeAck {
            user_id: UserId::new("65f0a1b2c3d4e5f60718293a"),
            session_id: "marker".into(),
            server_time: 15000,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "HandshakeAck");
        assert_eq!(json["user_id"], "65f0a1b2c3d4e5f60718293a");
        assert_eq!(json["session_id"], "marker");
    }

    #[test]
    fn test_system_message_join_room_previous_user_defaults_to_none() {
        let msg: SystemMessage =
            serde_json::from_str(r#"{"type":"JoinRoom","code":"abc123"}"#)
                .unwrap();
        assert_eq!(
            msg,
            SystemMessage::JoinRoom {
                code: Some("abc123".into()),
                previous_user_id: None,
            }
        );
    }

    #[test]
    fn test_system_message_join_room_accepts_null_code() {
        let msg: SystemMessage =
            serde_json::from_str(r#"{"type":"JoinRoom","code":null}"#)
                .unwrap();
        assert!(matches!(msg, SystemMessage::JoinRoom { code: None, .. }));
    }

    #[test]
    fn test_system_message_room_joined_rejects_invalid_code() {
        let raw = r#"{"type":"RoomJoined","code":"TOOLONG1","user_id":"u"}"#;
        let result: Result<SystemMessage, _> = serde_json::from_str(raw);
        assert!(result.is_err());
    }

    #[test]
    fn test_system_message_error_json_format() {
        let msg = SystemMessage::Error {
            code: 409,
            kind: "NotYourTurn".into(),
            message: "it is not your turn".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], 409);
        assert_eq!(json["kind"], "NotYourTurn");
    }

    #[test]
    fn test_payload_system_json_format() {
        let payload = Payload::System(SystemMessage::LeaveRoom);
        let json: serde_json::Value =
            serde_json::to_value(&payload).unwrap();

        assert_eq!(json["type"], "System");
        assert_eq!(json["data"]["type"], "LeaveRoom");
    }

    #[test]
    fn test_payload_game_json_format() {
        let payload = Payload::Game(vec![1, 2, 3]);
        let json: serde_json::Value =
            serde_json::to_value(&payload).unwrap();

        assert_eq!(json["type"], "Game");
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_decode_unknown_system_message_type_returns_error() {
        let unknown = r#"{"type": "FlyToMoon", "speed": 9000}"#;
        let result: Result<SystemMessage, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_recipient_serializes_as_variant_name() {
        let json = serde_json::to_string(&Recipient::Sender).unwrap();
        assert_eq!(json, "\"Sender\"");
    }
}
