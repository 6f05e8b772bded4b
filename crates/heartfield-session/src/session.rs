//! The per-subject session record.
//!
//! A "session" is the server's record of an authenticated player. It tracks:
//! - WHO the player is (`user_id`, `name`, `email`)
//! - WHICH connection currently speaks for them (`current_socket_id`)
//! - WHEN we last heard from them (`last_seen`)
//! - WHETHER they are online (`is_active`)
//!
//! Sessions outlive connections: a reconnect rebinds the same record to a
//! fresh [`ConnectionId`] instead of creating a new one.

use heartfield_protocol::{now_millis, ConnectionId, UserId};
use serde::{Deserialize, Serialize};

/// One logical session per authenticated subject.
///
/// Serialized with camelCase field names; this is the exact document shape
/// mirrored to the session collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSession {
    pub user_id: UserId,

    /// The identity provider's session marker for this login.
    pub user_session_id: String,

    pub name: String,

    #[serde(default)]
    pub email: String,

    /// The connection currently bound to this subject, if any.
    #[serde(default)]
    pub current_socket_id: Option<ConnectionId>,

    /// Wall-clock milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_seen: u64,

    #[serde(default)]
    pub is_active: bool,
}

impl PlayerSession {
    /// A fresh, active session with no bound connection.
    pub fn new(
        user_id: UserId,
        user_session_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            user_session_id: user_session_id.into(),
            name: name.into(),
            email: email.into(),
            current_socket_id: None,
            last_seen: now_millis(),
            is_active: true,
        }
    }

    /// Refreshes `last_seen` and marks the session active.
    pub fn touch(&mut self) {
        self.last_seen = now_millis();
        self.is_active = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_session_new_is_active_and_unbound() {
        let session = PlayerSession::new(
            UserId::new("65f0a1b2c3d4e5f60718293a"),
            "marker",
            "Alice",
            "alice@example.com",
        );

        assert!(session.is_active);
        assert!(session.current_socket_id.is_none());
        assert!(session.last_seen > 0);
    }

    #[test]
    fn test_player_session_document_uses_camel_case() {
        let mut session = PlayerSession::new(
            UserId::new("65f0a1b2c3d4e5f60718293a"),
            "marker",
            "Alice",
            "",
        );
        session.current_socket_id = Some(ConnectionId::new(7));

        let doc = serde_json::to_value(&session).unwrap();

        assert_eq!(doc["userId"], "65f0a1b2c3d4e5f60718293a");
        assert_eq!(doc["userSessionId"], "marker");
        assert_eq!(doc["currentSocketId"], 7);
        assert_eq!(doc["isActive"], true);
    }

    #[test]
    fn test_player_session_missing_optional_fields_default() {
        let doc = serde_json::json!({
            "userId": "65f0a1b2c3d4e5f60718293a",
            "userSessionId": "m",
            "name": "Bob",
        });

        let session: PlayerSession = serde_json::from_value(doc).unwrap();

        assert!(!session.is_active);
        assert_eq!(session.email, "");
        assert_eq!(session.current_socket_id, None);
    }
}
