//! The session registry: one [`PlayerSession`] per authenticated subject.
//!
//! The in-memory map is authoritative. Every change is mirrored to the
//! session collection of a [`DocumentStore`]; a failed write is logged and
//! does not roll the in-memory record back.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself. The server wraps it in a
//! `tokio::sync::Mutex` and holds that lock across the store write, which
//! keeps the mirror in the same order as the in-memory changes.

use std::collections::HashMap;
use std::sync::Arc;

use heartfield_protocol::{ConnectionId, UserId};

use crate::{DocumentStore, Identity, PlayerSession, StoreError};

/// Tracks every known player session, keyed by subject id.
///
/// ## Lifecycle
///
/// ```text
/// load_active() ──→ bind_socket() ──→ disconnect()
///                        ↑                 │
///                        └──(reconnect)────┘
/// ```
pub struct SessionRegistry<D> {
    sessions: HashMap<UserId, PlayerSession>,
    store: Arc<D>,
}

impl<D: DocumentStore> SessionRegistry<D> {
    /// Creates an empty registry mirrored to `store`.
    pub fn new(store: Arc<D>) -> Self {
        Self {
            sessions: HashMap::new(),
            store,
        }
    }

    /// Loads every active session from the store into memory.
    ///
    /// A failed read yields an empty registry rather than an error.
    /// Documents without a `userId`, or that otherwise fail to parse, are
    /// skipped with a warning. Returns the number of sessions loaded.
    pub async fn load_active(&mut self) -> usize {
        let docs = match self.store.find().await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::error!(error = %e, "failed to load sessions");
                return 0;
            }
        };

        let mut loaded = 0;
        for doc in docs {
            if doc.get("userId").and_then(|v| v.as_str()).is_none() {
                tracing::warn!("skipping session document without userId");
                continue;
            }
            let session: PlayerSession = match serde_json::from_value(doc) {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed session document");
                    continue;
                }
            };
            if !session.is_active {
                continue;
            }
            self.sessions.insert(session.user_id.clone(), session);
            loaded += 1;
        }

        tracing::info!(count = loaded, "active sessions loaded");
        loaded
    }

    /// Returns the session for `user_id`, creating it if needed.
    ///
    /// A new session starts active with no bound connection. An existing
    /// one has `last_seen` refreshed, is marked active, and takes the new
    /// marker, name and email only where they are non-empty.
    pub async fn get_or_create_session(
        &mut self,
        user_id: &UserId,
        session_marker: &str,
        name: &str,
        email: &str,
    ) -> Result<PlayerSession, StoreError> {
        let session = match self.sessions.get_mut(user_id) {
            Some(existing) => {
                existing.touch();
                if !session_marker.is_empty() {
                    existing.user_session_id = session_marker.to_string();
                }
                if !name.is_empty() {
                    existing.name = name.to_string();
                }
                if !email.is_empty() {
                    existing.email = email.to_string();
                }
                existing.clone()
            }
            None => {
                let session = PlayerSession::new(
                    user_id.clone(),
                    session_marker,
                    name,
                    email,
                );
                tracing::info!(%user_id, "session created");
                self.sessions.insert(user_id.clone(), session.clone());
                session
            }
        };

        self.persist(&session).await?;
        Ok(session)
    }

    /// Binds `socket_id` to the subject's session, creating it if needed.
    ///
    /// A write failure is logged; the in-memory binding stands.
    pub async fn bind_socket(
        &mut self,
        identity: &Identity,
        socket_id: ConnectionId,
    ) -> PlayerSession {
        let session = self
            .sessions
            .entry(identity.user_id.clone())
            .or_insert_with(|| {
                PlayerSession::new(
                    identity.user_id.clone(),
                    identity.user_session_id.clone(),
                    identity.user_name.clone(),
                    identity.user_email.clone(),
                )
            });
        session.touch();
        session.user_session_id = identity.user_session_id.clone();
        session.name = identity.user_name.clone();
        session.email = identity.user_email.clone();
        let previous = session.current_socket_id.replace(socket_id);
        let session = session.clone();

        tracing::info!(
            user_id = %identity.user_id,
            conn_id = %socket_id,
            previous = ?previous,
            "session bound"
        );

        if let Err(e) = self.persist(&session).await {
            tracing::error!(user_id = %identity.user_id, error = %e, "failed to persist session binding");
        }
        session
    }

    /// Marks the subject offline if `socket_id` is still its bound
    /// connection.
    ///
    /// Returns `false` (and changes nothing) when another connection has
    /// taken over since, so a late disconnect cannot clobber a reconnect.
    pub async fn disconnect(
        &mut self,
        user_id: &UserId,
        socket_id: ConnectionId,
    ) -> bool {
        let Some(session) = self.sessions.get_mut(user_id) else {
            return false;
        };
        if session.current_socket_id != Some(socket_id) {
            tracing::debug!(%user_id, conn_id = %socket_id, "stale disconnect ignored");
            return false;
        }

        session.current_socket_id = None;
        session.is_active = false;
        session.last_seen = heartfield_protocol::now_millis();
        let session = session.clone();

        tracing::info!(%user_id, conn_id = %socket_id, "session inactive");

        if let Err(e) = self.persist(&session).await {
            tracing::error!(%user_id, error = %e, "failed to persist disconnect");
        }
        true
    }

    /// Looks up a session by subject id.
    pub fn get(&self, user_id: &UserId) -> Option<&PlayerSession> {
        self.sessions.get(user_id)
    }

    /// Whether `identity` may inherit the room seat held by `previous`.
    ///
    /// A seat only moves away from a holder who is offline, or to a login
    /// carrying the holder's own provider session marker.
    pub fn may_take_over(&self, previous: &UserId, identity: &Identity) -> bool {
        if *previous == identity.user_id {
            return true;
        }
        match self.sessions.get(previous) {
            None => true,
            Some(held) if !held.is_active || held.current_socket_id.is_none() => {
                true
            }
            Some(held) => {
                !identity.user_session_id.is_empty()
                    && held.user_session_id == identity.user_session_id
            }
        }
    }

    /// Number of sessions (active or not) held in memory.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of sessions currently marked active.
    pub fn active_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_active).count()
    }

    async fn persist(&self, session: &PlayerSession) -> Result<(), StoreError> {
        let doc = serde_json::to_value(session).map_err(|e| {
            StoreError::WriteFailed {
                key: session.user_id.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.store.upsert(session.user_id.as_str(), doc).await
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionRegistry`.
    //!
    //! Naming: `test_{function}_{scenario}_{expected}`.

    use super::*;
    use crate::MemoryStore;

    const ALICE: &str = "65f0a1b2c3d4e5f60718293a";
    const BOB: &str = "0123456789abcdef01234567";

    fn identity(id: &str, name: &str) -> Identity {
        Identity {
            user_id: UserId::new(id),
            user_email: format!("{name}@example.com").to_lowercase(),
            user_name: name.to_string(),
            user_session_id: format!("marker-{name}"),
        }
    }

    fn registry() -> (SessionRegistry<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SessionRegistry::new(Arc::clone(&store)), store)
    }

    #[tokio::test]
    async fn test_get_or_create_session_new_subject_creates_active_unbound() {
        let (mut reg, store) = registry();

        let session = reg
            .get_or_create_session(&UserId::new(ALICE), "m1", "Alice", "a@x.io")
            .await
            .unwrap();

        assert!(session.is_active);
        assert_eq!(session.current_socket_id, None);
        assert_eq!(store.get(ALICE).unwrap()["name"], "Alice");
    }

    #[tokio::test]
    async fn test_get_or_create_session_existing_keeps_socket_and_reactivates() {
        let (mut reg, _store) = registry();
        reg.bind_socket(&identity(ALICE, "Alice"), ConnectionId::new(1))
            .await;
        reg.sessions.get_mut(&UserId::new(ALICE)).unwrap().is_active = false;

        let session = reg
            .get_or_create_session(&UserId::new(ALICE), "", "", "")
            .await
            .unwrap();

        assert!(session.is_active);
        assert_eq!(session.name, "Alice");
        assert_eq!(session.current_socket_id, Some(ConnectionId::new(1)));
    }

    #[tokio::test]
    async fn test_get_or_create_session_store_failure_propagates() {
        let (mut reg, store) = registry();
        store.set_fail_writes(true);

        let result = reg
            .get_or_create_session(&UserId::new(ALICE), "m", "Alice", "")
            .await;

        assert!(matches!(result, Err(StoreError::WriteFailed { .. })));
        // In-memory state is authoritative even when the mirror fails.
        assert!(reg.get(&UserId::new(ALICE)).is_some());
    }

    #[tokio::test]
    async fn test_bind_socket_reconnect_replaces_socket() {
        let (mut reg, _store) = registry();
        let alice = identity(ALICE, "Alice");

        reg.bind_socket(&alice, ConnectionId::new(1)).await;
        let session = reg.bind_socket(&alice, ConnectionId::new(2)).await;

        assert_eq!(session.current_socket_id, Some(ConnectionId::new(2)));
        assert_eq!(reg.len(), 1);
        assert!(
            reg.sessions
                .values()
                .all(|s| s.current_socket_id != Some(ConnectionId::new(1)))
        );
    }

    #[tokio::test]
    async fn test_may_take_over_connected_holder_refuses_stranger() {
        let (mut reg, _store) = registry();
        reg.bind_socket(&identity(ALICE, "Alice"), ConnectionId::new(1))
            .await;

        assert!(!reg.may_take_over(&UserId::new(ALICE), &identity(BOB, "Bob")));
    }

    #[tokio::test]
    async fn test_may_take_over_same_marker_or_offline_holder_allowed() {
        let (mut reg, _store) = registry();
        let alice = identity(ALICE, "Alice");
        reg.bind_socket(&alice, ConnectionId::new(1)).await;

        let reauthenticated = Identity {
            user_id: UserId::new(BOB),
            ..alice.clone()
        };
        assert!(reg.may_take_over(&UserId::new(ALICE), &reauthenticated));

        reg.disconnect(&UserId::new(ALICE), ConnectionId::new(1)).await;
        assert!(reg.may_take_over(&UserId::new(ALICE), &identity(BOB, "Bob")));
        let unknown = UserId::new("aaaaaaaaaaaaaaaaaaaaaaaa");
        assert!(reg.may_take_over(&unknown, &identity(BOB, "Bob")));
    }

    #[tokio::test]
    async fn test_bind_socket_write_failure_keeps_binding() {
        let (mut reg, store) = registry();
        store.set_fail_writes(true);

        let session = reg
            .bind_socket(&identity(ALICE, "Alice"), ConnectionId::new(3))
            .await;

        assert_eq!(session.current_socket_id, Some(ConnectionId::new(3)));
        assert!(store.get(ALICE).is_none());
    }

    #[tokio::test]
    async fn test_disconnect_current_socket_marks_inactive() {
        let (mut reg, store) = registry();
        reg.bind_socket(&identity(ALICE, "Alice"), ConnectionId::new(1))
            .await;

        assert!(reg.disconnect(&UserId::new(ALICE), ConnectionId::new(1)).await);

        let session = reg.get(&UserId::new(ALICE)).unwrap();
        assert!(!session.is_active);
        assert_eq!(session.current_socket_id, None);
        assert_eq!(store.get(ALICE).unwrap()["isActive"], false);
        assert_eq!(reg.active_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_stale_socket_is_ignored() {
        let (mut reg, _store) = registry();
        let alice = identity(ALICE, "Alice");
        reg.bind_socket(&alice, ConnectionId::new(1)).await;
        reg.bind_socket(&alice, ConnectionId::new(2)).await;

        // The old connection's close arrives after the reconnect.
        assert!(!reg.disconnect(&UserId::new(ALICE), ConnectionId::new(1)).await);

        let session = reg.get(&UserId::new(ALICE)).unwrap();
        assert!(session.is_active);
        assert_eq!(session.current_socket_id, Some(ConnectionId::new(2)));
    }

    #[tokio::test]
    async fn test_disconnect_unknown_user_returns_false() {
        let (mut reg, _store) = registry();
        assert!(!reg.disconnect(&UserId::new(BOB), ConnectionId::new(1)).await);
    }

    #[tokio::test]
    async fn test_load_active_filters_inactive_and_malformed() {
        let store = Arc::new(MemoryStore::new());
        let mut active = PlayerSession::new(UserId::new(ALICE), "m", "Alice", "");
        active.current_socket_id = Some(ConnectionId::new(9));
        let mut inactive = PlayerSession::new(UserId::new(BOB), "m", "Bob", "");
        inactive.is_active = false;
        store.insert_raw(ALICE, serde_json::to_value(&active).unwrap());
        store.insert_raw(BOB, serde_json::to_value(&inactive).unwrap());
        store.insert_raw("no-id", serde_json::json!({ "name": "Ghost" }));
        store.insert_raw(
            "bad-shape",
            serde_json::json!({ "userId": "x", "userSessionId": 12 }),
        );

        let mut reg = SessionRegistry::new(Arc::clone(&store));
        let loaded = reg.load_active().await;

        assert_eq!(loaded, 1);
        assert!(reg.get(&UserId::new(ALICE)).is_some());
        assert!(reg.get(&UserId::new(BOB)).is_none());
    }

    #[tokio::test]
    async fn test_load_active_read_failure_returns_empty() {
        let store = Arc::new(MemoryStore::new());
        store.insert_raw(
            ALICE,
            serde_json::to_value(PlayerSession::new(
                UserId::new(ALICE),
                "m",
                "Alice",
                "",
            ))
            .unwrap(),
        );
        store.set_fail_reads(true);

        let mut reg = SessionRegistry::new(store);

        assert_eq!(reg.load_active().await, 0);
        assert!(reg.is_empty());
    }
}
