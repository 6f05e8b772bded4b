//! The room registry: every live room, keyed by code.
//!
//! The in-memory map is the single source of truth. The room collection
//! in the [`DocumentStore`] is a mirror, written after each change and
//! read back once at startup.
//!
//! Like the session registry, this type is not thread-safe on its own;
//! the server keeps it behind a `tokio::sync::Mutex`.

use std::collections::HashMap;
use std::sync::Arc;

use heartfield_protocol::{RoomCode, UserId};
use heartfield_session::{DocumentStore, Identity};
use rand::Rng;

use crate::store::{room_from_document, room_to_document};
use crate::{
    GameOutcome, GamePhase, MigrationOutcome, Player, Room, RoomConfig,
    RoomError,
};

/// How a player got their seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new roster entry was created.
    Joined,

    /// The subject already had a seat; nothing changed but the name and
    /// email.
    Rejoined,

    /// The seat held by `previous_user_id` now belongs to the subject.
    Migrated,
}

/// What happened when a player left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub removed: Player,

    /// Set when leaving ended a running game.
    pub forfeit: Option<GameOutcome>,

    /// `true` when nobody is left; the caller should [`delete`] the room.
    ///
    /// [`delete`]: RoomRegistry::delete
    pub now_empty: bool,
}

/// Owns every room on this server.
pub struct RoomRegistry<D> {
    rooms: HashMap<RoomCode, Room>,
    store: Arc<D>,
    config: RoomConfig,
}

impl<D: DocumentStore> RoomRegistry<D> {
    pub fn new(store: Arc<D>, config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            store,
            config,
        }
    }

    /// Loads every room from the store into memory.
    ///
    /// A failed read leaves the registry empty. Documents that fail
    /// validation (missing `gameState`, malformed code, ...) are skipped
    /// with a warning. Returns the number of rooms loaded.
    pub async fn load(&mut self) -> usize {
        let docs = match self.store.find().await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::error!(error = %e, "failed to load rooms");
                return 0;
            }
        };

        let mut loaded = 0;
        for doc in docs {
            match room_from_document(doc, &self.config) {
                Ok(room) => {
                    self.rooms.insert(room.code.clone(), room);
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping invalid room document");
                }
            }
        }

        tracing::info!(count = loaded, "rooms loaded");
        loaded
    }

    /// Seats `identity` in room `code`, creating the room if it is new.
    ///
    /// In order:
    /// 1. already seated here → [`JoinOutcome::Rejoined`]
    /// 2. `previous` names a seat here → that seat is migrated; callers
    ///    pass `previous` only once they have checked the hand-over
    /// 3. otherwise a new entry, if there is room
    ///
    /// # Errors
    /// - [`RoomError::AlreadyInAnotherRoom`] if seated elsewhere
    /// - [`RoomError::RoomFull`] if no seat is free
    pub fn join(
        &mut self,
        code: &RoomCode,
        identity: &Identity,
        previous: Option<&UserId>,
        rng: &mut impl Rng,
    ) -> Result<JoinOutcome, RoomError> {
        let user_id = &identity.user_id;
        if let Some(other) = self.room_of(user_id).filter(|c| *c != code) {
            return Err(RoomError::AlreadyInAnotherRoom(other.clone()));
        }

        let config = self.config.clone();
        let room = self.rooms.entry(code.clone()).or_insert_with(|| {
            tracing::info!(%code, "room created");
            Room::new(code.clone(), config, rng)
        });

        if let Some(player) = room.player_mut(user_id) {
            player.name = identity.user_name.clone();
            player.email = identity.user_email.clone();
            room.sync_current_player();
            tracing::info!(%code, %user_id, "player rejoined");
            return Ok(JoinOutcome::Rejoined);
        }

        if let Some(previous) = previous.filter(|p| room.contains(p)) {
            room.migrate_player_data(
                previous,
                user_id,
                &identity.user_name,
                &identity.user_email,
            )?;
            return Ok(JoinOutcome::Migrated);
        }

        if room.is_full() {
            return Err(RoomError::RoomFull(code.clone()));
        }
        room.players.push(Player::new(
            user_id.clone(),
            identity.user_name.clone(),
            identity.user_email.clone(),
        ));
        tracing::info!(%code, %user_id, players = room.players.len(), "player joined");
        Ok(JoinOutcome::Joined)
    }

    /// Removes `user_id` from room `code`.
    ///
    /// Leaving a running game forfeits it. The room stays in memory even
    /// when empty; see [`LeaveOutcome::now_empty`].
    pub fn leave(
        &mut self,
        code: &RoomCode,
        user_id: &UserId,
    ) -> Result<LeaveOutcome, RoomError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;
        let removed = room
            .remove_player(user_id)
            .ok_or_else(|| RoomError::NotInRoom(code.clone()))?;

        let forfeit = (room.phase() == GamePhase::InProgress)
            .then(|| room.forfeit(user_id));

        tracing::info!(%code, %user_id, remaining = room.players.len(), "player left");
        Ok(LeaveOutcome {
            removed,
            forfeit,
            now_empty: room.is_empty(),
        })
    }

    /// Writes room `code` to the store.
    ///
    /// # Errors
    /// - [`RoomError::RoomNotFound`] if there is no such room
    /// - [`RoomError::InvalidRoomData`] if the document fails validation
    /// - [`RoomError::Storage`] if the write fails (also logged)
    pub async fn save(&self, code: &RoomCode) -> Result<(), RoomError> {
        let room = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;
        let doc = room_to_document(room)?;
        self.store.upsert(code.as_str(), doc).await.map_err(|e| {
            tracing::error!(%code, error = %e, "failed to save room");
            RoomError::from(e)
        })
    }

    /// Drops room `code` from memory and from the store.
    ///
    /// The in-memory entry is removed even if the store delete fails.
    ///
    /// # Errors
    /// - [`RoomError::RoomNotFound`] if there is no such room
    /// - [`RoomError::Storage`] if the store delete fails (also logged)
    pub async fn delete(&mut self, code: &RoomCode) -> Result<(), RoomError> {
        if self.rooms.remove(code).is_none() {
            return Err(RoomError::RoomNotFound(code.clone()));
        }
        tracing::info!(%code, "room deleted");
        self.store.delete_one(code.as_str()).await.map_err(|e| {
            tracing::error!(%code, error = %e, "failed to delete room document");
            RoomError::from(e)
        })?;
        Ok(())
    }

    /// The code of the room `user_id` is seated in, if any.
    pub fn room_of(&self, user_id: &UserId) -> Option<&RoomCode> {
        self.rooms
            .values()
            .find(|room| room.contains(user_id))
            .map(|room| &room.code)
    }

    pub fn get(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &RoomCode) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }
}
