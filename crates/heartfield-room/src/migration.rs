//! Moving a player's seat from one identity to another.
//!
//! When a client re-authenticates mid-game it may come back under a new
//! `UserId`. Migration re-keys everything the room holds for the old id so
//! the game continues where it left off.

use heartfield_protocol::UserId;

use crate::{Player, Room, RoomError};

/// What [`Room::migrate_player_data`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The old roster entry now carries the new identity.
    Migrated,

    /// No entry had the old id; a fresh one was appended.
    Appended,
}

impl Room {
    /// Re-keys `old_id`'s roster entry, hand, shield, turn counters,
    /// current-player pointer and placed hearts to `new_id`.
    ///
    /// `score` and `joined_at` are kept. If no entry has `old_id`, a fresh
    /// entry for `new_id` is appended instead (score 0, not ready). Entries
    /// for other players are never touched.
    ///
    /// # Errors
    /// [`RoomError::RoomFull`] when appending to a full roster.
    pub fn migrate_player_data(
        &mut self,
        old_id: &UserId,
        new_id: &UserId,
        new_name: &str,
        new_email: &str,
    ) -> Result<MigrationOutcome, RoomError> {
        let Some(index) =
            self.players.iter().position(|p| &p.user_id == old_id)
        else {
            if self.is_full() {
                return Err(RoomError::RoomFull(self.code.clone()));
            }
            self.players
                .push(Player::new(new_id.clone(), new_name, new_email));
            tracing::info!(code = %self.code, user_id = %new_id, "no entry to migrate, appended");
            return Ok(MigrationOutcome::Appended);
        };

        let entry = &mut self.players[index];
        entry.user_id = new_id.clone();
        entry.name = new_name.to_string();
        entry.email = new_email.to_string();
        let snapshot = entry.clone();

        let state = &mut self.game_state;
        if let Some(hand) = state.player_hands.remove(old_id) {
            state.player_hands.insert(new_id.clone(), hand);
        }
        if let Some(mut shield) = state.shields.remove(old_id) {
            shield.activated_by = new_id.clone();
            state.shields.insert(new_id.clone(), shield);
        }
        if let Some(actions) = state.player_actions.remove(old_id) {
            state.player_actions.insert(new_id.clone(), actions);
        }
        for heart in state
            .tiles
            .iter_mut()
            .filter_map(|t| t.placed_heart.as_mut())
            .filter(|h| &h.placed_by == old_id)
        {
            heart.placed_by = new_id.clone();
        }

        let was_current = state
            .current_player
            .as_ref()
            .is_some_and(|p| &p.user_id == old_id);
        if was_current {
            state.current_player = Some(snapshot);
        }

        tracing::info!(
            code = %self.code,
            from = %old_id,
            to = %new_id,
            "player data migrated"
        );
        Ok(MigrationOutcome::Migrated)
    }
}
