//! Card effects.
//!
//! Each card answers two questions: can it target this tile
//! ([`Card::can_target`]), and what happens when it is played
//! ([`Card::execute_effect`]). Shield protection is checked inside
//! `execute_effect` on every call, not by the caller: a shield may have
//! gone up or lapsed since the client chose its target.
//!
//! An effect either applies fully or returns an error before mutating
//! anything. Hand and per-turn bookkeeping belong to the caller.

use heartfield_protocol::UserId;
use serde::{Deserialize, Serialize};

use crate::state::{PlacedHeart, Shield, SHIELD_DURATION};
use crate::{Card, GameState, Room, RoomError, TileColor};

/// What a card did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "camelCase")]
pub enum EffectResult {
    /// A heart landed on `tile_id` and scored `score` points.
    #[serde(rename_all = "camelCase")]
    HeartPlaced { tile_id: u32, score: u32 },

    /// Wind blew `removed` off `tile_id`; its owner lost its score.
    #[serde(rename_all = "camelCase")]
    HeartRemoved {
        tile_id: u32,
        removed: PlacedHeart,
    },

    /// Recycle repainted `tile_id`.
    #[serde(rename_all = "camelCase")]
    TileRecycled { tile_id: u32, new_color: TileColor },

    /// A shield went up, or an existing one was topped back up.
    #[serde(rename_all = "camelCase")]
    ShieldActivated {
        reinforced: bool,
        remaining_turns: u32,
    },
}

impl Card {
    /// Returns `true` if `user_id` could play this card on `target`,
    /// ignoring shields and per-turn caps.
    pub fn can_target(
        &self,
        state: &GameState,
        user_id: &UserId,
        target: Option<u32>,
    ) -> bool {
        self.check_target(state, user_id, target).is_ok()
    }

    /// Plays this card for `user_id` against `target`.
    ///
    /// # Errors
    /// Any targeting error from [`Card::can_target`]'s rules, plus:
    /// - [`RoomError::OpponentProtectedByShield`] (Wind on a shielded
    ///   player's heart)
    /// - [`RoomError::TileProtectedByShield`] (Recycle while the shield
    ///   holder has hearts on the board)
    /// - [`RoomError::OpponentShieldActive`] (Shield while the opponent's
    ///   is up)
    pub fn execute_effect(
        &self,
        room: &mut Room,
        user_id: &UserId,
        target: Option<u32>,
    ) -> Result<EffectResult, RoomError> {
        self.check_target(&room.game_state, user_id, target)?;

        match self {
            Card::Heart(heart) => {
                let tile_id = target.ok_or(RoomError::MissingTarget)?;
                let tile = room
                    .game_state
                    .tile_mut(tile_id)
                    .ok_or(RoomError::TileNotFound(tile_id))?;
                let score = heart.score_on(tile.color);
                tile.placed_heart = Some(PlacedHeart {
                    card_id: heart.id.clone(),
                    value: heart.value,
                    color: heart.color,
                    emoji: heart.emoji.clone(),
                    placed_by: user_id.clone(),
                    score,
                });
                if let Some(player) = room.player_mut(user_id) {
                    player.score += score as i32;
                }
                room.sync_current_player();
                Ok(EffectResult::HeartPlaced { tile_id, score })
            }

            Card::Wind(_) => {
                let tile_id = target.ok_or(RoomError::MissingTarget)?;
                let owner = room
                    .game_state
                    .tile(tile_id)
                    .and_then(|t| t.placed_heart.as_ref())
                    .map(|h| h.placed_by.clone())
                    .ok_or(RoomError::InvalidTargetForWind)?;
                if room.game_state.active_shield(&owner).is_some() {
                    return Err(RoomError::OpponentProtectedByShield);
                }

                let removed = room
                    .game_state
                    .tile_mut(tile_id)
                    .and_then(|t| t.placed_heart.take())
                    .ok_or(RoomError::InvalidTargetForWind)?;
                if let Some(player) = room.player_mut(&owner) {
                    player.score -= removed.score as i32;
                }
                room.sync_current_player();
                Ok(EffectResult::HeartRemoved { tile_id, removed })
            }

            Card::Recycle(_) => {
                let tile_id = target.ok_or(RoomError::MissingTarget)?;
                let blocked = room.players.iter().any(|p| {
                    &p.user_id != user_id
                        && room.game_state.active_shield(&p.user_id).is_some()
                        && room.game_state.has_hearts_on_board(&p.user_id)
                });
                if blocked {
                    return Err(RoomError::TileProtectedByShield);
                }

                let tile = room
                    .game_state
                    .tile_mut(tile_id)
                    .ok_or(RoomError::TileNotFound(tile_id))?;
                tile.paint(TileColor::White);
                Ok(EffectResult::TileRecycled {
                    tile_id,
                    new_color: TileColor::White,
                })
            }

            Card::Shield(_) => {
                let state = &mut room.game_state;
                let turn = state.turn_count;
                let opponent_active = state
                    .shields
                    .iter()
                    .any(|(holder, s)| holder != user_id && s.is_active(turn));
                if opponent_active {
                    return Err(RoomError::OpponentShieldActive);
                }

                let reinforced = state.active_shield(user_id).is_some();
                // Lapsed entries go so at most one shield exists.
                state.shields.clear();
                state
                    .shields
                    .insert(user_id.clone(), Shield::new(user_id.clone(), turn));

                Ok(EffectResult::ShieldActivated {
                    reinforced,
                    remaining_turns: SHIELD_DURATION,
                })
            }
        }
    }

    /// Shield-independent targeting rules.
    fn check_target(
        &self,
        state: &GameState,
        user_id: &UserId,
        target: Option<u32>,
    ) -> Result<(), RoomError> {
        if let Card::Shield(_) = self {
            return Ok(());
        }

        let tile_id = target.ok_or(RoomError::MissingTarget)?;
        let tile = state.tile(tile_id).ok_or(RoomError::TileNotFound(tile_id))?;

        match self {
            Card::Heart(_) if !tile.is_empty() => {
                Err(RoomError::TileAlreadyOccupied(tile_id))
            }
            Card::Wind(_) => match &tile.placed_heart {
                Some(heart) if &heart.placed_by != user_id => Ok(()),
                _ => Err(RoomError::InvalidTargetForWind),
            },
            Card::Recycle(_) if !tile.is_empty() => {
                Err(RoomError::InvalidTargetForRecycle)
            }
            _ => Ok(()),
        }
    }
}
