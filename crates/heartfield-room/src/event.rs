//! Game-level messages carried inside `Payload::Game`.
//!
//! Clients send [`ClientAction`]s; rooms answer with [`RoomEvent`]s, each
//! paired with a [`Recipient`](heartfield_protocol::Recipient) by the
//! action dispatcher.

use heartfield_protocol::{CardId, UserId};
use serde::{Deserialize, Serialize};

use crate::{Card, DrawKind, EffectResult, GameOutcome, Player, Room};

/// Something a seated player asks their room to do.
///
/// `{ "action": "PlaceHeart", "card_id": "card-3", "tile_id": 5 }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ClientAction {
    /// Toggle readiness in the lobby.
    PlayerReady { ready: bool },

    DrawCard { kind: DrawKind },

    PlaceHeart { card_id: CardId, tile_id: u32 },

    /// Shield ignores `target_tile_id`; Wind and Recycle require it.
    UseMagicCard {
        card_id: CardId,
        #[serde(default)]
        target_tile_id: Option<u32>,
    },

    /// Re-roll tile colors before the game starts.
    ShuffleTiles,

    EndTurn,
}

impl ClientAction {
    /// Returns `true` for actions that are only legal on your turn.
    pub fn is_turn_action(&self) -> bool {
        matches!(
            self,
            Self::DrawCard { .. }
                | Self::PlaceHeart { .. }
                | Self::UseMagicCard { .. }
                | Self::EndTurn
        )
    }
}

/// What the room tells its players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RoomEvent {
    /// A full snapshot of the room.
    RoomState { room: Room },

    GameStarted { room: Room },

    CardDrawn {
        user_id: UserId,
        card: Card,
        deck_remaining: u32,
    },

    HeartPlaced {
        user_id: UserId,
        card_id: CardId,
        tile_id: u32,
        score: u32,
    },

    MagicCardUsed {
        user_id: UserId,
        card_id: CardId,
        result: EffectResult,
    },

    TurnEnded {
        next_player: UserId,
        turn_count: u32,
    },

    PlayerLeft { user_id: UserId },

    GameOver {
        winner: Option<Player>,
        is_tie: bool,
        reason: String,
    },
}

impl From<GameOutcome> for RoomEvent {
    fn from(outcome: GameOutcome) -> Self {
        Self::GameOver {
            winner: outcome.winner,
            is_tie: outcome.is_tie,
            reason: outcome.reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_action_place_heart_json_format() {
        let raw = r#"{"action":"PlaceHeart","card_id":"card-3","tile_id":5}"#;
        let action: ClientAction = serde_json::from_str(raw).unwrap();
        assert_eq!(action, ClientAction::PlaceHeart {
            card_id: CardId::new("card-3"),
            tile_id: 5,
        });
    }

    #[test]
    fn test_client_action_use_magic_without_target_defaults_none() {
        let raw = r#"{"action":"UseMagicCard","card_id":"card-4"}"#;
        let action: ClientAction = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            action,
            ClientAction::UseMagicCard { target_tile_id: None, .. }
        ));
    }

    #[test]
    fn test_client_action_draw_card_kind_is_lowercase() {
        let raw = r#"{"action":"DrawCard","kind":"magic"}"#;
        let action: ClientAction = serde_json::from_str(raw).unwrap();
        assert_eq!(action, ClientAction::DrawCard {
            kind: DrawKind::Magic
        });
    }

    #[test]
    fn test_client_action_is_turn_action() {
        assert!(ClientAction::EndTurn.is_turn_action());
        assert!(!ClientAction::ShuffleTiles.is_turn_action());
        assert!(!ClientAction::PlayerReady { ready: true }.is_turn_action());
    }

    #[test]
    fn test_room_event_game_over_json_format() {
        let event = RoomEvent::GameOver {
            winner: None,
            is_tie: true,
            reason: "All tiles are filled".into(),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "GameOver");
        assert_eq!(json["winner"], serde_json::Value::Null);
        assert_eq!(json["is_tie"], true);
    }
}
