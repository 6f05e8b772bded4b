//! The room aggregate and everything it owns.
//!
//! These types are both the in-memory truth and the document shape: they
//! serialize with camelCase names, and the per-player maps
//! (`playerHands`, `shields`, `playerActions`) become plain JSON objects
//! keyed by user id. `BTreeMap` keeps that key order stable.

use std::collections::BTreeMap;

use heartfield_protocol::{CardId, RoomCode, UserId};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Card, GamePhase, RoomConfig, TileColor};

/// Turns a shield protects its holder, counting the activation turn.
pub const SHIELD_DURATION: u32 = 2;

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// A heart sitting on a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedHeart {
    pub card_id: CardId,
    pub value: u32,
    pub color: TileColor,
    pub emoji: String,
    pub placed_by: UserId,
    /// Points awarded when placed; Wind takes exactly this much back.
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: u32,
    pub color: TileColor,
    pub emoji: String,
    #[serde(default)]
    pub placed_heart: Option<PlacedHeart>,
}

impl Tile {
    pub fn new(id: u32, color: TileColor) -> Self {
        Self {
            id,
            color,
            emoji: color.tile_emoji().to_string(),
            placed_heart: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.placed_heart.is_none()
    }

    /// Repaints the tile, keeping whatever sits on it.
    pub fn paint(&mut self, color: TileColor) {
        self.color = color;
        self.emoji = color.tile_emoji().to_string();
    }
}

/// Generates `count` tiles with ids `0..count` and random colors.
pub fn generate_tiles(count: usize, rng: &mut impl Rng) -> Vec<Tile> {
    (0..count as u32)
        .map(|id| Tile::new(id, TileColor::random_tile(rng)))
        .collect()
}

/// A deck is only a label and a count; cards are generated on draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub emoji: String,
    pub cards: u32,
}

impl Deck {
    pub fn hearts(cards: u32) -> Self {
        Self {
            emoji: "💌".into(),
            cards,
        }
    }

    pub fn magic(cards: u32) -> Self {
        Self {
            emoji: "🔮".into(),
            cards,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-player state
// ---------------------------------------------------------------------------

/// A player's protection from Wind and Recycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shield {
    pub remaining_turns: u32,
    pub activated_turn: u32,
    pub activated_by: UserId,
}

impl Shield {
    pub fn new(activated_by: UserId, activated_turn: u32) -> Self {
        Self {
            remaining_turns: SHIELD_DURATION,
            activated_turn,
            activated_by,
        }
    }

    /// Active on the activation turn and the opponent's following turn.
    pub fn is_active(&self, current_turn: u32) -> bool {
        current_turn.saturating_sub(self.activated_turn) < SHIELD_DURATION
    }
}

/// What a player has done so far this turn. Reset at every turn change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerActions {
    pub drawn_heart: bool,
    pub drawn_magic: bool,
    pub hearts_placed: u32,
    pub magic_cards_used: u32,
}

/// A roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_ready: bool,
    #[serde(default)]
    pub score: i32,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub joined_at: u64,
}

impl Player {
    pub fn new(
        user_id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            name: name.into(),
            email: email.into(),
            is_ready: false,
            score: 0,
            joined_at: heartfield_protocol::now_millis(),
        }
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub tiles: Vec<Tile>,
    pub game_started: bool,
    pub game_ended: bool,

    /// Snapshot of the roster entry whose turn it is.
    #[serde(default)]
    pub current_player: Option<Player>,

    pub deck: Deck,
    pub magic_deck: Deck,

    #[serde(default)]
    pub player_hands: BTreeMap<UserId, Vec<Card>>,

    /// At most one entry at any time.
    #[serde(default)]
    pub shields: BTreeMap<UserId, Shield>,

    /// 0 in the lobby, 1 on the first turn of a game, then +1 per turn.
    #[serde(default)]
    pub turn_count: u32,

    #[serde(default)]
    pub player_actions: BTreeMap<UserId, PlayerActions>,

    #[serde(default)]
    pub end_reason: Option<String>,

    /// Source of `card-N` ids; never reset, so ids stay unique per room.
    #[serde(default)]
    pub next_card_id: u64,
}

impl GameState {
    /// A lobby board: fresh tiles, full decks, nobody's turn.
    pub fn new(config: &RoomConfig, rng: &mut impl Rng) -> Self {
        Self {
            tiles: generate_tiles(config.tile_count, rng),
            game_started: false,
            game_ended: false,
            current_player: None,
            deck: Deck::hearts(config.deck_size),
            magic_deck: Deck::magic(config.deck_size),
            player_hands: BTreeMap::new(),
            shields: BTreeMap::new(),
            turn_count: 0,
            player_actions: BTreeMap::new(),
            end_reason: None,
            next_card_id: 0,
        }
    }

    pub fn phase(&self) -> GamePhase {
        if self.game_started {
            GamePhase::InProgress
        } else if self.game_ended {
            GamePhase::Ended
        } else {
            GamePhase::Lobby
        }
    }

    pub fn tile(&self, id: u32) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == id)
    }

    pub fn tile_mut(&mut self, id: u32) -> Option<&mut Tile> {
        self.tiles.iter_mut().find(|t| t.id == id)
    }

    /// The shield `user_id` holds, if it is still active this turn.
    pub fn active_shield(&self, user_id: &UserId) -> Option<&Shield> {
        self.shields
            .get(user_id)
            .filter(|s| s.is_active(self.turn_count))
    }

    /// Returns `true` if `user_id` has at least one heart on the board.
    pub fn has_hearts_on_board(&self, user_id: &UserId) -> bool {
        self.tiles.iter().any(|t| {
            t.placed_heart
                .as_ref()
                .is_some_and(|h| &h.placed_by == user_id)
        })
    }

    /// Allocates the next `card-N` id.
    pub fn allocate_card_id(&mut self) -> CardId {
        self.next_card_id += 1;
        CardId::new(format!("card-{}", self.next_card_id))
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One two-player game instance, keyed by its code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub code: RoomCode,
    pub players: Vec<Player>,
    pub max_players: usize,
    pub game_state: GameState,

    /// Rules in force. Not stored; the registry applies its own on load.
    #[serde(skip)]
    pub config: RoomConfig,
}

impl Room {
    /// An empty lobby room.
    pub fn new(code: RoomCode, config: RoomConfig, rng: &mut impl Rng) -> Self {
        Self {
            code,
            players: Vec::new(),
            max_players: config.max_players,
            game_state: GameState::new(&config, rng),
            config,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.game_state.phase()
    }

    pub fn player(&self, user_id: &UserId) -> Option<&Player> {
        self.players.iter().find(|p| &p.user_id == user_id)
    }

    pub fn player_mut(&mut self, user_id: &UserId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.user_id == user_id)
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.player(user_id).is_some()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Returns `true` once the roster is full and everyone is ready.
    pub fn all_ready(&self) -> bool {
        self.is_full() && self.players.iter().all(|p| p.is_ready)
    }

    /// The first roster entry that is not `user_id`.
    pub fn opponent_of(&self, user_id: &UserId) -> Option<&Player> {
        self.players.iter().find(|p| &p.user_id != user_id)
    }

    /// Removes `user_id` and every entry keyed by them.
    ///
    /// Returns the removed roster entry.
    pub fn remove_player(&mut self, user_id: &UserId) -> Option<Player> {
        let index = self.players.iter().position(|p| &p.user_id == user_id)?;
        let player = self.players.remove(index);
        let state = &mut self.game_state;
        state.player_hands.remove(user_id);
        state.player_actions.remove(user_id);
        state.shields.remove(user_id);
        if state
            .current_player
            .as_ref()
            .is_some_and(|p| &p.user_id == user_id)
        {
            state.current_player = None;
        }
        Some(player)
    }

    /// Refreshes the `current_player` snapshot from the roster.
    pub(crate) fn sync_current_player(&mut self) {
        if let Some(current) = self.game_state.current_player.as_ref() {
            let fresh = self.player(&current.user_id).cloned();
            self.game_state.current_player = fresh;
        }
    }
}
