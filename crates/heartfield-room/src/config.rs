//! Room configuration and game phase.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Tunable rules for every room on a server.
///
/// The defaults are the standard two-player game. Tests shrink them to
/// reach end states quickly (e.g. `deck_size: 1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Roster ceiling. The game starts once this many players are ready.
    pub max_players: usize,

    /// Number of tiles on the board.
    pub tile_count: usize,

    /// Cards in each deck at game start.
    pub deck_size: u32,

    /// Heart cards dealt to each player at game start.
    pub starting_hearts: usize,

    /// Magic cards dealt to each player at game start.
    pub starting_magic: usize,

    /// Heart placements allowed per player per turn.
    pub max_hearts_per_turn: u32,

    /// Magic-card uses allowed per player per turn.
    pub max_magic_per_turn: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 2,
            tile_count: 8,
            deck_size: 16,
            starting_hearts: 3,
            starting_magic: 2,
            max_hearts_per_turn: 2,
            max_magic_per_turn: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// GamePhase
// ---------------------------------------------------------------------------

/// Where a room's game is in its lifecycle.
///
/// ```text
/// Lobby ──(start)──→ InProgress ──(end / forfeit)──→ Ended
///                         ↑                            │
///                         └────────(restart)───────────┘
/// ```
///
/// Derived from the `gameStarted` / `gameEnded` flags rather than stored,
/// so documents keep the flat shape clients already read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Lobby,
    InProgress,
    Ended,
}

impl GamePhase {
    /// Returns `true` while turns are being played.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Returns `true` if a game may be started from this phase.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Lobby | Self::Ended)
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_phase_can_start_from_lobby_and_ended() {
        assert!(GamePhase::Lobby.can_start());
        assert!(!GamePhase::InProgress.can_start());
        assert!(GamePhase::Ended.can_start());
    }

    #[test]
    fn test_game_phase_is_active_only_in_progress() {
        assert!(!GamePhase::Lobby.is_active());
        assert!(GamePhase::InProgress.is_active());
        assert!(!GamePhase::Ended.is_active());
    }

    #[test]
    fn test_game_phase_display() {
        assert_eq!(GamePhase::InProgress.to_string(), "InProgress");
    }

    #[test]
    fn test_room_config_default_is_two_player_game() {
        let config = RoomConfig::default();
        assert_eq!(config.max_players, 2);
        assert_eq!(config.tile_count, 8);
        assert_eq!(config.deck_size, 16);
        assert_eq!(config.starting_hearts + config.starting_magic, 5);
        assert_eq!(config.max_hearts_per_turn, 2);
        assert_eq!(config.max_magic_per_turn, 1);
    }
}
