//! Game end detection.

use heartfield_protocol::UserId;
use serde::{Deserialize, Serialize};

use crate::{GamePhase, Player, Room};

pub const REASON_TILES_FILLED: &str = "All tiles are filled";
pub const REASON_DECKS_EMPTY: &str = "Both decks are empty";
pub const REASON_OPPONENT_LEFT: &str = "Opponent left the game";

/// The verdict of [`Room::check_game_end_conditions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEndCheck {
    pub should_end: bool,
    pub reason: Option<&'static str>,
    /// The strictly highest scorer; `None` on a tie.
    pub winner: Option<Player>,
    pub is_tie: bool,
}

impl GameEndCheck {
    fn keep_playing() -> Self {
        Self {
            should_end: false,
            reason: None,
            winner: None,
            is_tie: false,
        }
    }
}

/// How a finished game turned out. Broadcast to the whole room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOutcome {
    pub winner: Option<Player>,
    pub is_tie: bool,
    pub reason: String,
}

impl Room {
    /// Decides whether the running game is over.
    ///
    /// The game ends when every tile holds a heart or both decks are
    /// empty. Never ends a game that is not in progress.
    pub fn check_game_end_conditions(&self) -> GameEndCheck {
        if self.phase() != GamePhase::InProgress {
            return GameEndCheck::keep_playing();
        }

        let state = &self.game_state;
        let reason = if !state.tiles.is_empty()
            && state.tiles.iter().all(|t| !t.is_empty())
        {
            REASON_TILES_FILLED
        } else if state.deck.cards == 0 && state.magic_deck.cards == 0 {
            REASON_DECKS_EMPTY
        } else {
            return GameEndCheck::keep_playing();
        };

        let (winner, is_tie) = self.leader();
        GameEndCheck {
            should_end: true,
            reason: Some(reason),
            winner,
            is_tie,
        }
    }

    /// Ends the game for `reason`, scoring it as it stands.
    ///
    /// Clears every player's ready flag so a rematch needs a fresh
    /// round of ready-ups.
    pub fn finish_game(&mut self, reason: &str) -> GameOutcome {
        let (winner, is_tie) = self.leader();
        self.close_game(reason);
        tracing::info!(
            code = %self.code,
            reason,
            winner = ?winner.as_ref().map(|p| &p.user_id),
            is_tie,
            "game over"
        );
        GameOutcome {
            winner,
            is_tie,
            reason: reason.to_string(),
        }
    }

    /// Ends a running game because `leaver` walked out.
    ///
    /// Whoever remains wins regardless of score. Call after removing the
    /// leaver from the roster.
    pub fn forfeit(&mut self, leaver: &UserId) -> GameOutcome {
        let winner = self.opponent_of(leaver).cloned();
        self.close_game(REASON_OPPONENT_LEFT);
        tracing::info!(code = %self.code, %leaver, "game forfeited");
        GameOutcome {
            winner,
            is_tie: false,
            reason: REASON_OPPONENT_LEFT.to_string(),
        }
    }

    fn close_game(&mut self, reason: &str) {
        let state = &mut self.game_state;
        state.game_started = false;
        state.game_ended = true;
        state.end_reason = Some(reason.to_string());
        state.current_player = None;
        for player in &mut self.players {
            player.is_ready = false;
        }
    }

    /// The unique top scorer, or `(None, true)` if the top is shared.
    fn leader(&self) -> (Option<Player>, bool) {
        let Some(best) = self.players.iter().map(|p| p.score).max() else {
            return (None, false);
        };
        let mut top = self.players.iter().filter(|p| p.score == best);
        match (top.next(), top.next()) {
            (Some(only), None) => (Some(only.clone()), false),
            _ => (None, true),
        }
    }
}
