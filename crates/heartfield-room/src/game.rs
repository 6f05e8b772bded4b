//! The game state machine: start, draw, per-turn caps, end turn.
//!
//! Every transition checks its preconditions before touching state, so a
//! rejected call leaves the room exactly as it was.

use heartfield_protocol::UserId;
use rand::Rng;

use crate::state::generate_tiles;
use crate::{Card, Deck, DrawKind, GamePhase, PlayerActions, Room, RoomError};

impl Room {
    /// Starts a game.
    ///
    /// Requires a full roster with everyone ready. Re-rolls the board,
    /// refills both decks, deals every player their starting hand, and
    /// picks the starting player with `rng`. Scores reset, so this also
    /// serves as a restart after a finished game.
    ///
    /// Dealt cards do not come out of the decks.
    ///
    /// # Errors
    /// - [`RoomError::GameAlreadyStarted`] if a game is running
    /// - [`RoomError::PlayersNotReady`] if the roster is short or someone
    ///   is not ready
    pub fn start_game(&mut self, rng: &mut impl Rng) -> Result<(), RoomError> {
        if !self.phase().can_start() {
            return Err(RoomError::GameAlreadyStarted);
        }
        if !self.all_ready() {
            return Err(RoomError::PlayersNotReady);
        }

        let config = self.config.clone();
        let state = &mut self.game_state;
        state.tiles = generate_tiles(config.tile_count, rng);
        state.deck = Deck::hearts(config.deck_size);
        state.magic_deck = Deck::magic(config.deck_size);
        state.player_hands.clear();
        state.shields.clear();
        state.player_actions.clear();
        state.end_reason = None;

        for player in &mut self.players {
            player.score = 0;
            let mut hand =
                Vec::with_capacity(config.starting_hearts + config.starting_magic);
            for _ in 0..config.starting_hearts {
                hand.push(Card::random_heart(state.allocate_card_id(), rng));
            }
            for _ in 0..config.starting_magic {
                hand.push(Card::random_magic(state.allocate_card_id(), rng));
            }
            state.player_hands.insert(player.user_id.clone(), hand);
            state
                .player_actions
                .insert(player.user_id.clone(), PlayerActions::default());
        }

        let first = rng.random_range(0..self.players.len());
        state.current_player = Some(self.players[first].clone());
        state.turn_count = 1;
        state.game_started = true;
        state.game_ended = false;

        tracing::info!(
            code = %self.code,
            first_player = %self.players[first].user_id,
            "game started"
        );
        Ok(())
    }

    /// Checks that a game is running and it is `user_id`'s turn.
    pub fn validate_turn(&self, user_id: &UserId) -> Result<(), RoomError> {
        if self.phase() != GamePhase::InProgress {
            return Err(RoomError::GameNotStarted);
        }
        match &self.game_state.current_player {
            Some(current) if &current.user_id == user_id => Ok(()),
            _ => Err(RoomError::NotYourTurn),
        }
    }

    /// Returns `user_id`'s counters for this turn without enforcing
    /// anything; callers decide what a set flag means.
    pub fn validate_card_draw_limit(&self, user_id: &UserId) -> PlayerActions {
        self.game_state
            .player_actions
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Marks that `user_id` drew from the `kind` deck this turn.
    pub fn record_card_draw(&mut self, user_id: &UserId, kind: DrawKind) {
        let actions = self
            .game_state
            .player_actions
            .entry(user_id.clone())
            .or_default();
        match kind {
            DrawKind::Heart => actions.drawn_heart = true,
            DrawKind::Magic => actions.drawn_magic = true,
        }
    }

    /// Draws one card from the `kind` deck into `user_id`'s hand.
    ///
    /// # Errors
    /// - [`RoomError::GameNotStarted`] / [`RoomError::NotYourTurn`]
    /// - [`RoomError::DrawLimitReached`] if they already drew this kind
    ///   this turn
    /// - [`RoomError::DeckEmpty`] if the deck has no cards left
    pub fn draw_card(
        &mut self,
        user_id: &UserId,
        kind: DrawKind,
        rng: &mut impl Rng,
    ) -> Result<Card, RoomError> {
        self.validate_turn(user_id)?;

        let actions = self.validate_card_draw_limit(user_id);
        let already = match kind {
            DrawKind::Heart => actions.drawn_heart,
            DrawKind::Magic => actions.drawn_magic,
        };
        if already {
            return Err(RoomError::DrawLimitReached(kind));
        }

        let state = &mut self.game_state;
        let deck = match kind {
            DrawKind::Heart => &mut state.deck,
            DrawKind::Magic => &mut state.magic_deck,
        };
        if deck.cards == 0 {
            return Err(RoomError::DeckEmpty(kind));
        }
        deck.cards -= 1;

        let card = Card::random(kind, state.allocate_card_id(), rng);
        state
            .player_hands
            .entry(user_id.clone())
            .or_default()
            .push(card.clone());
        self.record_card_draw(user_id, kind);

        tracing::debug!(code = %self.code, %user_id, %kind, card = %card.id(), "card drawn");
        Ok(card)
    }

    /// Returns `true` if `user_id` may place another heart this turn.
    pub fn can_place_more_hearts(&self, user_id: &UserId) -> bool {
        self.validate_card_draw_limit(user_id).hearts_placed
            < self.config.max_hearts_per_turn
    }

    /// Returns `true` if `user_id` may use another magic card this turn.
    pub fn can_use_more_magic_cards(&self, user_id: &UserId) -> bool {
        self.validate_card_draw_limit(user_id).magic_cards_used
            < self.config.max_magic_per_turn
    }

    /// Ends the current turn.
    ///
    /// Expires shields that are on their last turn and counts the rest
    /// down, hands the turn to the next roster member, bumps the turn
    /// counter and clears the new player's counters.
    ///
    /// Returns the id of the player whose turn it now is.
    ///
    /// # Errors
    /// [`RoomError::GameNotStarted`] if no game is running.
    pub fn end_turn(&mut self) -> Result<UserId, RoomError> {
        if self.phase() != GamePhase::InProgress || self.players.is_empty() {
            return Err(RoomError::GameNotStarted);
        }

        let state = &mut self.game_state;
        state.shields.retain(|_, shield| shield.remaining_turns > 1);
        for shield in state.shields.values_mut() {
            shield.remaining_turns -= 1;
        }

        let current_index = state
            .current_player
            .as_ref()
            .and_then(|c| self.players.iter().position(|p| p.user_id == c.user_id));
        let next_index = match current_index {
            Some(i) => (i + 1) % self.players.len(),
            None => 0,
        };
        let next = self.players[next_index].clone();
        let next_id = next.user_id.clone();

        state.current_player = Some(next);
        state.turn_count += 1;
        state
            .player_actions
            .insert(next_id.clone(), PlayerActions::default());

        tracing::debug!(
            code = %self.code,
            next_player = %next_id,
            turn = state.turn_count,
            "turn ended"
        );
        Ok(next_id)
    }

    /// Re-rolls the tile colors. Only allowed before a game starts.
    ///
    /// # Errors
    /// [`RoomError::GameAlreadyStarted`] while a game is running.
    pub fn shuffle_tiles(&mut self, rng: &mut impl Rng) -> Result<(), RoomError> {
        if self.phase() == GamePhase::InProgress {
            return Err(RoomError::GameAlreadyStarted);
        }
        self.game_state.tiles = generate_tiles(self.config.tile_count, rng);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Player, RoomConfig, Shield};
    use heartfield_protocol::RoomCode;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn bob() -> UserId {
        UserId::new("bob")
    }

    fn ready_room(rng: &mut StdRng) -> Room {
        let mut room = Room::new(
            RoomCode::parse("ABC123").unwrap(),
            RoomConfig::default(),
            rng,
        );
        for (id, name) in [(alice(), "Alice"), (bob(), "Bob")] {
            let mut p = Player::new(id, name, "");
            p.is_ready = true;
            room.players.push(p);
        }
        room
    }

    fn started_room(seed: u64) -> (Room, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut room = ready_room(&mut rng);
        room.start_game(&mut rng).unwrap();
        (room, rng)
    }

    fn current(room: &Room) -> UserId {
        room.game_state.current_player.as_ref().unwrap().user_id.clone()
    }

    #[test]
    fn test_start_game_two_ready_players_deals_and_sets_turn_one() {
        let (room, _) = started_room(42);
        let state = &room.game_state;

        assert_eq!(state.tiles.len(), 8);
        assert_eq!(state.deck.cards, 16);
        assert_eq!(state.magic_deck.cards, 16);
        assert_eq!(state.turn_count, 1);
        assert!(state.game_started);
        for player in &room.players {
            let hand = &state.player_hands[&player.user_id];
            assert_eq!(hand.len(), 5);
            assert_eq!(hand.iter().filter(|c| !c.is_magic()).count(), 3);
        }
    }

    #[test]
    fn test_start_game_same_seed_same_starting_player() {
        let (a, _) = started_room(9);
        let (b, _) = started_room(9);
        assert_eq!(current(&a), current(&b));
        assert_eq!(a.game_state.tiles, b.game_state.tiles);
    }

    #[test]
    fn test_start_game_not_ready_returns_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut room = ready_room(&mut rng);
        room.players[1].is_ready = false;

        let result = room.start_game(&mut rng);

        assert!(matches!(result, Err(RoomError::PlayersNotReady)));
        assert!(!room.game_state.game_started);
    }

    #[test]
    fn test_start_game_short_roster_returns_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut room = ready_room(&mut rng);
        room.players.pop();

        assert!(matches!(
            room.start_game(&mut rng),
            Err(RoomError::PlayersNotReady)
        ));
    }

    #[test]
    fn test_start_game_while_running_returns_error() {
        let (mut room, mut rng) = started_room(1);
        assert!(matches!(
            room.start_game(&mut rng),
            Err(RoomError::GameAlreadyStarted)
        ));
    }

    #[test]
    fn test_validate_turn_lobby_returns_not_started() {
        let mut rng = StdRng::seed_from_u64(1);
        let room = ready_room(&mut rng);
        assert!(matches!(
            room.validate_turn(&alice()),
            Err(RoomError::GameNotStarted)
        ));
    }

    #[test]
    fn test_validate_turn_wrong_player_returns_not_your_turn() {
        let (room, _) = started_room(5);
        let waiting = room.opponent_of(&current(&room)).unwrap().user_id.clone();

        assert!(room.validate_turn(&current(&room)).is_ok());
        assert!(matches!(
            room.validate_turn(&waiting),
            Err(RoomError::NotYourTurn)
        ));
    }

    #[test]
    fn test_draw_card_second_draw_same_kind_rejected() {
        let (mut room, mut rng) = started_room(3);
        let me = current(&room);

        room.draw_card(&me, DrawKind::Heart, &mut rng).unwrap();
        let second = room.draw_card(&me, DrawKind::Heart, &mut rng);

        assert!(matches!(
            second,
            Err(RoomError::DrawLimitReached(DrawKind::Heart))
        ));
        assert_eq!(room.game_state.deck.cards, 15);
        assert_eq!(room.game_state.player_hands[&me].len(), 6);
    }

    #[test]
    fn test_draw_card_one_of_each_kind_allowed() {
        let (mut room, mut rng) = started_room(3);
        let me = current(&room);

        room.draw_card(&me, DrawKind::Heart, &mut rng).unwrap();
        let magic = room.draw_card(&me, DrawKind::Magic, &mut rng).unwrap();

        assert!(magic.is_magic());
        let actions = room.validate_card_draw_limit(&me);
        assert!(actions.drawn_heart && actions.drawn_magic);
    }

    #[test]
    fn test_draw_card_empty_deck_returns_deck_empty() {
        let (mut room, mut rng) = started_room(3);
        let me = current(&room);
        room.game_state.magic_deck.cards = 0;

        let result = room.draw_card(&me, DrawKind::Magic, &mut rng);

        assert!(matches!(result, Err(RoomError::DeckEmpty(DrawKind::Magic))));
        assert!(!room.validate_card_draw_limit(&me).drawn_magic);
    }

    #[test]
    fn test_can_place_more_hearts_caps_at_two() {
        let (mut room, _) = started_room(3);
        let me = current(&room);

        room.game_state.player_actions.get_mut(&me).unwrap().hearts_placed = 1;
        assert!(room.can_place_more_hearts(&me));
        room.game_state.player_actions.get_mut(&me).unwrap().hearts_placed = 2;
        assert!(!room.can_place_more_hearts(&me));
    }

    #[test]
    fn test_can_use_more_magic_cards_caps_at_one() {
        let (mut room, _) = started_room(3);
        let me = current(&room);

        assert!(room.can_use_more_magic_cards(&me));
        room.game_state
            .player_actions
            .get_mut(&me)
            .unwrap()
            .magic_cards_used = 1;
        assert!(!room.can_use_more_magic_cards(&me));
    }

    #[test]
    fn test_end_turn_advances_player_and_resets_counters() {
        let (mut room, mut rng) = started_room(8);
        let first = current(&room);
        let second = room.opponent_of(&first).unwrap().user_id.clone();
        room.game_state
            .player_actions
            .insert(second.clone(), PlayerActions {
                drawn_heart: true,
                ..PlayerActions::default()
            });

        let next = room.end_turn().unwrap();

        assert_eq!(next, second);
        assert_eq!(current(&room), second);
        assert_eq!(room.game_state.turn_count, 2);
        assert_eq!(room.validate_card_draw_limit(&second), PlayerActions::default());
        // Turn passes back after another end_turn.
        room.end_turn().unwrap();
        assert_eq!(current(&room), first);
        let _ = room.draw_card(&first, DrawKind::Heart, &mut rng).unwrap();
    }

    #[test]
    fn test_end_turn_expires_shield_after_two_turns() {
        let (mut room, _) = started_room(8);
        let holder = current(&room);
        room.game_state
            .shields
            .insert(holder.clone(), Shield::new(holder.clone(), 1));

        room.end_turn().unwrap();
        assert_eq!(room.game_state.shields[&holder].remaining_turns, 1);
        assert!(room.game_state.active_shield(&holder).is_some());

        room.end_turn().unwrap();
        assert!(room.game_state.shields.is_empty());
    }

    #[test]
    fn test_end_turn_lobby_returns_not_started() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut room = ready_room(&mut rng);
        assert!(matches!(room.end_turn(), Err(RoomError::GameNotStarted)));
    }

    #[test]
    fn test_shuffle_tiles_in_progress_rejected() {
        let (mut room, mut rng) = started_room(2);
        assert!(matches!(
            room.shuffle_tiles(&mut rng),
            Err(RoomError::GameAlreadyStarted)
        ));
    }

    #[test]
    fn test_shuffle_tiles_lobby_keeps_tile_count() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut room = ready_room(&mut rng);
        room.shuffle_tiles(&mut rng).unwrap();
        assert_eq!(room.game_state.tiles.len(), 8);
    }
}
