//! Turning a [`ClientAction`] into room mutations and events.
//!
//! [`Room::apply_action`] is the single entry point the server calls while
//! holding the room's turn lock. After any mutation it runs the end
//! detector, so a game-ending move produces its `GameOver` in the same
//! batch of events.

use heartfield_protocol::{CardId, Recipient, UserId};
use rand::Rng;

use crate::{
    Card, ClientAction, DrawKind, EffectResult, GamePhase, Room, RoomError,
    RoomEvent,
};

/// Events produced by one action, in delivery order.
pub type RoomEvents = Vec<(Recipient, RoomEvent)>;

impl Room {
    /// Applies `action` on behalf of `user_id`.
    ///
    /// On error the room is unchanged.
    pub fn apply_action(
        &mut self,
        user_id: &UserId,
        action: ClientAction,
        rng: &mut impl Rng,
    ) -> Result<RoomEvents, RoomError> {
        if !self.contains(user_id) {
            return Err(RoomError::NotInRoom(self.code.clone()));
        }

        let mut events = match action {
            ClientAction::PlayerReady { ready } => {
                self.set_ready(user_id, ready, rng)?
            }
            ClientAction::DrawCard { kind } => {
                let card = self.draw_card(user_id, kind, rng)?;
                let deck_remaining = match kind {
                    DrawKind::Heart => self.game_state.deck.cards,
                    DrawKind::Magic => self.game_state.magic_deck.cards,
                };
                vec![
                    (Recipient::Sender, RoomEvent::CardDrawn {
                        user_id: user_id.clone(),
                        card,
                        deck_remaining,
                    }),
                    (Recipient::All, self.snapshot()),
                ]
            }
            ClientAction::PlaceHeart { card_id, tile_id } => {
                self.place_heart(user_id, &card_id, tile_id)?
            }
            ClientAction::UseMagicCard {
                card_id,
                target_tile_id,
            } => self.use_magic_card(user_id, &card_id, target_tile_id)?,
            ClientAction::ShuffleTiles => {
                self.shuffle_tiles(rng)?;
                vec![(Recipient::All, self.snapshot())]
            }
            ClientAction::EndTurn => {
                self.validate_turn(user_id)?;
                let next_player = self.end_turn()?;
                vec![
                    (Recipient::All, RoomEvent::TurnEnded {
                        next_player,
                        turn_count: self.game_state.turn_count,
                    }),
                    (Recipient::All, self.snapshot()),
                ]
            }
        };

        let check = self.check_game_end_conditions();
        if let Some(reason) = check.reason.filter(|_| check.should_end) {
            let outcome = self.finish_game(reason);
            events.push((Recipient::All, outcome.into()));
            events.push((Recipient::All, self.snapshot()));
        }
        Ok(events)
    }

    /// A `RoomState` event carrying the current room.
    pub fn snapshot(&self) -> RoomEvent {
        RoomEvent::RoomState { room: self.clone() }
    }

    fn set_ready(
        &mut self,
        user_id: &UserId,
        ready: bool,
        rng: &mut impl Rng,
    ) -> Result<RoomEvents, RoomError> {
        if self.phase() == GamePhase::InProgress {
            return Err(RoomError::GameAlreadyStarted);
        }
        if let Some(player) = self.player_mut(user_id) {
            player.is_ready = ready;
        }

        let mut events = vec![(Recipient::All, self.snapshot())];
        if self.all_ready() {
            self.start_game(rng)?;
            events.push((Recipient::All, RoomEvent::GameStarted {
                room: self.clone(),
            }));
        }
        Ok(events)
    }

    fn place_heart(
        &mut self,
        user_id: &UserId,
        card_id: &CardId,
        tile_id: u32,
    ) -> Result<RoomEvents, RoomError> {
        self.validate_turn(user_id)?;
        let card = self.card_in_hand(user_id, card_id)?;
        if !matches!(card, Card::Heart(_)) {
            return Err(RoomError::OnlyHeartCardsPlaceable);
        }
        if !self.can_place_more_hearts(user_id) {
            return Err(RoomError::HeartLimitReached);
        }

        let result = card.execute_effect(self, user_id, Some(tile_id))?;
        let score = match result {
            EffectResult::HeartPlaced { score, .. } => score,
            _ => 0,
        };
        self.take_from_hand(user_id, card_id);
        self.game_state
            .player_actions
            .entry(user_id.clone())
            .or_default()
            .hearts_placed += 1;

        Ok(vec![
            (Recipient::All, RoomEvent::HeartPlaced {
                user_id: user_id.clone(),
                card_id: card_id.clone(),
                tile_id,
                score,
            }),
            (Recipient::All, self.snapshot()),
        ])
    }

    fn use_magic_card(
        &mut self,
        user_id: &UserId,
        card_id: &CardId,
        target: Option<u32>,
    ) -> Result<RoomEvents, RoomError> {
        self.validate_turn(user_id)?;
        let card = self.card_in_hand(user_id, card_id)?;
        if !card.is_magic() {
            return Err(RoomError::NotAMagicCard(card_id.clone()));
        }
        if !self.can_use_more_magic_cards(user_id) {
            return Err(RoomError::MagicLimitReached);
        }

        let result = card.execute_effect(self, user_id, target)?;
        self.take_from_hand(user_id, card_id);
        self.game_state
            .player_actions
            .entry(user_id.clone())
            .or_default()
            .magic_cards_used += 1;

        Ok(vec![
            (Recipient::All, RoomEvent::MagicCardUsed {
                user_id: user_id.clone(),
                card_id: card_id.clone(),
                result,
            }),
            (Recipient::All, self.snapshot()),
        ])
    }

    fn card_in_hand(
        &self,
        user_id: &UserId,
        card_id: &CardId,
    ) -> Result<Card, RoomError> {
        self.game_state
            .player_hands
            .get(user_id)
            .and_then(|hand| hand.iter().find(|c| c.id() == card_id))
            .cloned()
            .ok_or_else(|| RoomError::CardNotInHand(card_id.clone()))
    }

    fn take_from_hand(&mut self, user_id: &UserId, card_id: &CardId) {
        if let Some(hand) = self.game_state.player_hands.get_mut(user_id) {
            hand.retain(|c| c.id() != card_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeartCard, Player, RoomConfig, TileColor};
    use heartfield_protocol::RoomCode;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn bob() -> UserId {
        UserId::new("bob")
    }

    fn lobby(rng: &mut StdRng) -> Room {
        let mut room = Room::new(
            RoomCode::parse("ACT123").unwrap(),
            RoomConfig::default(),
            rng,
        );
        room.players.push(Player::new(alice(), "Alice", ""));
        room.players.push(Player::new(bob(), "Bob", ""));
        room
    }

    /// Started game where it is Alice's turn and she holds one red heart
    /// (`card-h`) and one wind (`card-w`); tile 0 is red.
    fn alices_turn() -> (Room, StdRng) {
        let mut rng = StdRng::seed_from_u64(17);
        let mut room = lobby(&mut rng);
        room.apply_action(&alice(), ClientAction::PlayerReady { ready: true }, &mut rng)
            .unwrap();
        room.apply_action(&bob(), ClientAction::PlayerReady { ready: true }, &mut rng)
            .unwrap();
        let alice_entry = room.player(&alice()).cloned();
        room.game_state.current_player = alice_entry;
        room.game_state.tiles[0].paint(TileColor::Red);
        room.game_state.player_hands.insert(alice(), vec![
            Card::Heart(HeartCard::new(
                CardId::new("card-h"),
                TileColor::Red,
                2,
            )),
            Card::wind(CardId::new("card-w")),
        ]);
        (room, rng)
    }

    #[test]
    fn test_apply_action_both_ready_starts_game() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut room = lobby(&mut rng);

        let first = room
            .apply_action(&alice(), ClientAction::PlayerReady { ready: true }, &mut rng)
            .unwrap();
        assert_eq!(first.len(), 1);
        assert!(!room.game_state.game_started);

        let second = room
            .apply_action(&bob(), ClientAction::PlayerReady { ready: true }, &mut rng)
            .unwrap();

        assert!(room.game_state.game_started);
        assert!(matches!(
            second.last(),
            Some((Recipient::All, RoomEvent::GameStarted { .. }))
        ));
    }

    #[test]
    fn test_apply_action_stranger_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut room = lobby(&mut rng);

        let result = room.apply_action(
            &UserId::new("mallory"),
            ClientAction::ShuffleTiles,
            &mut rng,
        );

        assert!(matches!(result, Err(RoomError::NotInRoom(_))));
    }

    #[test]
    fn test_apply_action_place_heart_scores_and_consumes_card() {
        let (mut room, mut rng) = alices_turn();

        let events = room
            .apply_action(
                &alice(),
                ClientAction::PlaceHeart {
                    card_id: CardId::new("card-h"),
                    tile_id: 0,
                },
                &mut rng,
            )
            .unwrap();

        assert!(matches!(
            events[0],
            (Recipient::All, RoomEvent::HeartPlaced { score: 4, .. })
        ));
        assert_eq!(room.player(&alice()).unwrap().score, 4);
        assert_eq!(room.game_state.player_hands[&alice()].len(), 1);
        assert_eq!(
            room.validate_card_draw_limit(&alice()).hearts_placed,
            1
        );
    }

    #[test]
    fn test_apply_action_place_magic_card_rejected() {
        let (mut room, mut rng) = alices_turn();

        let result = room.apply_action(
            &alice(),
            ClientAction::PlaceHeart {
                card_id: CardId::new("card-w"),
                tile_id: 0,
            },
            &mut rng,
        );

        assert!(matches!(result, Err(RoomError::OnlyHeartCardsPlaceable)));
        assert_eq!(room.game_state.player_hands[&alice()].len(), 2);
    }

    #[test]
    fn test_apply_action_card_not_in_hand_rejected() {
        let (mut room, mut rng) = alices_turn();

        let result = room.apply_action(
            &alice(),
            ClientAction::PlaceHeart {
                card_id: CardId::new("card-nope"),
                tile_id: 0,
            },
            &mut rng,
        );

        assert!(matches!(result, Err(RoomError::CardNotInHand(_))));
    }

    #[test]
    fn test_apply_action_heart_as_magic_rejected() {
        let (mut room, mut rng) = alices_turn();

        let result = room.apply_action(
            &alice(),
            ClientAction::UseMagicCard {
                card_id: CardId::new("card-h"),
                target_tile_id: Some(0),
            },
            &mut rng,
        );

        assert!(matches!(result, Err(RoomError::NotAMagicCard(_))));
    }

    #[test]
    fn test_apply_action_magic_limit_one_per_turn() {
        let (mut room, mut rng) = alices_turn();
        room.game_state
            .player_hands
            .get_mut(&alice())
            .unwrap()
            .push(Card::shield(CardId::new("card-s")));
        room.apply_action(
            &alice(),
            ClientAction::UseMagicCard {
                card_id: CardId::new("card-s"),
                target_tile_id: None,
            },
            &mut rng,
        )
        .unwrap();

        let result = room.apply_action(
            &alice(),
            ClientAction::UseMagicCard {
                card_id: CardId::new("card-w"),
                target_tile_id: Some(1),
            },
            &mut rng,
        );

        assert!(matches!(result, Err(RoomError::MagicLimitReached)));
    }

    #[test]
    fn test_apply_action_out_of_turn_rejected() {
        let (mut room, mut rng) = alices_turn();

        let result = room.apply_action(
            &bob(),
            ClientAction::DrawCard {
                kind: DrawKind::Heart,
            },
            &mut rng,
        );

        assert!(matches!(result, Err(RoomError::NotYourTurn)));
    }

    #[test]
    fn test_apply_action_draw_sends_card_to_sender_only() {
        let (mut room, mut rng) = alices_turn();

        let events = room
            .apply_action(
                &alice(),
                ClientAction::DrawCard {
                    kind: DrawKind::Magic,
                },
                &mut rng,
            )
            .unwrap();

        assert!(matches!(
            events[0],
            (Recipient::Sender, RoomEvent::CardDrawn { deck_remaining: 15, .. })
        ));
    }

    #[test]
    fn test_apply_action_end_turn_passes_to_bob() {
        let (mut room, mut rng) = alices_turn();

        room.apply_action(&alice(), ClientAction::EndTurn, &mut rng)
            .unwrap();

        assert!(room.validate_turn(&bob()).is_ok());
        assert_eq!(room.game_state.turn_count, 2);
    }

    #[test]
    fn test_apply_action_filling_last_tile_ends_game() {
        let (mut room, mut rng) = alices_turn();
        let filler = crate::PlacedHeart {
            card_id: CardId::new("card-f"),
            value: 1,
            color: TileColor::Blue,
            emoji: "💙".into(),
            placed_by: bob(),
            score: 0,
        };
        for tile in room.game_state.tiles.iter_mut().skip(1) {
            tile.placed_heart = Some(filler.clone());
        }

        let events = room
            .apply_action(
                &alice(),
                ClientAction::PlaceHeart {
                    card_id: CardId::new("card-h"),
                    tile_id: 0,
                },
                &mut rng,
            )
            .unwrap();

        let over = events.iter().find_map(|(_, e)| match e {
            RoomEvent::GameOver { winner, reason, .. } => {
                Some((winner.clone(), reason.clone()))
            }
            _ => None,
        });
        let (winner, reason) = over.expect("game over event");
        assert_eq!(reason, "All tiles are filled");
        assert_eq!(winner.unwrap().user_id, alice());
        assert_eq!(room.phase(), GamePhase::Ended);
        assert!(room.players.iter().all(|p| !p.is_ready));
    }

    #[test]
    fn test_apply_action_ready_while_in_progress_rejected() {
        let (mut room, mut rng) = alices_turn();

        let result = room.apply_action(
            &bob(),
            ClientAction::PlayerReady { ready: false },
            &mut rng,
        );

        assert!(matches!(result, Err(RoomError::GameAlreadyStarted)));
    }
}
