//! Bot players.
//!
//! Bots run on the host only; their decisions go through the same
//! transition path as human actions.

use crate::actions::GameAction;
use crate::card::{Card, CardColor};
use crate::game::GameState;
use crate::rules::is_move_valid;
use rand::prelude::*;

/// A bot deciding for one seat at the table.
pub struct Bot {
    pub player_id: String,
    rng: StdRng,
}

impl Bot {
    pub fn new(player_id: String) -> Self {
        Self {
            player_id,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(player_id: String, seed: u64) -> Self {
        Self {
            player_id,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pick an action for this bot's turn: a random legal card, or a draw
    /// when the hand has none. Returns `None` when it is not this bot's
    /// turn (a stale think-timer fire).
    pub fn choose_action(&mut self, state: &GameState) -> Option<GameAction> {
        let player = state.current_player()?;
        if player.id != self.player_id {
            return None;
        }

        let playable: Vec<&Card> = player
            .hand
            .iter()
            .filter(|c| is_move_valid(c, state, &player.hand))
            .collect();

        let Some(card) = playable.choose(&mut self.rng) else {
            return Some(GameAction::Draw {
                player_id: self.player_id.clone(),
            });
        };

        let chosen_color = if card.color == CardColor::Wild {
            Some(self.pick_color(&player.hand))
        } else {
            None
        };

        Some(GameAction::Play {
            player_id: self.player_id.clone(),
            card_ids: vec![card.id.clone()],
            chosen_color,
            did_call_uno: player.hand.len() == 2,
        })
    }

    /// Color the bot holds most of, random among the leaders.
    fn pick_color(&mut self, hand: &[Card]) -> CardColor {
        let mut best = CardColor::PLAYABLE
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(CardColor::Red);
        let mut best_count = 0;
        for color in CardColor::PLAYABLE {
            let count = hand.iter().filter(|c| c.color == color).count();
            if count > best_count {
                best = color;
                best_count = count;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardKind;
    use crate::game::{GameSettings, GameStatus};
    use crate::player::Player;

    fn bot_game() -> GameState {
        let settings = GameSettings {
            bot_count: 1,
            ..GameSettings::default()
        };
        let mut state = GameState::new(
            "room-1".into(),
            settings,
            Player::human("p0".into(), "Host".into(), "🦊".into()),
        );
        state.apply_action(GameAction::Start).unwrap();
        state
    }

    #[test]
    fn bot_draws_with_no_legal_card() {
        let mut state = bot_game();
        state.current_player_index = 1;
        state.players[1].hand = vec![Card::number("x".into(), CardColor::Blue, 2)];
        state.deck.extend(state.discard_pile.drain(..));
        state
            .discard_pile
            .push(Card::number("t".into(), CardColor::Red, 7));
        state.current_color = CardColor::Red;

        let mut bot = Bot::with_seed("bot-0".into(), 42);
        let action = bot.choose_action(&state).unwrap();
        assert_eq!(
            action,
            GameAction::Draw {
                player_id: "bot-0".into()
            }
        );
    }

    #[test]
    fn bot_plays_a_legal_card_and_calls_uno_at_two() {
        let mut state = bot_game();
        state.current_player_index = 1;
        state.players[1].hand = vec![
            Card::number("a".into(), CardColor::Red, 7),
            Card::number("b".into(), CardColor::Blue, 2),
        ];
        state.deck.extend(state.discard_pile.drain(..));
        state
            .discard_pile
            .push(Card::number("t".into(), CardColor::Red, 1));
        state.current_color = CardColor::Red;

        let mut bot = Bot::with_seed("bot-0".into(), 7);
        match bot.choose_action(&state).unwrap() {
            GameAction::Play {
                card_ids,
                did_call_uno,
                ..
            } => {
                assert_eq!(card_ids, vec!["a".to_string()]);
                assert!(did_call_uno);
            }
            other => panic!("expected play, got {other:?}"),
        }
    }

    #[test]
    fn bot_chooses_a_color_for_wilds() {
        let mut state = bot_game();
        state.current_player_index = 1;
        state.players[1].hand = vec![
            Card::action("w".into(), CardColor::Wild, CardKind::Wild),
            Card::number("g1".into(), CardColor::Green, 1),
            Card::number("g2".into(), CardColor::Green, 2),
            Card::number("b1".into(), CardColor::Blue, 9),
        ];
        state.deck.extend(state.discard_pile.drain(..));
        state
            .discard_pile
            .push(Card::number("t".into(), CardColor::Red, 5));
        state.current_color = CardColor::Red;

        let mut bot = Bot::with_seed("bot-0".into(), 3);
        match bot.choose_action(&state).unwrap() {
            GameAction::Play {
                card_ids,
                chosen_color,
                ..
            } => {
                assert_eq!(card_ids, vec!["w".to_string()]);
                assert_eq!(chosen_color, Some(CardColor::Green));
            }
            other => panic!("expected play, got {other:?}"),
        }
    }

    #[test]
    fn stale_fire_for_another_seat_noops() {
        let state = bot_game();
        assert_eq!(state.status, GameStatus::Playing);
        // Turn belongs to the host, not the bot.
        let mut bot = Bot::with_seed("bot-0".into(), 1);
        assert!(bot.choose_action(&state).is_none());
    }
}
