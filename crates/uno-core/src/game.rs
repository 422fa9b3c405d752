//! Game state machine.
//!
//! `GameState` is the single authoritative aggregate. It is mutated only
//! through the transition methods here; every transition either applies
//! fully (bumping `revision`) or returns an error with the state untouched.
//! Expected game conditions (illegal move, wrong turn, empty deck) never
//! panic: they surface as `GameError` or are recovered internally.

use crate::actions::{GameAction, GameEvent};
use crate::card::{generate_deck, Card, CardColor, CardKind};
use crate::player::Player;
use crate::rules::{apply_card_effect, is_move_valid, next_player_index, winner_score};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Cards drawn as the forgot-to-call-UNO penalty.
const UNO_PENALTY_CARDS: u32 = 2;

/// Game lifecycle. Transitions are linear: Lobby -> Playing -> Finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Lobby,
    Playing,
    Finished,
}

/// Turn order direction around the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Normal,
    Ranked,
}

/// Immutable per-room configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    pub mode: GameMode,
    /// Seconds a player has before the turn times out.
    pub turn_time_limit: u64,
    pub stacking_enabled: bool,
    pub initial_cards_count: usize,
    pub mirror_rule_enabled: bool,
    pub bot_count: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            mode: GameMode::Normal,
            turn_time_limit: 30,
            stacking_enabled: true,
            initial_cards_count: 7,
            mirror_rule_enabled: false,
            bot_count: 0,
        }
    }
}

/// Errors for rejected transitions. The state is never modified when one
/// of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Action not allowed in the current game status")]
    WrongStatus,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Player not in this room")]
    UnknownPlayer,

    #[error("Card not in hand")]
    CardNotInHand,

    #[error("Card cannot be played on the current discard")]
    IllegalMove,

    #[error("Cards in a multi-card set must share kind and value")]
    InvalidCardSet,

    #[error("At least two players are required")]
    NotEnoughPlayers,
}

/// The complete game state for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Room identifier; also the room channel topic suffix.
    pub id: String,
    /// Roster. Index 0 is the host by convention; order is fixed after
    /// creation except for join-appends during the lobby.
    pub players: Vec<Player>,
    pub status: GameStatus,
    /// Draw pile; index 0 is the next card drawn.
    pub deck: Vec<Card>,
    /// Last element is the top (active) card.
    pub discard_pile: Vec<Card>,
    pub current_player_index: usize,
    pub direction: Direction,
    /// Active color for matching, distinct from a wild card's own color tag.
    pub current_color: CardColor,
    pub winner: Option<Player>,
    pub settings: GameSettings,
    /// Epoch milliseconds; reset whenever the turn changes hands.
    pub turn_start_time: u64,
    /// Forced-draw obligation owed by the next player to act.
    pub pending_draw_count: u32,
    /// Monotonic snapshot counter; mirrors ignore snapshots with a
    /// revision at or below their own.
    pub revision: u64,
}

impl GameState {
    /// Create a new room in the lobby with a fresh shuffled deck. Bots are
    /// seated immediately in Normal mode.
    pub fn new(id: String, settings: GameSettings, host: Player) -> Self {
        let mut players = vec![host];
        if settings.mode == GameMode::Normal {
            for i in 0..settings.bot_count {
                players.push(Player::bot(i));
            }
        }

        Self {
            id,
            players,
            status: GameStatus::Lobby,
            deck: generate_deck(),
            discard_pile: Vec::new(),
            current_player_index: 0,
            direction: Direction::Clockwise,
            current_color: CardColor::Red,
            winner: None,
            settings,
            turn_start_time: now_ms(),
            pending_draw_count: 0,
            revision: 0,
        }
    }

    /// The host's player id (roster index 0), if any player is seated.
    pub fn host_id(&self) -> Option<&str> {
        self.players.first().map(|p| p.id.as_str())
    }

    pub fn is_host(&self, player_id: &str) -> bool {
        self.host_id() == Some(player_id)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    /// Whether the running turn has outlived the configured time limit.
    pub fn turn_expired(&self, now_ms: u64) -> bool {
        self.status == GameStatus::Playing
            && now_ms.saturating_sub(self.turn_start_time) > self.settings.turn_time_limit * 1000
    }

    /// Append a player to the roster (host side, lobby only). Idempotent on
    /// duplicate ids.
    pub fn join(&mut self, player: Player) -> Result<Vec<GameEvent>, GameError> {
        if self.status != GameStatus::Lobby {
            return Err(GameError::WrongStatus);
        }
        if self.players.iter().any(|p| p.id == player.id) {
            return Ok(Vec::new());
        }

        self.players.push(player);
        self.revision += 1;
        Ok(Vec::new())
    }

    /// Apply a turn-transitioning action.
    pub fn apply_action(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::Start => self.start(),
            GameAction::Play {
                player_id,
                card_ids,
                chosen_color,
                did_call_uno,
            } => self.play(&player_id, &card_ids, chosen_color, did_call_uno),
            GameAction::Draw { player_id } => self.draw(&player_id),
        }
    }

    /// Turn-timer expiry for the current player: equivalent to a draw.
    /// Duplicate fires for an already-advanced turn fail the current-player
    /// guard and leave the state untouched.
    pub fn timeout(&mut self, player_id: &str) -> Result<Vec<GameEvent>, GameError> {
        self.draw(player_id)
    }

    // ==================== Start ====================

    fn start(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if self.status != GameStatus::Lobby {
            return Err(GameError::WrongStatus);
        }
        if self.players.len() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }

        let per_hand = self.settings.initial_cards_count;
        let needed = self.players.len() * per_hand + 1;
        if self.deck.len() < needed {
            self.deck.extend(generate_deck());
        }

        for player in &mut self.players {
            player.hand = self.deck.drain(..per_hand).collect();
            player.has_called_uno = false;
        }

        // A large deal can leave nothing but wilds; fold in a fresh deck so
        // a colored opener is guaranteed to exist.
        if self.deck.iter().all(Card::is_wild) {
            self.deck.extend(generate_deck());
        }

        // Wild openers cycle to the bottom of the deck until a colored card
        // appears, so the first player always has a discard color to match.
        let opener = loop {
            let card = self.deck.remove(0);
            if card.is_wild() {
                self.deck.push(card);
            } else {
                break card;
            }
        };

        self.current_color = opener.color;
        let opener_id = opener.id.clone();
        self.discard_pile = vec![opener];
        self.status = GameStatus::Playing;
        self.current_player_index = 0;
        self.direction = Direction::Clockwise;
        self.pending_draw_count = 0;
        self.turn_start_time = now_ms();
        self.revision += 1;

        let first = self.players[0].id.clone();
        Ok(vec![
            GameEvent::GameStarted { opener_id },
            GameEvent::TurnChanged { player_id: first },
        ])
    }

    // ==================== Play ====================

    fn play(
        &mut self,
        player_id: &str,
        card_ids: &[String],
        chosen_color: Option<CardColor>,
        did_call_uno: bool,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::WrongStatus);
        }

        let p_idx = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(GameError::UnknownPlayer)?;
        if p_idx != self.current_player_index {
            return Err(GameError::NotYourTurn);
        }

        if card_ids.is_empty() {
            return Err(GameError::CardNotInHand);
        }
        let unique: HashSet<&String> = card_ids.iter().collect();
        if unique.len() != card_ids.len() {
            return Err(GameError::CardNotInHand);
        }

        let hand = &self.players[p_idx].hand;
        let cards: Vec<Card> = card_ids
            .iter()
            .map(|id| hand.iter().find(|c| &c.id == id).cloned())
            .collect::<Option<_>>()
            .ok_or(GameError::CardNotInHand)?;

        if cards.len() > 1 {
            if !self.settings.mirror_rule_enabled {
                return Err(GameError::InvalidCardSet);
            }
            // Sets share kind, and value for number cards; color is
            // irrelevant within the set.
            let first = &cards[0];
            let matches_first = |c: &Card| {
                c.kind == first.kind && (first.kind != CardKind::Number || c.value == first.value)
            };
            if !cards[1..].iter().all(|c| matches_first(c)) {
                return Err(GameError::InvalidCardSet);
            }
        }

        // Only the first card is validated against the table; the rest of a
        // matching set is attached.
        if !is_move_valid(&cards[0], self, hand) {
            return Err(GameError::IllegalMove);
        }

        // Guards passed; mutate.
        let mut events = Vec::new();
        let ids: HashSet<&String> = card_ids.iter().collect();
        self.players[p_idx].hand.retain(|c| !ids.contains(&c.id));
        self.players[p_idx].has_called_uno = did_call_uno;

        let mut draw_sum = 0u32;
        let mut skips = 0usize;
        for card in &cards {
            let effect = apply_card_effect(card, self);
            self.direction = effect.direction;
            draw_sum += effect.draw_count;
            if effect.skip_next {
                skips += 1;
            }
        }

        let last = cards.last().cloned().ok_or(GameError::CardNotInHand)?;
        self.discard_pile.extend(cards);
        events.push(GameEvent::CardsPlayed {
            player_id: player_id.to_string(),
            card_ids: card_ids.to_vec(),
        });

        self.current_color = if last.color == CardColor::Wild {
            chosen_color.unwrap_or(self.current_color)
        } else {
            last.color
        };

        if self.players[p_idx].hand.is_empty() {
            let score = winner_score(&self.players, p_idx);
            self.players[p_idx].score = score;
            self.winner = Some(self.players[p_idx].clone());
            self.status = GameStatus::Finished;
            self.pending_draw_count = 0;
            self.revision += 1;
            events.push(GameEvent::GameWon {
                player_id: player_id.to_string(),
                score,
            });
            return Ok(events);
        }

        if self.players[p_idx].hand.len() == 1 && !did_call_uno {
            self.refill_deck(UNO_PENALTY_CARDS as usize);
            let penalty: Vec<Card> = self.deck.drain(..UNO_PENALTY_CARDS as usize).collect();
            self.players[p_idx].hand.extend(penalty);
            self.players[p_idx].has_called_uno = false;
            events.push(GameEvent::UnoPenalty {
                player_id: player_id.to_string(),
                count: UNO_PENALTY_CARDS,
            });
        }

        // An obligation survives only while draw cards keep the chain going.
        self.pending_draw_count = if draw_sum > 0 {
            self.pending_draw_count + draw_sum
        } else {
            0
        };

        let hops = if skips > 0 { skips + 1 } else { 1 };
        let mut next = p_idx;
        for _ in 0..hops {
            next = next_player_index(next, self.direction, self.players.len());
        }
        self.current_player_index = next;
        self.turn_start_time = now_ms();
        self.revision += 1;

        events.push(GameEvent::TurnChanged {
            player_id: self.players[next].id.clone(),
        });
        Ok(events)
    }

    // ==================== Draw ====================

    fn draw(&mut self, player_id: &str) -> Result<Vec<GameEvent>, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::WrongStatus);
        }
        let p_idx = self.current_player_index;
        if self.players.get(p_idx).map(|p| p.id.as_str()) != Some(player_id) {
            return Err(GameError::NotYourTurn);
        }

        let amount = self.pending_draw_count.max(1) as usize;
        self.refill_deck(amount);

        let drawn: Vec<Card> = self.deck.drain(..amount).collect();
        let player = &mut self.players[p_idx];
        player.hand.extend(drawn);
        player.has_called_uno = false;

        self.pending_draw_count = 0;
        self.current_player_index = next_player_index(p_idx, self.direction, self.players.len());
        self.turn_start_time = now_ms();
        self.revision += 1;

        Ok(vec![
            GameEvent::CardsDrawn {
                player_id: player_id.to_string(),
                count: amount as u32,
            },
            GameEvent::TurnChanged {
                player_id: self.players[self.current_player_index].id.clone(),
            },
        ])
    }

    /// Replenish the draw pile with a fresh shuffled deck when a draw of
    /// `needed` cards would underflow it. Never fatal.
    fn refill_deck(&mut self, needed: usize) {
        if self.deck.len() < needed {
            self.deck.extend(generate_deck());
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_player_room() -> GameState {
        let mut state = GameState::new(
            "room-1".into(),
            GameSettings::default(),
            Player::human("p0".into(), "Host".into(), "🦊".into()),
        );
        state
            .join(Player::human("p1".into(), "Guest".into(), "🐸".into()))
            .unwrap();
        state
    }

    #[test]
    fn create_room_seeds_lobby() {
        let state = GameState::new(
            "room-1".into(),
            GameSettings::default(),
            Player::human("p0".into(), "Host".into(), "🦊".into()),
        );
        assert_eq!(state.status, GameStatus::Lobby);
        assert_eq!(state.deck.len(), 108);
        assert!(state.discard_pile.is_empty());
        assert!(state.is_host("p0"));
    }

    #[test]
    fn normal_mode_seats_bots() {
        let settings = GameSettings {
            bot_count: 3,
            ..GameSettings::default()
        };
        let state = GameState::new(
            "room-1".into(),
            settings,
            Player::human("p0".into(), "Host".into(), "🦊".into()),
        );
        assert_eq!(state.players.len(), 4);
        assert!(state.players[1..].iter().all(|p| p.is_bot));
        // Host is still roster index 0.
        assert!(state.is_host("p0"));
    }

    #[test]
    fn join_is_idempotent_and_lobby_only() {
        let mut state = two_player_room();
        let before = state.clone();
        state
            .join(Player::human("p1".into(), "Guest".into(), "🐸".into()))
            .unwrap();
        assert_eq!(state, before);

        state.apply_action(GameAction::Start).unwrap();
        let err = state
            .join(Player::human("p2".into(), "Late".into(), "🐼".into()))
            .unwrap_err();
        assert_eq!(err, GameError::WrongStatus);
    }

    #[test]
    fn start_requires_two_players() {
        let mut state = GameState::new(
            "room-1".into(),
            GameSettings::default(),
            Player::human("p0".into(), "Host".into(), "🦊".into()),
        );
        assert_eq!(
            state.apply_action(GameAction::Start).unwrap_err(),
            GameError::NotEnoughPlayers
        );
    }

    #[test]
    fn start_deals_hands_and_colored_opener() {
        let mut state = two_player_room();
        state.apply_action(GameAction::Start).unwrap();

        assert_eq!(state.status, GameStatus::Playing);
        for player in &state.players {
            assert_eq!(player.hand.len(), 7);
        }
        let opener = state.discard_pile.last().unwrap();
        assert!(!opener.is_wild());
        assert_eq!(state.current_color, opener.color);
        assert_eq!(state.current_player_index, 0);
        // 108 - 2*7 hands - 1 opener
        assert_eq!(state.deck.len(), 93);
    }

    #[test]
    fn start_recovers_when_only_wilds_remain_for_opener() {
        let mut state = two_player_room();
        // Enough to deal both hands, but every undealt card is wild.
        let mut deck: Vec<Card> = (0..14)
            .map(|i| Card::number(format!("n{i}"), CardColor::Red, 5))
            .collect();
        for i in 0..3 {
            deck.push(Card::action(
                format!("w{i}"),
                CardColor::Wild,
                CardKind::Wild,
            ));
        }
        state.deck = deck;

        state.apply_action(GameAction::Start).unwrap();

        assert_eq!(state.status, GameStatus::Playing);
        let opener = state.discard_pile.last().unwrap();
        assert!(!opener.is_wild());
        assert_eq!(state.current_color, opener.color);
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut state = two_player_room();
        state.apply_action(GameAction::Start).unwrap();
        let before = state.clone();
        assert_eq!(
            state.apply_action(GameAction::Start).unwrap_err(),
            GameError::WrongStatus
        );
        assert_eq!(state, before);
    }

    #[test]
    fn invalid_play_leaves_state_untouched() {
        let mut state = two_player_room();
        state.apply_action(GameAction::Start).unwrap();
        let before = state.clone();

        // Unowned card id.
        let err = state
            .apply_action(GameAction::Play {
                player_id: "p0".into(),
                card_ids: vec!["nope".into()],
                chosen_color: None,
                did_call_uno: false,
            })
            .unwrap_err();
        assert_eq!(err, GameError::CardNotInHand);
        assert_eq!(state, before);

        // Wrong player acting.
        let p1_card = state.players[1].hand[0].id.clone();
        let err = state
            .apply_action(GameAction::Play {
                player_id: "p1".into(),
                card_ids: vec![p1_card],
                chosen_color: None,
                did_call_uno: false,
            })
            .unwrap_err();
        assert_eq!(err, GameError::NotYourTurn);
        assert_eq!(state, before);
    }

    #[test]
    fn draw_takes_one_card_and_advances() {
        let mut state = two_player_room();
        state.apply_action(GameAction::Start).unwrap();
        let hand_before = state.players[0].hand.len();
        let deck_before = state.deck.len();

        let events = state
            .apply_action(GameAction::Draw {
                player_id: "p0".into(),
            })
            .unwrap();

        assert_eq!(state.players[0].hand.len(), hand_before + 1);
        assert_eq!(state.deck.len(), deck_before - 1);
        assert!(!state.players[0].has_called_uno);
        assert_eq!(state.current_player_index, 1);
        assert!(matches!(events[0], GameEvent::CardsDrawn { count: 1, .. }));
    }

    #[test]
    fn draw_resolves_pending_obligation() {
        let mut state = two_player_room();
        state.apply_action(GameAction::Start).unwrap();
        state.pending_draw_count = 4;
        let hand_before = state.players[0].hand.len();

        state
            .apply_action(GameAction::Draw {
                player_id: "p0".into(),
            })
            .unwrap();

        assert_eq!(state.players[0].hand.len(), hand_before + 4);
        assert_eq!(state.pending_draw_count, 0);
    }

    #[test]
    fn draw_replenishes_empty_deck() {
        let mut state = two_player_room();
        state.apply_action(GameAction::Start).unwrap();
        state.deck.clear();

        state
            .apply_action(GameAction::Draw {
                player_id: "p0".into(),
            })
            .unwrap();

        // A fresh deck was folded in, minus the card just drawn.
        assert_eq!(state.deck.len(), 107);
        assert_eq!(state.players[0].hand.len(), 8);
    }

    #[test]
    fn timeout_is_a_draw_and_idempotent() {
        let mut state = two_player_room();
        state.apply_action(GameAction::Start).unwrap();

        state.timeout("p0").unwrap();
        assert_eq!(state.current_player_index, 1);
        let after_first = state.clone();

        // A duplicate fire for the stale turn no-ops.
        assert_eq!(state.timeout("p0").unwrap_err(), GameError::NotYourTurn);
        assert_eq!(state, after_first);
    }

    #[test]
    fn winning_play_finishes_game_with_scored_winner() {
        let mut state = two_player_room();
        state.apply_action(GameAction::Start).unwrap();

        // Hands: p0 holds only RED-5; p1 holds BLUE-5. Discard RED-5, red.
        state.players[0].hand = vec![Card::number("a".into(), CardColor::Red, 5)];
        state.players[1].hand = vec![Card::number("b".into(), CardColor::Blue, 5)];
        state.deck.extend(state.discard_pile.drain(..));
        state
            .discard_pile
            .push(Card::number("t".into(), CardColor::Red, 5));
        state.current_color = CardColor::Red;

        let events = state
            .apply_action(GameAction::Play {
                player_id: "p0".into(),
                card_ids: vec!["a".into()],
                chosen_color: None,
                did_call_uno: false,
            })
            .unwrap();

        assert_eq!(state.status, GameStatus::Finished);
        let winner = state.winner.as_ref().unwrap();
        assert_eq!(winner.id, "p0");
        // Opponent holds a single 5; the floor applies.
        assert_eq!(winner.score, 50);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::GameWon { score: 50, .. })));
    }

    #[test]
    fn winning_with_a_draw_card_clears_the_obligation() {
        let mut state = two_player_room();
        state.apply_action(GameAction::Start).unwrap();

        state.players[0].hand = vec![Card::action(
            "d2".into(),
            CardColor::Red,
            CardKind::DrawTwo,
        )];
        state.deck.extend(state.discard_pile.drain(..));
        state
            .discard_pile
            .push(Card::number("t".into(), CardColor::Red, 5));
        state.current_color = CardColor::Red;

        state
            .apply_action(GameAction::Play {
                player_id: "p0".into(),
                card_ids: vec!["d2".into()],
                chosen_color: None,
                did_call_uno: false,
            })
            .unwrap();

        assert_eq!(state.status, GameStatus::Finished);
        // No obligation survives a finished game.
        assert_eq!(state.pending_draw_count, 0);
    }

    #[test]
    fn stacking_draw_two_accumulates_and_skips() {
        let mut state = two_player_room();
        state
            .join(Player::human("p2".into(), "Third".into(), "🐼".into()))
            .unwrap();
        state.apply_action(GameAction::Start).unwrap();

        state.players[0].hand = vec![
            Card::action("d2".into(), CardColor::Yellow, CardKind::DrawTwo),
            Card::number("r3".into(), CardColor::Red, 3),
        ];
        state.deck.extend(state.discard_pile.drain(..));
        state
            .discard_pile
            .push(Card::action("t".into(), CardColor::Green, CardKind::DrawTwo));
        state.current_color = CardColor::Green;
        state.pending_draw_count = 2;

        // A color-matching number is illegal while the obligation stands.
        let before = state.clone();
        assert_eq!(
            state
                .apply_action(GameAction::Play {
                    player_id: "p0".into(),
                    card_ids: vec!["r3".into()],
                    chosen_color: None,
                    did_call_uno: false,
                })
                .unwrap_err(),
            GameError::IllegalMove
        );
        assert_eq!(state, before);

        // Stacking the DrawTwo grows the obligation and skips the next seat.
        state
            .apply_action(GameAction::Play {
                player_id: "p0".into(),
                card_ids: vec!["d2".into()],
                chosen_color: None,
                did_call_uno: true,
            })
            .unwrap();
        assert_eq!(state.pending_draw_count, 4);
        assert_eq!(state.current_player_index, 2);
    }

    #[test]
    fn uno_penalty_applies_without_call() {
        let mut state = two_player_room();
        state.apply_action(GameAction::Start).unwrap();

        state.players[0].hand = vec![
            Card::number("a".into(), CardColor::Red, 5),
            Card::number("b".into(), CardColor::Red, 6),
        ];
        state.deck.extend(state.discard_pile.drain(..));
        state
            .discard_pile
            .push(Card::number("t".into(), CardColor::Red, 1));
        state.current_color = CardColor::Red;

        let events = state
            .apply_action(GameAction::Play {
                player_id: "p0".into(),
                card_ids: vec!["a".into()],
                chosen_color: None,
                did_call_uno: false,
            })
            .unwrap();

        // One card left plus the two-card penalty.
        assert_eq!(state.players[0].hand.len(), 3);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::UnoPenalty { count: 2, .. })));
    }

    #[test]
    fn uno_call_avoids_penalty() {
        let mut state = two_player_room();
        state.apply_action(GameAction::Start).unwrap();

        state.players[0].hand = vec![
            Card::number("a".into(), CardColor::Red, 5),
            Card::number("b".into(), CardColor::Red, 6),
        ];
        state.deck.extend(state.discard_pile.drain(..));
        state
            .discard_pile
            .push(Card::number("t".into(), CardColor::Red, 1));
        state.current_color = CardColor::Red;

        state
            .apply_action(GameAction::Play {
                player_id: "p0".into(),
                card_ids: vec!["a".into()],
                chosen_color: None,
                did_call_uno: true,
            })
            .unwrap();

        assert_eq!(state.players[0].hand.len(), 1);
        assert!(state.players[0].has_called_uno);
    }

    #[test]
    fn wild_play_sets_chosen_color() {
        let mut state = two_player_room();
        state.apply_action(GameAction::Start).unwrap();

        state.players[0].hand = vec![
            Card::action("w".into(), CardColor::Wild, CardKind::Wild),
            Card::number("x".into(), CardColor::Red, 1),
        ];
        state
            .apply_action(GameAction::Play {
                player_id: "p0".into(),
                card_ids: vec!["w".into()],
                chosen_color: Some(CardColor::Blue),
                did_call_uno: true,
            })
            .unwrap();

        assert_eq!(state.current_color, CardColor::Blue);
    }

    #[test]
    fn mirror_set_requires_setting_and_matching_kind() {
        let mut state = two_player_room();
        state.apply_action(GameAction::Start).unwrap();
        state.players[0].hand = vec![
            Card::number("a".into(), CardColor::Red, 5),
            Card::number("b".into(), CardColor::Blue, 5),
            Card::number("c".into(), CardColor::Green, 7),
        ];
        state.deck.extend(state.discard_pile.drain(..));
        state
            .discard_pile
            .push(Card::number("t".into(), CardColor::Red, 2));
        state.current_color = CardColor::Red;

        // Disabled: multi-card play is rejected outright.
        let err = state
            .apply_action(GameAction::Play {
                player_id: "p0".into(),
                card_ids: vec!["a".into(), "b".into()],
                chosen_color: None,
                did_call_uno: false,
            })
            .unwrap_err();
        assert_eq!(err, GameError::InvalidCardSet);

        state.settings.mirror_rule_enabled = true;

        // Mixed values are still rejected.
        let err = state
            .apply_action(GameAction::Play {
                player_id: "p0".into(),
                card_ids: vec!["a".into(), "c".into()],
                chosen_color: None,
                did_call_uno: false,
            })
            .unwrap_err();
        assert_eq!(err, GameError::InvalidCardSet);

        // Same value across colors is a legal set; color within the set is
        // irrelevant and the last card's color becomes active.
        state
            .apply_action(GameAction::Play {
                player_id: "p0".into(),
                card_ids: vec!["a".into(), "b".into()],
                chosen_color: None,
                did_call_uno: true,
            })
            .unwrap();
        assert_eq!(state.current_color, CardColor::Blue);
        assert_eq!(state.players[0].hand.len(), 1);
    }

    #[test]
    fn mirror_set_folds_skip_effects_into_hop_count() {
        let mut state = two_player_room();
        state
            .join(Player::human("p2".into(), "C".into(), "🐼".into()))
            .unwrap();
        state
            .join(Player::human("p3".into(), "D".into(), "🐨".into()))
            .unwrap();
        state.settings.mirror_rule_enabled = true;
        state.apply_action(GameAction::Start).unwrap();

        state.players[0].hand = vec![
            Card::action("s1".into(), CardColor::Red, CardKind::Skip),
            Card::action("s2".into(), CardColor::Blue, CardKind::Skip),
            Card::number("x".into(), CardColor::Green, 9),
        ];
        state.deck.extend(state.discard_pile.drain(..));
        state
            .discard_pile
            .push(Card::number("t".into(), CardColor::Red, 4));
        state.current_color = CardColor::Red;

        state
            .apply_action(GameAction::Play {
                player_id: "p0".into(),
                card_ids: vec!["s1".into(), "s2".into()],
                chosen_color: None,
                did_call_uno: false,
            })
            .unwrap();

        // Two skip cards: 2 + 1 hops total from seat 0 of 4.
        assert_eq!(state.current_player_index, 3);
    }

    #[test]
    fn reverse_flips_direction_with_three_players() {
        let mut state = two_player_room();
        state
            .join(Player::human("p2".into(), "C".into(), "🐼".into()))
            .unwrap();
        state.apply_action(GameAction::Start).unwrap();

        state.players[0].hand = vec![
            Card::action("r".into(), CardColor::Red, CardKind::Reverse),
            Card::number("x".into(), CardColor::Green, 9),
        ];
        state.deck.extend(state.discard_pile.drain(..));
        state
            .discard_pile
            .push(Card::number("t".into(), CardColor::Red, 4));
        state.current_color = CardColor::Red;

        state
            .apply_action(GameAction::Play {
                player_id: "p0".into(),
                card_ids: vec!["r".into()],
                chosen_color: None,
                did_call_uno: false,
            })
            .unwrap();

        assert_eq!(state.direction, Direction::CounterClockwise);
        // One hop counter-clockwise from seat 0 wraps to the last seat.
        assert_eq!(state.current_player_index, 2);
    }

    #[test]
    fn revision_increases_monotonically() {
        let mut state = two_player_room();
        let r0 = state.revision;
        state.apply_action(GameAction::Start).unwrap();
        let r1 = state.revision;
        state
            .apply_action(GameAction::Draw {
                player_id: "p0".into(),
            })
            .unwrap();
        let r2 = state.revision;
        assert!(r0 < r1 && r1 < r2);
    }
}
