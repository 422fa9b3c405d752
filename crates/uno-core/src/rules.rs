//! Pure rules: move legality, card effects, turn order, ranks, scoring.
//!
//! Everything here is a function of its inputs; the state machine in
//! [`crate::game`] owns all mutation.

use crate::card::{Card, CardColor, CardKind};
use crate::game::{Direction, GameState};
use crate::player::Player;

/// Rank ladder for ranked play, ascending by minimum MMR.
pub const RANKS: [(&str, u32); 14] = [
    ("Bronze III", 0),
    ("Bronze II", 300),
    ("Bronze I", 600),
    ("Prata III", 1000),
    ("Prata II", 1500),
    ("Prata I", 2000),
    ("Ouro III", 3000),
    ("Ouro II", 4500),
    ("Ouro I", 6000),
    ("Platina III", 8000),
    ("Platina II", 11000),
    ("Platina I", 15000),
    ("Diamante", 20000),
    ("Mestre Diamante", 30000),
];

/// The highest rank whose threshold the MMR meets.
pub fn rank_from_mmr(mmr: u32) -> &'static str {
    RANKS
        .iter()
        .rev()
        .find(|(_, min)| mmr >= *min)
        .map(|(name, _)| *name)
        .unwrap_or("Iniciante")
}

/// What playing a card does to the flow of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardEffect {
    pub direction: Direction,
    pub skip_next: bool,
    pub draw_count: u32,
}

/// Whether `card` may be played on the current table.
///
/// Decision order: the stacking chain (when an obligation is pending and
/// stacking is on) overrides everything; wilds are always playable;
/// WildDrawFour additionally requires holding no non-wild card of the
/// active color; otherwise the card must match the active color, or match
/// the top discard by value (numbers) or by kind (actions).
pub fn is_move_valid(card: &Card, state: &GameState, hand: &[Card]) -> bool {
    let Some(top) = state.discard_pile.last() else {
        return true;
    };
    let current_color = state.current_color;

    if state.pending_draw_count > 0 && state.settings.stacking_enabled {
        return match top.kind {
            CardKind::DrawTwo => {
                card.kind == CardKind::DrawTwo || card.kind == CardKind::WildDrawFour
            }
            CardKind::WildDrawFour => card.kind == CardKind::WildDrawFour,
            _ => false,
        };
    }

    if card.kind == CardKind::Wild {
        return true;
    }

    if card.kind == CardKind::WildDrawFour {
        let holds_current_color = hand
            .iter()
            .any(|c| c.color == current_color && !c.is_wild());
        return !holds_current_color;
    }

    if card.color == current_color {
        return true;
    }

    if card.kind == CardKind::Number && top.kind == CardKind::Number {
        return card.value == top.value;
    }

    card.kind != CardKind::Number && card.kind == top.kind
}

/// Flow effect of playing `card`. With two players a Reverse acts as a
/// Skip instead of flipping the direction.
pub fn apply_card_effect(card: &Card, state: &GameState) -> CardEffect {
    let mut effect = CardEffect {
        direction: state.direction,
        skip_next: false,
        draw_count: 0,
    };

    match card.kind {
        CardKind::Skip => effect.skip_next = true,
        CardKind::Reverse => {
            if state.players.len() == 2 {
                effect.skip_next = true;
            } else {
                effect.direction = effect.direction.flipped();
            }
        }
        CardKind::DrawTwo => {
            effect.draw_count = 2;
            effect.skip_next = true;
        }
        CardKind::WildDrawFour => {
            effect.draw_count = 4;
            effect.skip_next = true;
        }
        CardKind::Number | CardKind::Wild => {}
    }

    effect
}

/// The seat one step from `current` in `direction`, wrapping.
pub fn next_player_index(current: usize, direction: Direction, total: usize) -> usize {
    match direction {
        Direction::Clockwise => (current + 1) % total,
        Direction::CounterClockwise => (current + total - 1) % total,
    }
}

/// Winner's score: the sum of every opponent's remaining hand, with a
/// floor of 50.
pub fn winner_score(players: &[Player], winner_index: usize) -> u32 {
    let sum: u32 = players
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != winner_index)
        .flat_map(|(_, p)| p.hand.iter())
        .map(Card::score_value)
        .sum();
    sum.max(50)
}
