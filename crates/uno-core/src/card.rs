//! Card types and the deck builder.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Cards in a standard 108-card deck.
pub const DECK_SIZE: usize = 108;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardColor {
    Red,
    Blue,
    Green,
    Yellow,
    /// The color tag wild cards carry; never a match target itself.
    Wild,
}

impl CardColor {
    /// The four colors a wild player can choose from.
    pub const PLAYABLE: [CardColor; 4] = [
        CardColor::Red,
        CardColor::Blue,
        CardColor::Green,
        CardColor::Yellow,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Number,
    Skip,
    Reverse,
    DrawTwo,
    Wild,
    WildDrawFour,
}

/// One card. Ids are unique within a game even across reshuffled decks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub color: CardColor,
    pub kind: CardKind,
    /// Face value; `Some` only for `Number` cards.
    pub value: Option<u8>,
}

impl Card {
    pub fn number(id: String, color: CardColor, value: u8) -> Self {
        Self {
            id,
            color,
            kind: CardKind::Number,
            value: Some(value),
        }
    }

    pub fn action(id: String, color: CardColor, kind: CardKind) -> Self {
        Self {
            id,
            color,
            kind,
            value: None,
        }
    }

    pub fn is_wild(&self) -> bool {
        matches!(self.kind, CardKind::Wild | CardKind::WildDrawFour)
    }

    /// Points this card is worth in an opponent's hand at game end.
    pub fn score_value(&self) -> u32 {
        match self.kind {
            CardKind::Number => u32::from(self.value.unwrap_or(0)),
            CardKind::Wild | CardKind::WildDrawFour => 50,
            CardKind::Skip | CardKind::Reverse | CardKind::DrawTwo => 20,
        }
    }
}

/// Build and shuffle a full 108-card deck.
///
/// Per color: one 0, two of each 1..=9, and two each of Skip, Reverse and
/// DrawTwo; plus four Wild and four WildDrawFour.
pub fn generate_deck() -> Vec<Card> {
    generate_deck_with(&mut thread_rng())
}

pub fn generate_deck_with<R: Rng>(rng: &mut R) -> Vec<Card> {
    // Ids carry a random batch prefix so reshuffled decks folded into a
    // running game never collide with cards already in play.
    let batch: u32 = rng.gen();
    let mut counter = 0usize;
    let mut next_id = || {
        let id = format!("card-{batch:08x}-{counter}");
        counter += 1;
        id
    };

    let mut deck = Vec::with_capacity(DECK_SIZE);
    for color in CardColor::PLAYABLE {
        deck.push(Card::number(next_id(), color, 0));
        for value in 1..=9 {
            deck.push(Card::number(next_id(), color, value));
            deck.push(Card::number(next_id(), color, value));
        }
        for kind in [CardKind::Skip, CardKind::Reverse, CardKind::DrawTwo] {
            deck.push(Card::action(next_id(), color, kind));
            deck.push(Card::action(next_id(), color, kind));
        }
    }
    for _ in 0..4 {
        deck.push(Card::action(next_id(), CardColor::Wild, CardKind::Wild));
    }
    for _ in 0..4 {
        deck.push(Card::action(
            next_id(),
            CardColor::Wild,
            CardKind::WildDrawFour,
        ));
    }

    deck.shuffle(rng);
    deck
}
