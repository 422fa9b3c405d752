//! Game actions and the events they produce.
//!
//! `GameAction` is the closed set of turn-transitioning requests. The same
//! enum travels the room channel as the action-request payload, so the
//! message-handler boundary gets exhaustiveness checking instead of
//! string-keyed dispatch.

use crate::card::CardColor;
use serde::{Deserialize, Serialize};

/// A request to transition the game. Applied directly by the host,
/// forwarded over the room channel by everyone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum GameAction {
    /// Deal hands and flip the opening discard (host only, lobby only).
    Start,

    /// Play one card, or a matching set when the mirror rule is enabled.
    Play {
        player_id: String,
        card_ids: Vec<String>,
        /// Active color choice, required in effect when a wild ends the set.
        chosen_color: Option<CardColor>,
        /// Asserted by a player about to go down to one card.
        did_call_uno: bool,
    },

    /// Draw the outstanding obligation (or a single card) and pass the turn.
    Draw { player_id: String },
}

/// Events emitted by applied transitions, for UI narration and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Hands dealt, opening discard flipped.
    GameStarted { opener_id: String },

    /// A card set left a player's hand.
    CardsPlayed {
        player_id: String,
        card_ids: Vec<String>,
    },

    /// Cards moved from the draw pile to a hand.
    CardsDrawn { player_id: String, count: u32 },

    /// Forgot to call UNO at one card; penalty cards added.
    UnoPenalty { player_id: String, count: u32 },

    /// Whose turn it is now.
    TurnChanged { player_id: String },

    /// Hand emptied; the game is over.
    GameWon { player_id: String, score: u32 },
}
