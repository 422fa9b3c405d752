//! Rules and synchronization core of a multiplayer UNO-variant card game.
//!
//! This crate is the pure half of the system:
//! - [`card`]: card types and the 108-card deck builder
//! - [`rules`]: move legality, card effects, turn order, ranks, scoring
//! - [`game`]: the authoritative `GameState` and its transitions
//! - [`actions`]: the closed action/event vocabulary
//! - [`bot`]: host-run bot players
//!
//! No I/O happens here. The companion `uno-net` crate replicates
//! `GameState` between peers with the host as the single writer.

pub mod actions;
pub mod bot;
pub mod card;
pub mod game;
pub mod player;
pub mod rules;

pub use actions::{GameAction, GameEvent};
pub use bot::Bot;
pub use card::{generate_deck, Card, CardColor, CardKind, DECK_SIZE};
pub use game::{Direction, GameError, GameMode, GameSettings, GameState, GameStatus};
pub use player::{Player, PlayerProfile, AVATARS};
pub use rules::{
    apply_card_effect, is_move_valid, next_player_index, rank_from_mmr, winner_score, CardEffect,
    RANKS,
};
