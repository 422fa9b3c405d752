//! Player state and profile data.

use crate::card::Card;
use crate::rules::rank_from_mmr;
use serde::{Deserialize, Serialize};

/// Avatars assigned to bots (and offered to new players).
pub const AVATARS: [&str; 12] = [
    "🦊", "🦁", "🐸", "🐼", "🐨", "🐯", "🐮", "🐵", "🐱", "🐶", "🦄", "🐲",
];

/// Profile-derived fields carried on a player. Opaque to the rules engine;
/// used by presence payloads and the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub mmr: u32,
    pub coins: u32,
    pub level: u32,
    pub xp: u32,
    pub rank: String,
    pub equipped_skin: String,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            mmr: 1000,
            coins: 500,
            level: 1,
            xp: 0,
            rank: rank_from_mmr(1000).to_string(),
            equipped_skin: "default".to_string(),
        }
    }
}

/// A seat at the table. `is_host` is derived from roster position (index 0)
/// and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub avatar: String,
    /// Ordered for UI stability; order is irrelevant to the rules.
    pub hand: Vec<Card>,
    pub is_bot: bool,
    /// Reset every time the hand changes via play or draw.
    pub has_called_uno: bool,
    pub score: u32,
    pub profile: PlayerProfile,
}

impl Player {
    pub fn human(id: String, name: String, avatar: String) -> Self {
        Self {
            id,
            name,
            avatar,
            hand: Vec::new(),
            is_bot: false,
            has_called_uno: false,
            score: 0,
            profile: PlayerProfile::default(),
        }
    }

    pub fn with_profile(id: String, name: String, avatar: String, profile: PlayerProfile) -> Self {
        Self {
            profile,
            ..Self::human(id, name, avatar)
        }
    }

    pub fn bot(index: usize) -> Self {
        Self {
            is_bot: true,
            ..Self::human(
                format!("bot-{index}"),
                format!("IA-{}", index + 1),
                AVATARS[index % AVATARS.len()].to_string(),
            )
        }
    }

    pub fn hand_size(&self) -> usize {
        self.hand.len()
    }
}
