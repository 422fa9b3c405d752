//! Channel message types.
//!
//! Two channel scopes exist: the long-lived lobby channel (presence and
//! room-join requests) and one room channel per active room (action
//! requests and authoritative snapshots). Relay frames wrap either kind
//! of payload for transport through the topic relay.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uno_core::{GameAction, GameState, Player};
use uuid::Uuid;

/// Topic carrying presence and join requests for every peer of the game.
pub const LOBBY_TOPIC: &str = "uno:lobby";

/// Topic for a single room's channel.
pub fn room_topic(room_id: &str) -> String {
    format!("uno:room:{room_id}")
}

/// Messages on a room channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum RoomEvent {
    /// A peer asks the host to apply a transition on its behalf.
    GameAction {
        action: GameAction,
        sender_id: String,
    },

    /// Authoritative full-state snapshot published by the host.
    SyncState { state: GameState, sender_id: String },
}

/// Messages on the lobby channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum LobbyEvent {
    /// A prospective joiner announces itself; only the host of the target
    /// room reacts.
    JoinRequest { room_id: String, player: Player },

    /// Periodic presence re-announcement.
    Presence(PresencePayload),
}

/// One peer's presence entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePayload {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub rank: String,
    pub current_room_id: Option<String>,
    /// Epoch milliseconds of the announcement.
    pub last_seen: u64,
}

/// Frames sent from a peer to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientFrame {
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    Publish { topic: String, message: Value },
}

/// Frames sent from the relay to a peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerFrame {
    /// Connection accepted; the relay-side peer identity.
    Welcome { peer_id: Uuid },

    /// A message published on a subscribed topic by another peer.
    Message { topic: String, message: Value },
}
