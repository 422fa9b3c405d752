//! Session context: one peer's view of the game and its replication
//! duties.
//!
//! The session owns the channel handles, the local `GameState` mirror, the
//! presence map and the host-side timers. Exactly one task drives a
//! session, so every handler runs to completion before the next event is
//! looked at; cross-peer concurrency is resolved by the single-writer
//! (host) rule, not by locking.
//!
//! Authority protocol:
//! - before mutating, every call site checks "am I the host" (roster
//!   index 0); non-hosts publish a `GameAction` request instead and do not
//!   touch their mirror (no client-side prediction),
//! - the host applies remote actions and publishes a `SyncState` snapshot,
//! - mirrors replace their state wholesale with any snapshot carrying a
//!   higher revision; stale or out-of-order snapshots are dropped,
//! - the host re-publishes the current snapshot on a heartbeat to heal
//!   newly joined or desynced peers,
//! - every peer re-announces presence on the lobby channel and locally
//!   evicts entries that stop announcing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use uno_core::{
    rank_from_mmr, Bot, CardColor, GameAction, GameSettings, GameState, GameStatus, Player,
    PlayerProfile,
};

use crate::bus::MessageBus;
use crate::protocol::{room_topic, LobbyEvent, PresencePayload, RoomEvent, LOBBY_TOPIC};

/// Timer cadence for a session's periodic duties.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Host snapshot re-publish interval.
    pub heartbeat_interval: Duration,
    /// Presence re-announce interval.
    pub presence_interval: Duration,
    /// Presence entries older than this are locally evicted.
    pub presence_ttl: Duration,
    /// Bot think delay before the host plays a bot's turn.
    pub bot_think: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(3),
            presence_interval: Duration::from_secs(5),
            presence_ttl: Duration::from_secs(15),
            bot_think: Duration::from_millis(1500),
        }
    }
}

/// Requests from the UI/driver layer into the session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    CreateRoom(GameSettings),
    JoinRoom { room_id: String },
    LeaveRoom,
    StartGame,
    PlayCards {
        card_ids: Vec<String>,
        chosen_color: Option<CardColor>,
        did_call_uno: bool,
    },
    DrawCard,
}

/// One peer's session. See the module docs for the protocol it follows.
pub struct Session {
    local_id: String,
    name: String,
    avatar: String,
    profile: PlayerProfile,
    bus: Arc<dyn MessageBus>,
    config: SessionConfig,
    /// Authoritative state if host, read-only mirror otherwise.
    state: Option<GameState>,
    /// Topic of the active room channel, if any.
    room: Option<String>,
    /// Locally visible online peers, keyed by player id.
    online: HashMap<String, PresencePayload>,
    /// Host-side bot deciders, created lazily per bot seat.
    bots: HashMap<String, Bot>,
    /// Pending bot move: (state revision it was scheduled against, fire
    /// time). A revision mismatch at fire time means the turn moved on and
    /// the timer is stale.
    bot_deadline: Option<(u64, u64)>,
}

impl Session {
    pub fn new(
        local_id: String,
        name: String,
        avatar: String,
        profile: PlayerProfile,
        bus: Arc<dyn MessageBus>,
        config: SessionConfig,
    ) -> Self {
        Self {
            local_id,
            name,
            avatar,
            profile,
            bus,
            config,
            state: None,
            room: None,
            online: HashMap::new(),
            bots: HashMap::new(),
            bot_deadline: None,
        }
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// Topic of the active room channel.
    pub fn room_topic(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn online_players(&self) -> impl Iterator<Item = &PresencePayload> {
        self.online.values()
    }

    /// Whether this peer holds write authority (roster index 0).
    pub fn is_host(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.is_host(&self.local_id))
    }

    fn local_player(&self) -> Player {
        Player::with_profile(
            self.local_id.clone(),
            self.name.clone(),
            self.avatar.clone(),
            self.profile.clone(),
        )
    }

    // ==================== Commands ====================

    pub fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::CreateRoom(settings) => self.create_room(settings),
            SessionCommand::JoinRoom { room_id } => self.join_room(&room_id),
            SessionCommand::LeaveRoom => self.leave_room(),
            SessionCommand::StartGame => self.dispatch(GameAction::Start),
            SessionCommand::PlayCards {
                card_ids,
                chosen_color,
                did_call_uno,
            } => self.dispatch(GameAction::Play {
                player_id: self.local_id.clone(),
                card_ids,
                chosen_color,
                did_call_uno,
            }),
            SessionCommand::DrawCard => self.dispatch(GameAction::Draw {
                player_id: self.local_id.clone(),
            }),
        }
    }

    /// Seed a new room with this peer as host. Not replicated as an
    /// action; the first snapshot and the presence update announce it.
    pub fn create_room(&mut self, settings: GameSettings) {
        let room_id = new_room_id();
        let state = GameState::new(room_id.clone(), settings, self.local_player());
        info!(room_id = %room_id, "created room");

        self.room = Some(room_topic(&room_id));
        self.state = Some(state);
        self.broadcast_snapshot();
        self.announce_presence(now_ms());
    }

    /// Ask the host of `room_id` for a seat. The local mirror stays empty
    /// until the host's snapshot arrives.
    pub fn join_room(&mut self, room_id: &str) {
        info!(room_id = %room_id, "requesting to join room");
        self.state = None;
        self.room = Some(room_topic(room_id));
        self.publish_lobby(&LobbyEvent::JoinRequest {
            room_id: room_id.to_string(),
            player: self.local_player(),
        });
    }

    /// Tear down the room channel and drop the state. The `GameState` for
    /// the room dies with the last peer holding it.
    pub fn leave_room(&mut self) {
        self.state = None;
        self.room = None;
        self.bots.clear();
        self.bot_deadline = None;
        self.announce_presence(now_ms());
    }

    /// Route an intended transition: apply locally when host, otherwise
    /// forward to the host and leave the mirror untouched.
    fn dispatch(&mut self, action: GameAction) {
        if self.is_host() {
            self.host_apply(action);
        } else if self.room.is_some() {
            self.publish_room(&RoomEvent::GameAction {
                action,
                sender_id: self.local_id.clone(),
            });
        }
    }

    /// Host side: apply a transition and publish the resulting snapshot.
    /// Rejected transitions are logged and dropped; the engine guarantees
    /// the state is untouched.
    fn host_apply(&mut self, action: GameAction) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        match state.apply_action(action) {
            Ok(events) => {
                for event in &events {
                    debug!(?event, "transition applied");
                }
                self.broadcast_snapshot();
            }
            Err(err) => debug!(%err, "transition rejected"),
        }
    }

    // ==================== Channel reception ====================

    /// Handle one message from the room channel. Malformed payloads are
    /// logged and dropped so one bad message cannot take the peer down.
    pub fn handle_room_message(&mut self, message: Value) {
        let event: RoomEvent = match serde_json::from_value(message) {
            Ok(event) => event,
            Err(err) => {
                warn!(%err, "dropping malformed room message");
                return;
            }
        };

        match event {
            RoomEvent::GameAction { action, sender_id } => {
                if sender_id == self.local_id {
                    return;
                }
                if self.is_host() {
                    self.host_apply(action);
                }
            }
            RoomEvent::SyncState { state, sender_id } => {
                if sender_id == self.local_id {
                    return;
                }
                self.accept_snapshot(state);
            }
        }
    }

    /// Whole-value mirror replacement, gated by the snapshot revision.
    fn accept_snapshot(&mut self, incoming: GameState) {
        if let Some(current) = &self.state {
            if current.id == incoming.id && incoming.revision <= current.revision {
                debug!(
                    incoming = incoming.revision,
                    held = current.revision,
                    "ignoring stale snapshot"
                );
                return;
            }
        }
        self.state = Some(incoming);
    }

    /// Handle one message from the lobby channel.
    pub fn handle_lobby_message(&mut self, message: Value) {
        let event: LobbyEvent = match serde_json::from_value(message) {
            Ok(event) => event,
            Err(err) => {
                warn!(%err, "dropping malformed lobby message");
                return;
            }
        };

        match event {
            LobbyEvent::Presence(presence) => {
                self.online.insert(presence.id.clone(), presence);
            }
            LobbyEvent::JoinRequest { room_id, player } => {
                self.handle_join_request(&room_id, player);
            }
        }
    }

    /// Only the host of the targeted room reacts: append the player and
    /// immediately push a snapshot so the joiner sees the roster it just
    /// joined.
    fn handle_join_request(&mut self, room_id: &str, player: Player) {
        let local_id = self.local_id.clone();
        let Some(state) = self
            .state
            .as_mut()
            .filter(|s| s.id == room_id && s.is_host(&local_id))
        else {
            return;
        };

        match state.join(player) {
            Ok(_) => {
                info!(room_id = %room_id, "player joined room");
                self.broadcast_snapshot();
            }
            Err(err) => debug!(%err, "join request rejected"),
        }
    }

    // ==================== Periodic duties ====================

    /// Host heartbeat: re-publish the current snapshot even without an
    /// intervening action, to self-heal desynced peers. Non-hosts never do
    /// this.
    pub fn heartbeat(&mut self) {
        if self.is_host() {
            self.broadcast_snapshot();
        }
    }

    /// Re-announce presence on the lobby channel.
    pub fn announce_presence(&mut self, now_ms: u64) {
        let payload = PresencePayload {
            id: self.local_id.clone(),
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            rank: rank_from_mmr(self.profile.mmr).to_string(),
            current_room_id: self.state.as_ref().map(|s| s.id.clone()),
            last_seen: now_ms,
        };
        self.publish_lobby(&LobbyEvent::Presence(payload));
    }

    /// Evict peers that stopped announcing. Purely local, no agreement.
    pub fn prune_offline(&mut self, now_ms: u64) {
        let ttl = self.config.presence_ttl.as_millis() as u64;
        self.online
            .retain(|_, p| now_ms.saturating_sub(p.last_seen) <= ttl);
    }

    /// Host-side timer pass: expire the running turn and move bots. The
    /// timers carry no captured state; everything is re-checked against
    /// the live state here, so fires superseded by an advanced turn no-op.
    pub fn tick(&mut self, now_ms: u64) {
        if !self.is_host() {
            self.bot_deadline = None;
            return;
        }

        let Some((current_id, is_bot, revision, expired, playing)) =
            self.state.as_ref().and_then(|s| {
                let current = s.current_player()?;
                Some((
                    current.id.clone(),
                    current.is_bot,
                    s.revision,
                    s.turn_expired(now_ms),
                    s.status == GameStatus::Playing,
                ))
            })
        else {
            return;
        };
        if !playing {
            self.bot_deadline = None;
            return;
        }

        if expired {
            self.host_timeout(&current_id);
            return;
        }

        if !is_bot {
            self.bot_deadline = None;
            return;
        }

        match self.bot_deadline {
            Some((scheduled_rev, fire_at)) if scheduled_rev == revision => {
                if now_ms >= fire_at {
                    self.bot_deadline = None;
                    self.host_bot_move(&current_id);
                }
            }
            _ => {
                let think = self.config.bot_think.as_millis() as u64;
                self.bot_deadline = Some((revision, now_ms + think));
            }
        }
    }

    fn host_timeout(&mut self, player_id: &str) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        match state.timeout(player_id) {
            Ok(_) => {
                info!(player_id = %player_id, "turn timed out");
                self.bot_deadline = None;
                self.broadcast_snapshot();
            }
            Err(err) => debug!(%err, "stale timeout fire ignored"),
        }
    }

    fn host_bot_move(&mut self, bot_id: &str) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let bot = self
            .bots
            .entry(bot_id.to_string())
            .or_insert_with(|| Bot::new(bot_id.to_string()));
        if let Some(action) = bot.choose_action(state) {
            self.host_apply(action);
        }
    }

    // ==================== Publishing ====================

    fn broadcast_snapshot(&self) {
        let (Some(topic), Some(state)) = (self.room.as_deref(), self.state.as_ref()) else {
            return;
        };
        self.publish(
            topic,
            &RoomEvent::SyncState {
                state: state.clone(),
                sender_id: self.local_id.clone(),
            },
        );
    }

    fn publish_room(&self, event: &RoomEvent) {
        if let Some(topic) = self.room.as_deref() {
            self.publish(topic, event);
        }
    }

    fn publish_lobby(&self, event: &LobbyEvent) {
        self.publish(LOBBY_TOPIC, event);
    }

    fn publish<T: serde::Serialize>(&self, topic: &str, event: &T) {
        match serde_json::to_value(event) {
            Ok(value) => self.bus.publish(topic, value),
            Err(err) => warn!(%err, "failed to encode outbound message"),
        }
    }
}

/// Drive a session: UI commands, both channels, and the periodic timers,
/// serialized through a single task.
pub async fn run(mut session: Session, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
    let mut lobby_rx = session.bus.subscribe(LOBBY_TOPIC);
    let mut current_room = session.room.clone();
    let mut room_rx = current_room.as_deref().map(|t| session.bus.subscribe(t));

    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let mut heartbeat = tokio::time::interval(session.config.heartbeat_interval);
    let mut presence = tokio::time::interval(session.config.presence_interval);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => session.handle_command(command),
                None => break,
            },
            Some(message) = lobby_rx.recv() => {
                session.handle_lobby_message(message);
            }
            Some(message) = recv_opt(&mut room_rx) => {
                session.handle_room_message(message);
            }
            _ = ticker.tick() => session.tick(now_ms()),
            _ = heartbeat.tick() => session.heartbeat(),
            _ = presence.tick() => {
                let now = now_ms();
                session.announce_presence(now);
                session.prune_offline(now);
            }
        }

        // The room channel is torn down and recreated whenever the room id
        // changes.
        if session.room != current_room {
            current_room = session.room.clone();
            room_rx = current_room.as_deref().map(|t| session.bus.subscribe(t));
        }
    }
}

async fn recv_opt(rx: &mut Option<mpsc::UnboundedReceiver<Value>>) -> Option<Value> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn new_room_id() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_uppercase()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
