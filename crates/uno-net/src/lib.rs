//! Replication layer for the UNO engine.
//!
//! Peers exchange messages over topic channels with at-most-once delivery
//! and no replay. One peer per room, the host, applies every transition
//! through `uno-core` and publishes full-state snapshots; everyone else
//! mirrors. The relay binary provides those channels over WebSocket for
//! remote play, [`bus::LocalBus`] provides them in-process.

pub mod bus;
pub mod protocol;
pub mod relay;
pub mod session;
pub mod store;

pub use bus::{LocalBus, MessageBus};
pub use relay::{run_relay, RelayBus, RelayState};
pub use protocol::{room_topic, LobbyEvent, PresencePayload, RoomEvent, LOBBY_TOPIC};
pub use session::{Session, SessionCommand, SessionConfig};
pub use store::{
    bootstrap_profile, LocalStore, MemoryLocalStore, MemoryProfileStore, ProfileRecord,
    ProfileStore, StoreError,
};
