//! Topic broadcast abstraction.
//!
//! Delivery is at-most-once with no ordering across senders and no replay:
//! messages published while a peer is not subscribed are lost. Publishers
//! also receive their own messages; handlers suppress those via the
//! `sender_id` carried in every payload.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

use dashmap::DashMap;

/// A best-effort topic channel: publish to everyone currently subscribed.
pub trait MessageBus: Send + Sync {
    fn publish(&self, topic: &str, message: Value);
    fn subscribe(&self, topic: &str) -> mpsc::UnboundedReceiver<Value>;
}

/// In-process bus backed by per-topic subscriber lists. Used directly for
/// local/bot games and tests; the relay server keeps the same shape on the
/// wire.
#[derive(Default)]
pub struct LocalBus {
    topics: DashMap<String, Vec<mpsc::UnboundedSender<Value>>>,
}

impl LocalBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl MessageBus for LocalBus {
    fn publish(&self, topic: &str, message: Value) {
        if let Some(mut subscribers) = self.topics.get_mut(topic) {
            // Dead receivers are dropped on the way through.
            subscribers.retain(|tx| tx.send(message.clone()).is_ok());
        }
    }

    fn subscribe(&self, topic: &str) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.topics.entry(topic.to_string()).or_default().push(tx);
        rx
    }
}
