//! WebSocket topic relay.
//!
//! The relay is game-agnostic: it knows topics and JSON payloads, nothing
//! about rooms or rules. Peers subscribe to topics and publish to them;
//! the relay fans each published message out to the other subscribers of
//! that topic. Delivery is best-effort with no replay, so it offers the
//! same contract as the in-process bus.

use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::bus::MessageBus;
use crate::protocol::{ClientFrame, ServerFrame};

/// Relay state shared across all connections.
pub struct RelayState {
    /// Subscribers per topic, keyed by peer id.
    topics: DashMap<String, HashMap<Uuid, mpsc::UnboundedSender<ServerFrame>>>,
}

impl RelayState {
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
        }
    }

    fn subscribe(&self, topic: &str, peer_id: Uuid, tx: mpsc::UnboundedSender<ServerFrame>) {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(peer_id, tx);
    }

    fn unsubscribe(&self, topic: &str, peer_id: Uuid) {
        if let Some(mut subscribers) = self.topics.get_mut(topic) {
            subscribers.remove(&peer_id);
        }
        self.topics.remove_if(topic, |_, subs| subs.is_empty());
    }

    /// Fan a payload out to every subscriber of the topic except the
    /// sender. Peers see their own messages locally already.
    fn publish(&self, topic: &str, sender: Uuid, message: Value) {
        let Some(subscribers) = self.topics.get(topic) else {
            return;
        };
        for (peer_id, tx) in subscribers.iter() {
            if *peer_id == sender {
                continue;
            }
            let _ = tx.send(ServerFrame::Message {
                topic: topic.to_string(),
                message: message.clone(),
            });
        }
    }

    /// Drop every subscription a disconnected peer held.
    fn disconnect(&self, peer_id: Uuid) {
        let mut emptied = Vec::new();
        for mut entry in self.topics.iter_mut() {
            entry.value_mut().remove(&peer_id);
            if entry.value().is_empty() {
                emptied.push(entry.key().clone());
            }
        }
        for topic in emptied {
            self.topics.remove_if(&topic, |_, subs| subs.is_empty());
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |subs| subs.len())
    }
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the relay's accept loop.
pub async fn run_relay(addr: SocketAddr, state: Arc<RelayState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("relay listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single peer connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<RelayState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("new connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let peer_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let welcome = serde_json::to_string(&ServerFrame::Welcome { peer_id })?;
    ws_sender.send(Message::Text(welcome.into())).await?;

    // Forward queued frames to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&frame) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(frame) = serde_json::from_str::<ClientFrame>(&text) {
                    handle_frame(peer_id, frame, &state, &tx);
                } else {
                    warn!("invalid frame from {}: {}", peer_id, text);
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!("websocket error from {}: {}", peer_id, e);
                break;
            }
            _ => {}
        }
    }

    state.disconnect(peer_id);
    send_task.abort();
    info!("peer {} disconnected", peer_id);

    Ok(())
}

/// `MessageBus` over a relay connection.
///
/// The relay does not echo a publish back to its sender, so local
/// subscribers are fed directly on publish; delivery then matches
/// [`crate::bus::LocalBus`].
pub struct RelayBus {
    outbound: mpsc::UnboundedSender<ClientFrame>,
    topics: Arc<DashMap<String, Vec<mpsc::UnboundedSender<Value>>>>,
}

impl RelayBus {
    pub async fn connect(url: &str) -> anyhow::Result<Arc<Self>> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientFrame>();
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Ok(text) = serde_json::to_string(&frame) {
                    if ws_sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
            }
        });

        let topics: Arc<DashMap<String, Vec<mpsc::UnboundedSender<Value>>>> =
            Arc::new(DashMap::new());
        let reader_topics = Arc::clone(&topics);
        tokio::spawn(async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(ServerFrame::Welcome { peer_id }) => {
                            info!("relay assigned peer id {}", peer_id);
                        }
                        Ok(ServerFrame::Message { topic, message }) => {
                            deliver(&reader_topics, &topic, message);
                        }
                        Err(e) => warn!("invalid relay frame: {}", e),
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }
            info!("relay connection closed");
        });

        Ok(Arc::new(Self { outbound, topics }))
    }
}

fn deliver(
    topics: &DashMap<String, Vec<mpsc::UnboundedSender<Value>>>,
    topic: &str,
    message: Value,
) {
    if let Some(mut subscribers) = topics.get_mut(topic) {
        subscribers.retain(|tx| tx.send(message.clone()).is_ok());
    }
}

impl MessageBus for RelayBus {
    fn publish(&self, topic: &str, message: Value) {
        let _ = self.outbound.send(ClientFrame::Publish {
            topic: topic.to_string(),
            message: message.clone(),
        });
        deliver(&self.topics, topic, message);
    }

    fn subscribe(&self, topic: &str) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.topics.entry(topic.to_string()).or_default().push(tx);
        let _ = self.outbound.send(ClientFrame::Subscribe {
            topic: topic.to_string(),
        });
        rx
    }
}

fn handle_frame(
    peer_id: Uuid,
    frame: ClientFrame,
    state: &RelayState,
    tx: &mpsc::UnboundedSender<ServerFrame>,
) {
    match frame {
        ClientFrame::Subscribe { topic } => state.subscribe(&topic, peer_id, tx.clone()),
        ClientFrame::Unsubscribe { topic } => state.unsubscribe(&topic, peer_id),
        ClientFrame::Publish { topic, message } => state.publish(&topic, peer_id, message),
    }
}
