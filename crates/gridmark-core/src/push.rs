//! Push channel: the realtime feed of feature events.
//!
//! Provides the JSON protocol spoken with the relay and a native websocket
//! client.

use crate::geo::{FeatureId, GeoFeature};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authoritative feature change broadcast by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "feature", rename_all = "snake_case")]
pub enum FeatureEvent {
    Created(GeoFeature),
    Updated(GeoFeature),
    /// Carries at least `properties.id`.
    Deleted(GeoFeature),
}

impl FeatureEvent {
    pub fn feature(&self) -> &GeoFeature {
        match self {
            FeatureEvent::Created(f) | FeatureEvent::Updated(f) | FeatureEvent::Deleted(f) => f,
        }
    }

    pub fn id(&self) -> Option<FeatureId> {
        self.feature().id()
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeatureEvent::Created(_) => "created",
            FeatureEvent::Updated(_) => "updated",
            FeatureEvent::Deleted(_) => "deleted",
        }
    }
}

/// Messages sent to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the room of a map
    Join { room: String },
    /// Leave current room
    Leave,
    /// Broadcast a feature event to the room
    Publish { event: FeatureEvent },
}

/// Messages received from the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm room join
    Joined { room: String, peer_count: usize },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    Created { feature: GeoFeature },
    Updated { feature: GeoFeature },
    Deleted { feature: GeoFeature },
    Error { message: String },
}

impl From<FeatureEvent> for ServerMessage {
    fn from(event: FeatureEvent) -> Self {
        match event {
            FeatureEvent::Created(feature) => ServerMessage::Created { feature },
            FeatureEvent::Updated(feature) => ServerMessage::Updated { feature },
            FeatureEvent::Deleted(feature) => ServerMessage::Deleted { feature },
        }
    }
}

impl ServerMessage {
    /// True for messages every room member receives, the publisher included.
    pub fn is_feature_event(&self) -> bool {
        matches!(
            self,
            ServerMessage::Created { .. } | ServerMessage::Updated { .. } | ServerMessage::Deleted { .. }
        )
    }
}

impl From<ServerMessage> for PushEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::Joined { room, peer_count } => PushEvent::Joined { room, peer_count },
            ServerMessage::PeerJoined { peer_id } => PushEvent::PeerJoined { peer_id },
            ServerMessage::PeerLeft { peer_id } => PushEvent::PeerLeft { peer_id },
            ServerMessage::Created { feature } => PushEvent::Feature(FeatureEvent::Created(feature)),
            ServerMessage::Updated { feature } => PushEvent::Feature(FeatureEvent::Updated(feature)),
            ServerMessage::Deleted { feature } => PushEvent::Feature(FeatureEvent::Deleted(feature)),
            ServerMessage::Error { message } => PushEvent::Error { message },
        }
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the push channel
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connected,
    Disconnected,
    Joined { room: String, peer_count: usize },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    Feature(FeatureEvent),
    Error { message: String },
}

/// Push channel errors.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Send failed: {0}")]
    Send(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for push channel operations.
pub type PushResult<T> = Result<T, PushError>;

/// A connection delivering [`PushEvent`]s for one room.
pub trait PushChannel {
    /// Join the room of a map.
    fn join(&mut self, room: &str) -> PushResult<()>;

    /// Pending events (non-blocking).
    fn poll_events(&mut self) -> Vec<PushEvent>;
}

// ============================================================================
// Native WebSocket Client
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
mod native_client {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message, connect};
    use url::Url;

    /// Commands sent to the websocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// Websocket push client for native platforms.
    ///
    /// Uses a background thread; events are collected and must be polled.
    pub struct NativePushChannel {
        state: ConnectionState,
        events: Vec<PushEvent>,
        cmd_tx: Option<Sender<WsCommand>>,
        event_rx: Option<Receiver<PushEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl NativePushChannel {
        /// Create a new disconnected client.
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                events: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Connect to a relay.
        pub fn connect(&mut self, url: &str) -> PushResult<()> {
            if self.cmd_tx.is_some() {
                return Err(PushError::AlreadyConnected);
            }

            let parsed_url = Url::parse(url).map_err(|e| PushError::InvalidUrl(e.to_string()))?;
            if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
                return Err(PushError::InvalidUrl(format!(
                    "unsupported scheme {}",
                    parsed_url.scheme()
                )));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<PushEvent>();
            let url = url.to_string();

            let handle = thread::spawn(move || {
                log::info!("Push channel: connecting to {}", url);

                let (mut socket, response) = match connect(&url) {
                    Ok(connected) => connected,
                    Err(e) => {
                        log::error!("Push channel connection failed: {}", e);
                        let _ = event_tx.send(PushEvent::Error {
                            message: format!("Connection failed: {}", e),
                        });
                        return;
                    }
                };
                log::info!("Push channel connected, status: {}", response.status());
                let _ = event_tx.send(PushEvent::Connected);

                if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
                    let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                    let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
                }

                loop {
                    match cmd_rx.try_recv() {
                        Ok(WsCommand::Send(msg)) => {
                            if let Err(e) = socket.send(Message::Text(msg)) {
                                log::error!("Push channel send error: {}", e);
                                break;
                            }
                        }
                        Ok(WsCommand::Close) => {
                            let _ = socket.close(None);
                            break;
                        }
                        Err(TryRecvError::Disconnected) => break,
                        Err(TryRecvError::Empty) => {}
                    }

                    match socket.read() {
                        Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(&txt) {
                            Ok(msg) => {
                                let _ = event_tx.send(PushEvent::from(msg));
                            }
                            Err(e) => log::warn!("Failed to parse push message: {}", e),
                        },
                        Ok(Message::Ping(data)) => {
                            let _ = socket.send(Message::Pong(data));
                        }
                        Ok(Message::Close(_)) => {
                            log::info!("Push channel received close frame");
                            break;
                        }
                        Ok(_) => {}
                        Err(tungstenite::Error::Io(ref e))
                            if e.kind() == std::io::ErrorKind::WouldBlock
                                || e.kind() == std::io::ErrorKind::TimedOut =>
                        {
                            continue;
                        }
                        Err(e) => {
                            log::error!("Push channel read error: {}", e);
                            break;
                        }
                    }
                }

                log::info!("Push channel thread exiting");
                let _ = event_tx.send(PushEvent::Disconnected);
            });

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        /// Disconnect from the relay.
        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.state = ConnectionState::Disconnected;
        }

        /// Send a protocol message.
        pub fn send(&self, msg: &ClientMessage) -> PushResult<()> {
            let tx = self.cmd_tx.as_ref().ok_or(PushError::NotConnected)?;
            let json = serde_json::to_string(msg)?;
            tx.send(WsCommand::Send(json))
                .map_err(|e| PushError::Send(e.to_string()))
        }

        /// Broadcast a feature event to the current room.
        pub fn publish(&self, event: FeatureEvent) -> PushResult<()> {
            self.send(&ClientMessage::Publish { event })
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl PushChannel for NativePushChannel {
        fn join(&mut self, room: &str) -> PushResult<()> {
            self.send(&ClientMessage::Join {
                room: room.to_string(),
            })
        }

        fn poll_events(&mut self) -> Vec<PushEvent> {
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        PushEvent::Connected => self.state = ConnectionState::Connected,
                        PushEvent::Disconnected => self.state = ConnectionState::Disconnected,
                        PushEvent::Error { .. } => self.state = ConnectionState::Error,
                        _ => {}
                    }
                    self.events.push(event);
                }
            }
            std::mem::take(&mut self.events)
        }
    }

    impl Default for NativePushChannel {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativePushChannel {
        fn drop(&mut self) {
            self.disconnect();
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_client::NativePushChannel;
