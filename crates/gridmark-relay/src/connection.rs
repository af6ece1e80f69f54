//! Per-connection room membership.

use crate::state::{AppState, Envelope, should_deliver};
use gridmark_core::push::{ClientMessage, ServerMessage};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// One websocket peer and the room it is in.
pub struct Connection {
    peer_id: String,
    room: Option<String>,
    rx: Option<broadcast::Receiver<Envelope>>,
}

impl Connection {
    pub fn new(peer_id: String) -> Self {
        Self {
            peer_id,
            room: None,
            rx: None,
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    /// Apply a client message. Returns the direct reply, if any.
    pub fn handle(&mut self, state: &AppState, msg: ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::Join { room } => {
                self.leave(state);
                let (rx, peer_count) = state.join_room(&room, &self.peer_id);
                state.broadcast(
                    &room,
                    &self.peer_id,
                    ServerMessage::PeerJoined {
                        peer_id: self.peer_id.clone(),
                    },
                );
                info!("Peer {} joined room {}", self.peer_id, room);
                self.rx = Some(rx);
                self.room = Some(room.clone());
                Some(ServerMessage::Joined { room, peer_count })
            }
            ClientMessage::Leave => {
                self.leave(state);
                None
            }
            ClientMessage::Publish { event } => match &self.room {
                Some(room) => {
                    let reached = state.publish(room, &self.peer_id, event);
                    debug!("Peer {} published to {} ({} receivers)", self.peer_id, room, reached);
                    None
                }
                None => Some(ServerMessage::Error {
                    message: "Join a room before publishing".to_string(),
                }),
            },
        }
    }

    /// Leave the current room, telling the remaining peers.
    pub fn leave(&mut self, state: &AppState) {
        self.rx = None;
        let Some(room) = self.room.take() else {
            return;
        };
        state.leave_room(&room, &self.peer_id);
        state.broadcast(
            &room,
            &self.peer_id,
            ServerMessage::PeerLeft {
                peer_id: self.peer_id.clone(),
            },
        );
        info!("Peer {} left room {}", self.peer_id, room);
    }

    /// Wait for the next room message addressed to this peer. Pends forever
    /// outside a room.
    pub async fn next_outgoing(&mut self) -> Option<ServerMessage> {
        let Some(rx) = self.rx.as_mut() else {
            return std::future::pending().await;
        };
        loop {
            match rx.recv().await {
                Ok((from, msg)) if should_deliver(&self.peer_id, &from, &msg) => return Some(msg),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Peer {} lagged, skipped {} messages", self.peer_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
