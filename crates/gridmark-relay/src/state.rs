//! Room registry shared by all connections.

use dashmap::DashMap;
use gridmark_core::push::{FeatureEvent, ServerMessage};
use std::collections::HashSet;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Sender id of events published over HTTP by the backend.
pub const BACKEND_PEER: &str = "backend";

/// A room message tagged with the id of its sender.
pub type Envelope = (String, ServerMessage);

/// Room state
struct Room {
    /// Broadcast channel for this room
    tx: broadcast::Sender<Envelope>,
    /// Connected peer IDs
    peers: HashSet<String>,
}

impl Room {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashSet::new(),
        }
    }
}

/// Shared application state
pub struct AppState {
    rooms: DashMap<String, Room>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Add a peer to a room, creating it if needed. Returns the room
    /// subscription and the new peer count.
    pub fn join_room(&self, room_id: &str, peer_id: &str) -> (broadcast::Receiver<Envelope>, usize) {
        let mut room = self.rooms.entry(room_id.to_string()).or_insert_with(Room::new);
        room.peers.insert(peer_id.to_string());
        (room.tx.subscribe(), room.peers.len())
    }

    /// Remove a peer; the room is dropped once empty.
    pub fn leave_room(&self, room_id: &str, peer_id: &str) {
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            room.peers.remove(peer_id);
            if room.peers.is_empty() {
                drop(room);
                self.rooms.remove(room_id);
            }
        }
    }

    /// Send a message to every subscriber of a room. Returns the number of
    /// subscribers reached.
    pub fn broadcast(&self, room_id: &str, from: &str, msg: ServerMessage) -> usize {
        match self.rooms.get(room_id) {
            Some(room) => room.tx.send((from.to_string(), msg)).unwrap_or(0),
            None => 0,
        }
    }

    /// Broadcast a feature event to a room.
    pub fn publish(&self, room_id: &str, from: &str, event: FeatureEvent) -> usize {
        self.broadcast(room_id, from, ServerMessage::from(event))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn peer_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.peers.len())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a room message is forwarded to `peer_id`.
///
/// Feature events reach every member, their publisher included, so each
/// editor applies its own changes from the authoritative stream. Presence
/// messages are not echoed.
pub fn should_deliver(peer_id: &str, from: &str, msg: &ServerMessage) -> bool {
    msg.is_feature_event() || from != peer_id
}
