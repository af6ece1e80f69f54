//! Gridmark Relay Server
//!
//! Relays feature events between the editors of a map. Each map id is a
//! room; editors join it over a websocket and backends publish into it over
//! HTTP.
//!
//! ## Protocol
//!
//! Client messages are JSON:
//! ```json
//! { "type": "join", "room": "map-id" }
//! { "type": "leave" }
//! { "type": "publish", "event": { "event": "created", "feature": { ... } } }
//! ```
//!
//! Server messages: `joined`, `peer_joined`, `peer_left`, `created`,
//! `updated`, `deleted`, `error`.

mod connection;
mod state;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use connection::Connection;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use gridmark_core::push::{ClientMessage, FeatureEvent, ServerMessage};
use serde::Serialize;
use state::{AppState, BACKEND_PEER};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

const DEFAULT_ADDR: &str = "0.0.0.0:3030";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gridmark_relay=info,tower_http=info".into()),
        )
        .init();

    let addr: SocketAddr = std::env::var("GRIDMARK_RELAY_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;

    let app = router(Arc::new(AppState::new()));

    info!("Gridmark relay listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/rooms/{room}/events", post(publish_event))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "Gridmark Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct PublishReceipt {
    room: String,
    delivered: usize,
}

/// Publish a feature event from a backend.
async fn publish_event(
    State(state): State<Arc<AppState>>,
    Path(room): Path<String>,
    Json(event): Json<FeatureEvent>,
) -> impl IntoResponse {
    let name = event.name();
    let delivered = state.publish(&room, BACKEND_PEER, event);
    info!(
        "Backend published {} to room {} ({} of {} peers reached)",
        name,
        room,
        delivered,
        state.peer_count(&room)
    );
    (StatusCode::ACCEPTED, Json(PublishReceipt { room, delivered }))
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serialize and send a message. Returns false once the socket is gone.
async fn send_message(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!("Failed to serialize message: {}", e);
            true
        }
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut conn = Connection::new(Uuid::new_v4().to_string());
    info!("New connection: {}", conn.peer_id());

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", conn.peer_id(), e);
                        break;
                    }
                };

                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => conn.handle(&state, msg),
                    Err(e) => {
                        warn!("Invalid message from {}: {}", conn.peer_id(), e);
                        Some(ServerMessage::Error {
                            message: format!("Invalid message: {}", e),
                        })
                    }
                };
                if let Some(reply) = reply {
                    if !send_message(&mut sender, &reply).await {
                        break;
                    }
                }
            }

            outgoing = conn.next_outgoing() => {
                match outgoing {
                    Some(msg) => {
                        if !send_message(&mut sender, &msg).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    if let Some(room) = conn.room() {
        info!("Peer {} disconnected from room {}", conn.peer_id(), room);
    }
    conn.leave(&state);
    info!("Connection closed: {} ({} rooms open)", conn.peer_id(), state.room_count());
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridmark_core::geo::{GeoFeature, Geometry, Properties};
    use gridmark_core::push::{NativePushChannel, PushChannel, PushEvent};
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn serve() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::new(AppState::new()));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    /// Poll the channel until an event matches, collecting everything seen.
    async fn wait_for(
        channel: &mut NativePushChannel,
        pred: impl Fn(&PushEvent) -> bool,
    ) -> Vec<PushEvent> {
        let mut seen = Vec::new();
        for _ in 0..100 {
            let events = channel.poll_events();
            let found = events.iter().any(&pred);
            seen.extend(events);
            if found {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("Timed out, saw {:?}", seen);
    }

    async fn post(addr: SocketAddr, path: &str, body: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            path,
            addr,
            body.len(),
            body
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_backend_event_reaches_native_client() {
        let addr = serve().await;

        let mut channel = NativePushChannel::new();
        channel.connect(&format!("ws://{}/ws", addr)).unwrap();
        channel.join("map-1").unwrap();
        let seen = wait_for(&mut channel, |e| matches!(e, PushEvent::Joined { .. })).await;
        assert!(seen.contains(&PushEvent::Connected));
        assert!(channel.is_connected());

        let mut properties = Properties::new();
        properties.insert("id".to_string(), json!("f1"));
        let event = FeatureEvent::Created(GeoFeature::new(
            Some(Geometry::Point([13.4, 52.5])),
            properties,
        ));
        let response = post(addr, "/rooms/map-1/events", &serde_json::to_string(&event).unwrap()).await;
        assert!(response.starts_with("HTTP/1.1 202"), "{}", response);
        assert!(response.contains("\"delivered\":1"), "{}", response);

        let seen = wait_for(&mut channel, |e| {
            matches!(e, PushEvent::Feature(FeatureEvent::Created(_)))
        })
        .await;
        let created = seen.iter().find_map(|e| match e {
            PushEvent::Feature(FeatureEvent::Created(feature)) => feature.id(),
            _ => None,
        });
        assert_eq!(created.map(|id| id.to_string()), Some("f1".to_string()));

        channel.disconnect();
    }
}
