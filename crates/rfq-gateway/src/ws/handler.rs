//! WebSocket handler for live channel-update subscriptions.
//!
//! The socket is push-only from the server's point of view: once connected,
//! the client receives a JSON-encoded [`rfq_bus::CoordinatorEvent`] for every
//! event matching its filter, until it disconnects or goes idle for too long.

use crate::domain::correlation::CorrelationId;
use axum::extract::ws::{Message, WebSocket};
use futures::StreamExt;
use rfq_bus::{EventFilter, SharedBus};
use std::time::Duration;
use tokio::time::{interval, Instant};
use tracing::{debug, info, warn};

/// Default maximum inbound message size (client pings/control frames only).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub max_message_size: usize,
    pub ping_interval: Duration,
    pub idle_timeout: Duration,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            ping_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

pub struct WebSocketHandler {
    bus: SharedBus,
    filter: EventFilter,
    connection_id: CorrelationId,
    config: WebSocketConfig,
}

impl WebSocketHandler {
    pub fn new(bus: SharedBus, filter: EventFilter) -> Self {
        Self::with_config(bus, filter, WebSocketConfig::default())
    }

    pub fn with_config(bus: SharedBus, filter: EventFilter, config: WebSocketConfig) -> Self {
        Self { bus, filter, connection_id: CorrelationId::new(), config }
    }

    pub async fn handle(self, mut socket: WebSocket) {
        info!(connection_id = %self.connection_id, "new websocket connection");

        let mut subscription = self.bus.subscribe(self.filter.clone());
        let mut ping_interval = interval(self.config.ping_interval);
        let mut last_activity = Instant::now();

        loop {
            if last_activity.elapsed() > self.config.idle_timeout {
                info!(connection_id = %self.connection_id, "closing idle websocket connection");
                break;
            }

            tokio::select! {
                event = subscription.recv() => {
                    match event {
                        Some(event) => {
                            let payload = match serde_json::to_string(&event) {
                                Ok(payload) => payload,
                                Err(e) => {
                                    warn!(error = %e, "failed to serialize event");
                                    continue;
                                }
                            };
                            if socket.send(Message::Text(payload)).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            debug!(connection_id = %self.connection_id, "event bus closed");
                            break;
                        }
                    }
                }
                _ = ping_interval.tick() => {
                    if socket.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
                incoming = socket.next() => {
                    match incoming {
                        Some(Ok(Message::Ping(data))) => {
                            last_activity = Instant::now();
                            if socket.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            last_activity = Instant::now();
                        }
                        Some(Ok(Message::Text(text))) => {
                            last_activity = Instant::now();
                            if text.len() > self.config.max_message_size {
                                warn!(connection_id = %self.connection_id, "inbound message too large, dropping connection");
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            debug!(connection_id = %self.connection_id, "websocket close received");
                            break;
                        }
                        Some(Ok(Message::Binary(_))) => {
                            last_activity = Instant::now();
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "websocket error");
                            break;
                        }
                    }
                }
            }
        }

        info!(connection_id = %self.connection_id, "websocket connection closed");
    }
}
