//! WebSocket module for live channel-update subscriptions.

pub mod handler;

pub use handler::{WebSocketConfig, WebSocketHandler, DEFAULT_MAX_MESSAGE_SIZE};
