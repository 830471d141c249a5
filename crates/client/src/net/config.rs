use std::time::Duration;

use carconsole::{DEFAULT_MAX_PLAYERS, DEFAULT_PORT};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub frame_interval: Duration,
    /// Players the screen waits for before starting on its own.
    pub lobby_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: format!("ws://127.0.0.1:{}", DEFAULT_PORT),
            frame_interval: Duration::from_millis(16),
            lobby_capacity: DEFAULT_MAX_PLAYERS,
        }
    }
}
