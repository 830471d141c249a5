use carconsole::{DEFAULT_MAX_PLAYERS, DEFAULT_PORT};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_players: usize,
    pub log_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            max_players: DEFAULT_MAX_PLAYERS,
            log_capacity: 500,
        }
    }
}
