use std::net::SocketAddr;

use carconsole::{ConnectionId, PlayerIndex, RoomCode, Winner};

#[derive(Debug, Clone)]
pub enum ServerEvent {
    Listening {
        addr: SocketAddr,
    },
    ClientConnected {
        connection: ConnectionId,
        addr: SocketAddr,
    },
    ClientDisconnected {
        connection: ConnectionId,
        role: &'static str,
    },
    RoomCreated {
        room: RoomCode,
        screen: ConnectionId,
    },
    PlayerJoined {
        room: RoomCode,
        connection: ConnectionId,
        player_index: PlayerIndex,
    },
    JoinRejected {
        connection: ConnectionId,
        reason: String,
    },
    RoomClosed {
        room: RoomCode,
    },
    GameOver {
        room: RoomCode,
        winner: Option<Winner>,
    },
    MalformedFrame {
        connection: ConnectionId,
        error: String,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn level(&self) -> log::Level {
        match self {
            ServerEvent::JoinRejected { .. } | ServerEvent::MalformedFrame { .. } => {
                log::Level::Warn
            }
            ServerEvent::Error { .. } => log::Level::Error,
            ServerEvent::ClientConnected { .. } | ServerEvent::ClientDisconnected { .. } => {
                log::Level::Debug
            }
            _ => log::Level::Info,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ServerEvent::Listening { addr } => format!("listening on ws://{}", addr),
            ServerEvent::ClientConnected { connection, addr } => {
                format!("connection {} accepted from {}", connection, addr)
            }
            ServerEvent::ClientDisconnected { connection, role } => {
                format!("{} connection {} disconnected", role, connection)
            }
            ServerEvent::RoomCreated { room, screen } => {
                format!("room {} created by connection {}", room, screen)
            }
            ServerEvent::PlayerJoined {
                room,
                connection,
                player_index,
            } => format!(
                "connection {} joined room {} as player {}",
                connection,
                room,
                u16::from(*player_index) + 1
            ),
            ServerEvent::JoinRejected { connection, reason } => {
                format!("connection {} could not join: {}", connection, reason)
            }
            ServerEvent::RoomClosed { room } => format!("room {} closed", room),
            ServerEvent::GameOver { room, winner } => match winner {
                Some(winner) => format!("room {} game over, winner: {}", room, winner),
                None => format!("room {} game over", room),
            },
            ServerEvent::MalformedFrame { connection, error } => {
                format!("dropping frame from connection {}: {}", connection, error)
            }
            ServerEvent::Error { message } => message.clone(),
        }
    }

    /// Writes the event through the `log` facade. Used when no dashboard is up.
    pub fn log(&self) {
        log::log!(self.level(), "{}", self.message());
    }
}
