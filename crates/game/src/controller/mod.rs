//! Controller-side helpers: code entry, tilt steering and the restart
//! sequence a controller sends.

use crate::net::{CarInput, ClientMessage, Pedal, PedalInput, ServerMessage, Steer};
use crate::room::{PlayerIndex, ROOM_CODE_LEN, RoomCode};

pub const TILT_DEAD_ZONE: f32 = 15.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid room code")]
    Length(usize),
    #[error("Invalid room code")]
    Characters,
}

/// Checks a typed code before anything goes on the wire. Returns it
/// uppercased.
pub fn validate_room_code(input: &str) -> Result<RoomCode, ValidationError> {
    let trimmed = input.trim();
    let len = trimmed.chars().count();
    if len != ROOM_CODE_LEN {
        return Err(ValidationError::Length(len));
    }
    RoomCode::parse(trimmed).map_err(|_| ValidationError::Characters)
}

/// Reads the `room` query value of a join link. Only a value of exactly six
/// characters qualifies for auto-join.
pub fn room_code_from_link(link: &str) -> Option<RoomCode> {
    let (_, rest) = link.split_once('?')?;
    let query = rest.split('#').next().unwrap_or_default();
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "room")
        .and_then(|(_, value)| validate_room_code(value).ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenOrientation {
    #[default]
    Portrait,
    LandscapeLeft,
    LandscapeRight,
}

impl ScreenOrientation {
    pub fn from_angle(angle: i32) -> Self {
        match angle {
            90 => ScreenOrientation::LandscapeLeft,
            -90 | 270 => ScreenOrientation::LandscapeRight,
            _ => ScreenOrientation::Portrait,
        }
    }

    /// Picks the axis that reads as a steering wheel. `beta` is front-back
    /// tilt, `gamma` left-right, both in degrees.
    pub fn tilt(self, beta: f32, gamma: f32) -> f32 {
        match self {
            ScreenOrientation::Portrait => gamma,
            ScreenOrientation::LandscapeLeft => beta,
            ScreenOrientation::LandscapeRight => -beta,
        }
    }
}

pub fn steer_from_tilt(tilt: f32) -> Steer {
    if tilt < -TILT_DEAD_ZONE {
        Steer::Left
    } else if tilt > TILT_DEAD_ZONE {
        Steer::Right
    } else {
        Steer::Center
    }
}

/// Sends a steer value only when it changes.
#[derive(Debug, Clone, Default)]
pub struct SteerTracker {
    current: Steer,
}

impl SteerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Steer {
        self.current
    }

    pub fn set(&mut self, steer: Steer) -> Option<ClientMessage> {
        if steer == self.current {
            return None;
        }
        self.current = steer;
        Some(ClientMessage::CarInput(CarInput::new(steer)))
    }

    pub fn update(
        &mut self,
        orientation: ScreenOrientation,
        beta: f32,
        gamma: f32,
    ) -> Option<ClientMessage> {
        self.set(steer_from_tilt(orientation.tilt(beta, gamma)))
    }

    pub fn reset(&mut self) {
        self.current = Steer::Center;
    }
}

/// Everything let go, then the restart request.
pub fn restart_sequence() -> [ClientMessage; 4] {
    [
        ClientMessage::CarInput(CarInput::new(Steer::Center)),
        ClientMessage::PedalInput(PedalInput::new(Pedal::Gas, false)),
        ClientMessage::PedalInput(PedalInput::new(Pedal::Brake, false)),
        ClientMessage::RestartGame,
    ]
}

/// What a controller knows about its room, updated from server messages.
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    pub room: Option<RoomCode>,
    pub player_index: Option<PlayerIndex>,
    pub total_players: usize,
    pub game_over: bool,
    pub error: Option<String>,
}

impl ControllerState {
    pub fn is_joined(&self) -> bool {
        self.room.is_some()
    }

    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::JoinedRoom(joined) => {
                self.room = Some(joined.room_code.clone());
                self.player_index = Some(joined.player_index);
                self.total_players = joined.total_players;
                self.error = None;
            }
            ServerMessage::PlayerJoined(info) | ServerMessage::LobbyUpdate(info) => {
                self.total_players = info.total_players;
            }
            ServerMessage::RoomClosed => {
                *self = Self {
                    error: Some("Room closed by host".to_string()),
                    ..Self::default()
                };
            }
            ServerMessage::GameOver(_) => self.game_over = true,
            ServerMessage::RestartGame => self.game_over = false,
            ServerMessage::Error(error) => self.error = Some(error.reason.clone()),
            _ => {}
        }
    }
}
