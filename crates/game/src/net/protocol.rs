use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::room::{PlayerIndex, RoomCode};

pub const DEFAULT_PORT: u16 = 3333;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Steer {
    Left,
    Right,
    #[default]
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Pedal {
    Gas,
    Brake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarInput {
    pub steer: Steer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_index: Option<PlayerIndex>,
}

impl CarInput {
    pub fn new(steer: Steer) -> Self {
        Self {
            steer,
            player_index: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PedalInput {
    #[serde(rename = "type")]
    pub pedal: Pedal,
    pub is_down: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_index: Option<PlayerIndex>,
}

impl PedalInput {
    pub fn new(pedal: Pedal, is_down: bool) -> Self {
        Self {
            pedal,
            is_down,
            player_index: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedRoom {
    pub room_code: RoomCode,
    pub player_index: PlayerIndex,
    pub total_players: usize,
}

/// Payload of `player-joined` and `lobby-update`. A lobby update sent after a
/// controller leaves only carries the count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_index: Option<PlayerIndex>,
    pub total_players: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_code: Option<RoomCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDisconnected {
    pub player_index: PlayerIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReason {
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Player(PlayerIndex),
    Draw,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Player(index) => write!(f, "player {}", u16::from(*index) + 1),
            Winner::Draw => f.write_str("draw"),
        }
    }
}

const DRAW_LABEL: &str = "DRAW";

impl Serialize for Winner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Winner::Player(index) => serializer.serialize_u8(*index),
            Winner::Draw => serializer.serialize_str(DRAW_LABEL),
        }
    }
}

impl<'de> Deserialize<'de> for Winner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Index(PlayerIndex),
            Label(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Index(index) => Ok(Winner::Player(index)),
            Raw::Label(label) if label == DRAW_LABEL => Ok(Winner::Draw),
            Raw::Label(other) => Err(de::Error::invalid_value(
                de::Unexpected::Str(&other),
                &"a player index or \"DRAW\"",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameOver {
    #[serde(default)]
    pub winner: Option<Winner>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    CreateRoom,
    JoinRoom(String),
    CarInput(CarInput),
    PedalInput(PedalInput),
    RestartGame,
    GameOver(GameOver),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    RoomCreated(RoomCode),
    JoinedRoom(JoinedRoom),
    PlayerJoined(LobbyInfo),
    LobbyUpdate(LobbyInfo),
    CarInput(CarInput),
    PedalInput(PedalInput),
    RestartGame,
    GameOver(GameOver),
    RoomClosed,
    PlayerDisconnected(PlayerDisconnected),
    Error(ErrorReason),
}

impl ServerMessage {
    pub fn error(reason: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorReason {
            reason: reason.into(),
        })
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::RoomCreated(_) => "room-created",
            ServerMessage::JoinedRoom(_) => "joined-room",
            ServerMessage::PlayerJoined(_) => "player-joined",
            ServerMessage::LobbyUpdate(_) => "lobby-update",
            ServerMessage::CarInput(_) => "car-input",
            ServerMessage::PedalInput(_) => "pedal-input",
            ServerMessage::RestartGame => "restart-game",
            ServerMessage::GameOver(_) => "game-over",
            ServerMessage::RoomClosed => "room-closed",
            ServerMessage::PlayerDisconnected(_) => "player-disconnected",
            ServerMessage::Error(_) => "error",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("encoding failed: {0}")]
    Encode(serde_json::Error),
    #[error("decoding failed: {0}")]
    Decode(serde_json::Error),
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
