mod protocol;

pub use protocol::{
    CarInput, ClientMessage, DEFAULT_PORT, ErrorReason, GameOver, JoinedRoom, LobbyInfo, Pedal,
    PedalInput, PlayerDisconnected, ProtocolError, ServerMessage, Steer, Winner,
};
