pub mod controller;
pub mod net;
pub mod physics;
pub mod room;
pub mod session;
pub mod simulation;

pub use controller::{
    ControllerState, ScreenOrientation, SteerTracker, ValidationError, restart_sequence,
    room_code_from_link, steer_from_tilt, validate_room_code,
};
pub use net::{
    CarInput, ClientMessage, DEFAULT_PORT, ErrorReason, GameOver, JoinedRoom, LobbyInfo, Pedal,
    PedalInput, PlayerDisconnected, ProtocolError, ServerMessage, Steer, Winner,
};
pub use physics::{
    Car, EndReason, InputMailbox, Obstacle, PhysicsConfig, Round, RoundMode, RoundOutcome,
    RoundPhase,
};
pub use room::{
    ConnectionId, DEFAULT_MAX_PLAYERS, InvalidRoomCode, JoinError, MAX_PLAYERS_LIMIT, PlayerIndex,
    ROOM_CODE_LEN, Room, RoomCode, RoomRegistry, clamp_max_players,
};
pub use session::{Delivery, Gateway, Role};
pub use simulation::ScreenSession;
