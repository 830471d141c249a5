//! Per-connection protocol state machine.
//!
//! The gateway owns the room registry and a session table keyed by
//! connection id. It performs no I/O: every handler returns the deliveries
//! the transport should write out, in order.

use std::collections::HashMap;

use crate::net::{
    CarInput, ClientMessage, GameOver, JoinedRoom, LobbyInfo, PedalInput, PlayerDisconnected,
    ServerMessage,
};
use crate::room::{
    ConnectionId, Departure, InvalidRoomCode, MemberRole, PlayerIndex, RoomCode, RoomRegistry,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Unassigned,
    Screen {
        room: RoomCode,
    },
    Controller {
        room: RoomCode,
        player_index: PlayerIndex,
    },
}

impl Role {
    pub fn room(&self) -> Option<&RoomCode> {
        match self {
            Role::Unassigned => None,
            Role::Screen { room } | Role::Controller { room, .. } => Some(room),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unassigned => "unassigned",
            Role::Screen { .. } => "screen",
            Role::Controller { .. } => "controller",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub message: ServerMessage,
}

#[derive(Debug, Default)]
pub struct Gateway {
    registry: RoomRegistry,
    sessions: HashMap<ConnectionId, Role>,
    subscribers: HashMap<RoomCode, Vec<ConnectionId>>,
    outbox: Vec<Delivery>,
}

impl Gateway {
    pub fn new(registry: RoomRegistry) -> Self {
        Self {
            registry,
            sessions: HashMap::new(),
            subscribers: HashMap::new(),
            outbox: Vec::new(),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn role(&self, connection: ConnectionId) -> Option<&Role> {
        self.sessions.get(&connection)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn subscribers(&self, room: &RoomCode) -> &[ConnectionId] {
        self.subscribers
            .get(room)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn connect(&mut self, connection: ConnectionId) {
        self.sessions.entry(connection).or_insert(Role::Unassigned);
    }

    pub fn handle(&mut self, connection: ConnectionId, message: ClientMessage) -> Vec<Delivery> {
        let Some(role) = self.sessions.get(&connection).cloned() else {
            log::debug!("ignoring event from unknown connection {}", connection);
            return Vec::new();
        };

        match (message, role) {
            (ClientMessage::CreateRoom, Role::Unassigned) => self.create_room(connection),
            (ClientMessage::JoinRoom(raw), Role::Unassigned) => self.join_room(connection, &raw),
            (
                ClientMessage::CarInput(input),
                Role::Controller {
                    room, player_index, ..
                },
            ) => self.relay_car_input(&room, player_index, input),
            (
                ClientMessage::PedalInput(input),
                Role::Controller {
                    room, player_index, ..
                },
            ) => self.relay_pedal_input(&room, player_index, input),
            (ClientMessage::RestartGame, role) => {
                if let Some(room) = role.room() {
                    log::debug!("restart requested for room {}", room);
                    self.broadcast(room, ServerMessage::RestartGame);
                }
            }
            (ClientMessage::GameOver(data), role) => {
                if let Some(room) = role.room() {
                    self.game_over(room, data);
                }
            }
            (message, role) => {
                log::debug!(
                    "ignoring {:?} from {} connection {}",
                    message,
                    role.as_str(),
                    connection
                );
            }
        }

        std::mem::take(&mut self.outbox)
    }

    pub fn disconnect(&mut self, connection: ConnectionId) -> Vec<Delivery> {
        let Some(role) = self.sessions.remove(&connection) else {
            return Vec::new();
        };

        match role {
            Role::Unassigned => {}
            Role::Screen { room } => {
                self.unsubscribe(&room, connection);
                if self
                    .registry
                    .disconnect(connection, MemberRole::Screen, &room)
                    .is_some()
                {
                    self.broadcast(&room, ServerMessage::RoomClosed);
                }
                for member in self.subscribers.remove(&room).unwrap_or_default() {
                    self.release_session(member, &room);
                }
            }
            Role::Controller { room, .. } => {
                self.unsubscribe(&room, connection);
                let departure =
                    self.registry
                        .disconnect(connection, MemberRole::Controller, &room);
                if let Some(Departure::ControllerLeft {
                    player_index,
                    remaining,
                }) = departure
                {
                    self.send_to_screen(
                        &room,
                        ServerMessage::PlayerDisconnected(PlayerDisconnected { player_index }),
                    );
                    self.broadcast(
                        &room,
                        ServerMessage::LobbyUpdate(LobbyInfo {
                            player_index: None,
                            total_players: remaining,
                            room_code: Some(room.clone()),
                        }),
                    );
                }
            }
        }

        std::mem::take(&mut self.outbox)
    }

    /// Queues `message` for every connection subscribed to `room`.
    pub fn broadcast(&mut self, room: &RoomCode, message: ServerMessage) {
        let Some(members) = self.subscribers.get(room) else {
            return;
        };
        for &to in members {
            self.outbox.push(Delivery {
                to,
                message: message.clone(),
            });
        }
    }

    /// Drops a member of a closed room back to `Unassigned`, so a later room
    /// that reuses the code never sees it.
    fn release_session(&mut self, connection: ConnectionId, room: &RoomCode) {
        if let Some(role) = self.sessions.get_mut(&connection) {
            if role.room() == Some(room) {
                log::debug!("connection {} released from closed room {}", connection, room);
                *role = Role::Unassigned;
            }
        }
    }

    fn send(&mut self, to: ConnectionId, message: ServerMessage) {
        self.outbox.push(Delivery { to, message });
    }

    fn send_to_screen(&mut self, room: &RoomCode, message: ServerMessage) {
        if let Some(screen) = self.registry.get(room).map(|r| r.screen) {
            self.send(screen, message);
        }
    }

    fn subscribe(&mut self, room: &RoomCode, connection: ConnectionId) {
        let members = self.subscribers.entry(room.clone()).or_default();
        if !members.contains(&connection) {
            members.push(connection);
        }
    }

    fn unsubscribe(&mut self, room: &RoomCode, connection: ConnectionId) {
        if let Some(members) = self.subscribers.get_mut(room) {
            members.retain(|&member| member != connection);
        }
    }

    fn create_room(&mut self, connection: ConnectionId) {
        let room = self.registry.create_room(connection);
        self.subscribe(&room, connection);
        self.sessions.insert(
            connection,
            Role::Screen {
                room: room.clone(),
            },
        );
        self.send(connection, ServerMessage::RoomCreated(room));
    }

    fn join_room(&mut self, connection: ConnectionId, raw: &str) {
        let room = match RoomCode::parse(raw) {
            Ok(room) => room,
            Err(InvalidRoomCode) => {
                log::debug!("join failed: {:?} is not a room code", raw);
                self.send(connection, ServerMessage::error(InvalidRoomCode.to_string()));
                return;
            }
        };

        let player_index = match self.registry.join_room(&room, connection) {
            Ok(index) => index,
            Err(err) => {
                log::debug!("connection {} could not join {}: {}", connection, room, err);
                self.send(connection, ServerMessage::error(err.to_string()));
                return;
            }
        };

        self.subscribe(&room, connection);
        self.sessions.insert(
            connection,
            Role::Controller {
                room: room.clone(),
                player_index,
            },
        );

        let total_players = self
            .registry
            .get(&room)
            .map(|r| r.controller_count())
            .unwrap_or_default();
        let info = LobbyInfo {
            player_index: Some(player_index),
            total_players,
            room_code: Some(room.clone()),
        };

        self.send(
            connection,
            ServerMessage::JoinedRoom(JoinedRoom {
                room_code: room.clone(),
                player_index,
                total_players,
            }),
        );
        self.broadcast(&room, ServerMessage::PlayerJoined(info.clone()));
        self.broadcast(&room, ServerMessage::LobbyUpdate(info.clone()));
        self.send_to_screen(&room, ServerMessage::PlayerJoined(info));
    }

    fn relay_car_input(&mut self, room: &RoomCode, player_index: PlayerIndex, input: CarInput) {
        log::trace!("room {} player {} steer {:?}", room, player_index, input.steer);
        let tagged = CarInput {
            player_index: Some(player_index),
            ..input
        };
        self.send_to_screen(room, ServerMessage::CarInput(tagged));
    }

    fn relay_pedal_input(&mut self, room: &RoomCode, player_index: PlayerIndex, input: PedalInput) {
        log::trace!(
            "room {} player {} pedal {:?} down={}",
            room,
            player_index,
            input.pedal,
            input.is_down
        );
        let tagged = PedalInput {
            player_index: Some(player_index),
            ..input
        };
        self.send_to_screen(room, ServerMessage::PedalInput(tagged));
    }

    fn game_over(&mut self, room: &RoomCode, data: GameOver) {
        log::debug!("game over in room {}", room);
        self.broadcast(room, ServerMessage::GameOver(data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{Steer, Winner};

    const SCREEN: ConnectionId = 1;

    fn gateway_with_room(max_players: usize) -> (Gateway, RoomCode) {
        let mut gateway = Gateway::new(RoomRegistry::with_seed(max_players, 9));
        gateway.connect(SCREEN);
        let deliveries = gateway.handle(SCREEN, ClientMessage::CreateRoom);
        let room = match &deliveries[..] {
            [Delivery {
                to: SCREEN,
                message: ServerMessage::RoomCreated(code),
            }] => code.clone(),
            other => panic!("unexpected deliveries: {:?}", other),
        };
        (gateway, room)
    }

    fn join(gateway: &mut Gateway, connection: ConnectionId, room: &RoomCode) -> Vec<Delivery> {
        gateway.connect(connection);
        gateway.handle(
            connection,
            ClientMessage::JoinRoom(room.as_str().to_lowercase()),
        )
    }

    fn to(deliveries: &[Delivery], connection: ConnectionId) -> Vec<&ServerMessage> {
        deliveries
            .iter()
            .filter(|d| d.to == connection)
            .map(|d| &d.message)
            .collect()
    }

    #[test]
    fn test_create_room_assigns_screen_role() {
        let (gateway, room) = gateway_with_room(2);
        assert_eq!(
            gateway.role(SCREEN),
            Some(&Role::Screen { room: room.clone() })
        );
        assert_eq!(gateway.subscribers(&room), &[SCREEN]);
    }

    #[test]
    fn test_join_notifies_sender_room_and_screen() {
        let (mut gateway, room) = gateway_with_room(2);
        let deliveries = join(&mut gateway, 2, &room);

        let info = LobbyInfo {
            player_index: Some(0),
            total_players: 1,
            room_code: Some(room.clone()),
        };
        assert_eq!(
            to(&deliveries, 2),
            vec![
                &ServerMessage::JoinedRoom(JoinedRoom {
                    room_code: room.clone(),
                    player_index: 0,
                    total_players: 1,
                }),
                &ServerMessage::PlayerJoined(info.clone()),
                &ServerMessage::LobbyUpdate(info.clone()),
            ]
        );
        assert_eq!(
            to(&deliveries, SCREEN),
            vec![
                &ServerMessage::PlayerJoined(info.clone()),
                &ServerMessage::LobbyUpdate(info.clone()),
                &ServerMessage::PlayerJoined(info),
            ]
        );
    }

    #[test]
    fn test_join_failures_reply_to_sender_only() {
        let (mut gateway, room) = gateway_with_room(1);
        join(&mut gateway, 2, &room);

        let full = join(&mut gateway, 3, &room);
        assert_eq!(
            full,
            vec![Delivery {
                to: 3,
                message: ServerMessage::error("Room is full"),
            }]
        );
        assert_eq!(gateway.role(3), Some(&Role::Unassigned));

        let missing_code = if room.as_str() == "AAAAAA" { "BBBBBB" } else { "AAAAAA" };
        gateway.connect(4);
        let missing = gateway.handle(4, ClientMessage::JoinRoom(missing_code.into()));
        assert_eq!(
            missing,
            vec![Delivery {
                to: 4,
                message: ServerMessage::error("Room not found"),
            }]
        );

        let malformed = gateway.handle(4, ClientMessage::JoinRoom("abc".into()));
        assert_eq!(
            malformed,
            vec![Delivery {
                to: 4,
                message: ServerMessage::error("Invalid room code"),
            }]
        );
        assert_eq!(gateway.registry().get(&room).unwrap().controller_count(), 1);
    }

    #[test]
    fn test_inputs_are_tagged_and_sent_to_screen_only() {
        let (mut gateway, room) = gateway_with_room(2);
        join(&mut gateway, 2, &room);
        join(&mut gateway, 3, &room);

        let deliveries = gateway.handle(
            3,
            ClientMessage::CarInput(CarInput {
                steer: Steer::Right,
                player_index: Some(0),
            }),
        );
        assert_eq!(
            deliveries,
            vec![Delivery {
                to: SCREEN,
                message: ServerMessage::CarInput(CarInput {
                    steer: Steer::Right,
                    player_index: Some(1),
                }),
            }]
        );

        let deliveries = gateway.handle(
            2,
            ClientMessage::PedalInput(PedalInput::new(crate::net::Pedal::Gas, true)),
        );
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].to, SCREEN);
        assert!(matches!(
            deliveries[0].message,
            ServerMessage::PedalInput(PedalInput {
                player_index: Some(0),
                is_down: true,
                ..
            })
        ));
    }

    #[test]
    fn test_role_inappropriate_events_are_ignored() {
        let (mut gateway, room) = gateway_with_room(2);

        // screen cannot steer, and cannot join after creating
        assert!(
            gateway
                .handle(SCREEN, ClientMessage::CarInput(CarInput::new(Steer::Left)))
                .is_empty()
        );
        assert!(
            gateway
                .handle(SCREEN, ClientMessage::JoinRoom(room.to_string()))
                .is_empty()
        );

        // unassigned connections cannot act
        gateway.connect(5);
        assert!(gateway.handle(5, ClientMessage::RestartGame).is_empty());
        assert!(
            gateway
                .handle(5, ClientMessage::CarInput(CarInput::new(Steer::Left)))
                .is_empty()
        );

        // a controller cannot create a room
        join(&mut gateway, 2, &room);
        assert!(gateway.handle(2, ClientMessage::CreateRoom).is_empty());
        assert_eq!(gateway.registry().room_count(), 1);

        // never connected
        assert!(gateway.handle(77, ClientMessage::CreateRoom).is_empty());
    }

    #[test]
    fn test_restart_and_game_over_broadcast() {
        let (mut gateway, room) = gateway_with_room(2);
        join(&mut gateway, 2, &room);

        let deliveries = gateway.handle(2, ClientMessage::RestartGame);
        assert_eq!(to(&deliveries, SCREEN), vec![&ServerMessage::RestartGame]);
        assert_eq!(to(&deliveries, 2), vec![&ServerMessage::RestartGame]);

        let over = GameOver {
            winner: Some(Winner::Draw),
        };
        let deliveries = gateway.handle(SCREEN, ClientMessage::GameOver(over));
        assert_eq!(deliveries.len(), 2);
        assert!(
            deliveries
                .iter()
                .all(|d| d.message == ServerMessage::GameOver(over))
        );
    }

    #[test]
    fn test_controller_disconnect_notifies_screen() {
        let (mut gateway, room) = gateway_with_room(2);
        join(&mut gateway, 2, &room);
        join(&mut gateway, 3, &room);

        let deliveries = gateway.disconnect(2);
        assert_eq!(
            to(&deliveries, SCREEN),
            vec![
                &ServerMessage::PlayerDisconnected(PlayerDisconnected { player_index: 0 }),
                &ServerMessage::LobbyUpdate(LobbyInfo {
                    player_index: None,
                    total_players: 1,
                    room_code: Some(room.clone()),
                }),
            ]
        );
        assert_eq!(to(&deliveries, 3).len(), 1);
        assert!(to(&deliveries, 2).is_empty());

        // the freed slot is handed out again
        let deliveries = join(&mut gateway, 4, &room);
        assert!(matches!(
            to(&deliveries, 4)[0],
            ServerMessage::JoinedRoom(JoinedRoom {
                player_index: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_screen_disconnect_closes_room() {
        let (mut gateway, room) = gateway_with_room(2);
        join(&mut gateway, 2, &room);

        let deliveries = gateway.disconnect(SCREEN);
        assert_eq!(
            deliveries,
            vec![Delivery {
                to: 2,
                message: ServerMessage::RoomClosed,
            }]
        );
        assert!(!gateway.registry().contains(&room));
        assert!(gateway.subscribers(&room).is_empty());

        assert!(gateway.disconnect(SCREEN).is_empty());

        // orphaned controller inputs go nowhere, and leaving is quiet
        assert_eq!(gateway.role(2), Some(&Role::Unassigned));
        assert!(
            gateway
                .handle(2, ClientMessage::CarInput(CarInput::new(Steer::Left)))
                .is_empty()
        );
        assert!(gateway.disconnect(2).is_empty());
        assert_eq!(gateway.session_count(), 0);
    }

    #[test]
    fn test_controllers_of_closed_room_cannot_reach_new_rooms() {
        let (mut gateway, room) = gateway_with_room(2);
        join(&mut gateway, 2, &room);
        join(&mut gateway, 3, &room);
        gateway.disconnect(SCREEN);

        gateway.connect(10);
        let created = gateway.handle(10, ClientMessage::CreateRoom);
        let ServerMessage::RoomCreated(fresh) = &created[0].message else {
            panic!("unexpected deliveries: {:?}", created);
        };
        let fresh = fresh.clone();

        assert_eq!(gateway.role(2), Some(&Role::Unassigned));
        assert_eq!(gateway.role(3), Some(&Role::Unassigned));
        assert!(
            gateway
                .handle(2, ClientMessage::CarInput(CarInput::new(Steer::Right)))
                .is_empty()
        );
        assert!(gateway.handle(3, ClientMessage::RestartGame).is_empty());

        // the released connection may join the new room like anyone else
        let deliveries = join(&mut gateway, 2, &fresh);
        assert!(matches!(
            to(&deliveries, 2)[0],
            ServerMessage::JoinedRoom(JoinedRoom {
                player_index: 0,
                ..
            })
        ));
        assert_eq!(gateway.subscribers(&fresh), &[10, 2]);
    }
}
