mod code;

use std::collections::HashMap;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;

pub use code::{InvalidRoomCode, ROOM_CODE_LEN, RoomCode};

pub type ConnectionId = u64;
pub type PlayerIndex = u8;

pub const DEFAULT_MAX_PLAYERS: usize = 2;

/// Most controllers a room seats. Keeps every starting car clear of its
/// neighbours' contact boxes and every index inside `PlayerIndex`.
pub const MAX_PLAYERS_LIMIT: usize = 4;

/// Clamps a requested lobby size into `1..=MAX_PLAYERS_LIMIT`.
pub fn clamp_max_players(requested: usize) -> usize {
    requested.clamp(1, MAX_PLAYERS_LIMIT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room is full")]
    RoomFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Screen,
    Controller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSlot {
    pub connection: ConnectionId,
    pub player_index: PlayerIndex,
}

#[derive(Debug)]
pub struct Room {
    pub code: RoomCode,
    pub screen: ConnectionId,
    pub controllers: Vec<ControllerSlot>,
    pub created_at: Instant,
    max_players: usize,
}

impl Room {
    fn new(code: RoomCode, screen: ConnectionId, max_players: usize) -> Self {
        Self {
            code,
            screen,
            controllers: Vec::new(),
            created_at: Instant::now(),
            max_players,
        }
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn is_full(&self) -> bool {
        self.controllers.len() >= self.max_players
    }

    pub fn player_index_of(&self, connection: ConnectionId) -> Option<PlayerIndex> {
        self.controllers
            .iter()
            .find(|slot| slot.connection == connection)
            .map(|slot| slot.player_index)
    }

    /// Smallest index not held by any controller.
    fn next_free_index(&self) -> Option<PlayerIndex> {
        (0..=PlayerIndex::MAX).find(|index| {
            !self
                .controllers
                .iter()
                .any(|slot| slot.player_index == *index)
        })
    }

    fn add_controller(&mut self, connection: ConnectionId) -> Result<PlayerIndex, JoinError> {
        if self.is_full() {
            return Err(JoinError::RoomFull);
        }
        let player_index = self.next_free_index().ok_or(JoinError::RoomFull)?;
        self.controllers.push(ControllerSlot {
            connection,
            player_index,
        });
        Ok(player_index)
    }

    fn remove_controller(&mut self, connection: ConnectionId) -> Option<PlayerIndex> {
        let pos = self
            .controllers
            .iter()
            .position(|slot| slot.connection == connection)?;
        Some(self.controllers.remove(pos).player_index)
    }
}

/// What a disconnect did to the registry.
#[derive(Debug)]
pub enum Departure {
    RoomClosed(Room),
    ControllerLeft {
        player_index: PlayerIndex,
        remaining: usize,
    },
}

#[derive(Debug)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
    max_players: usize,
    rng: StdRng,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PLAYERS)
    }
}

impl RoomRegistry {
    pub fn new(max_players: usize) -> Self {
        Self::with_rng(max_players, StdRng::from_entropy())
    }

    pub fn with_seed(max_players: usize, seed: u64) -> Self {
        Self::with_rng(max_players, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_players: usize, rng: StdRng) -> Self {
        let clamped = clamp_max_players(max_players);
        if clamped != max_players {
            log::warn!("max players {} out of range, using {}", max_players, clamped);
        }
        Self {
            rooms: HashMap::new(),
            max_players: clamped,
            rng,
        }
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn create_room(&mut self, screen: ConnectionId) -> RoomCode {
        let code = loop {
            let candidate = RoomCode::generate(&mut self.rng);
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        self.rooms.insert(
            code.clone(),
            Room::new(code.clone(), screen, self.max_players),
        );
        log::debug!("room {} created by screen {}", code, screen);

        code
    }

    pub fn join_room(
        &mut self,
        code: &RoomCode,
        controller: ConnectionId,
    ) -> Result<PlayerIndex, JoinError> {
        let room = self.rooms.get_mut(code).ok_or(JoinError::RoomNotFound)?;
        let player_index = room.add_controller(controller)?;
        log::debug!(
            "controller {} joined room {} as player {}",
            controller,
            code,
            player_index
        );
        Ok(player_index)
    }

    /// Safe to call repeatedly; a room that is already gone yields `None`.
    pub fn disconnect(
        &mut self,
        connection: ConnectionId,
        role: MemberRole,
        code: &RoomCode,
    ) -> Option<Departure> {
        match role {
            MemberRole::Screen => {
                let room = self.rooms.remove(code)?;
                log::debug!("room {} destroyed, screen {} left", code, connection);
                Some(Departure::RoomClosed(room))
            }
            MemberRole::Controller => {
                let room = self.rooms.get_mut(code)?;
                let player_index = room.remove_controller(connection)?;
                log::debug!("controller {} left room {}", connection, code);
                Some(Departure::ControllerLeft {
                    player_index,
                    remaining: room.controller_count(),
                })
            }
        }
    }

    pub fn get(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn code(raw: &str) -> RoomCode {
        RoomCode::parse(raw).unwrap()
    }

    #[test]
    fn test_room_codes_unique_among_live_rooms() {
        let mut registry = RoomRegistry::with_seed(2, 42);
        let mut seen = HashSet::new();

        for screen in 0..200 {
            let code = registry.create_room(screen);
            assert_eq!(code.as_str().len(), ROOM_CODE_LEN);
            assert!(seen.insert(code));
        }
        assert_eq!(registry.room_count(), 200);
    }

    #[test]
    fn test_join_unknown_room() {
        let mut registry = RoomRegistry::with_seed(2, 1);
        let live = registry.create_room(1);

        let unknown = if live.as_str() == "ZZZZZZ" {
            code("YYYYYY")
        } else {
            code("ZZZZZZ")
        };

        assert_eq!(
            registry.join_room(&unknown, 2),
            Err(JoinError::RoomNotFound)
        );
        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.get(&live).unwrap().controller_count(), 0);
        assert!(!registry.contains(&unknown));
    }

    #[test]
    fn test_join_full_room() {
        let mut registry = RoomRegistry::with_seed(2, 1);
        let room = registry.create_room(1);

        assert_eq!(registry.join_room(&room, 2), Ok(0));
        assert_eq!(registry.join_room(&room, 3), Ok(1));
        assert_eq!(registry.join_room(&room, 4), Err(JoinError::RoomFull));
        assert_eq!(registry.get(&room).unwrap().controller_count(), 2);
        assert!(registry.get(&room).unwrap().is_full());
    }

    #[test]
    fn test_smallest_free_index_is_assigned() {
        let mut registry = RoomRegistry::with_seed(3, 1);
        let room = registry.create_room(1);

        registry.join_room(&room, 10).unwrap();
        registry.join_room(&room, 11).unwrap();
        registry.join_room(&room, 12).unwrap();
        registry.disconnect(11, MemberRole::Controller, &room);

        let held: Vec<_> = registry
            .get(&room)
            .unwrap()
            .controllers
            .iter()
            .map(|slot| slot.player_index)
            .collect();
        assert_eq!(held, vec![0, 2]);

        assert_eq!(registry.join_room(&room, 13), Ok(1));
    }

    #[test]
    fn test_freed_index_is_reused() {
        let mut registry = RoomRegistry::with_seed(2, 1);
        let room = registry.create_room(1);

        registry.join_room(&room, 2).unwrap();
        registry.join_room(&room, 3).unwrap();

        match registry.disconnect(2, MemberRole::Controller, &room) {
            Some(Departure::ControllerLeft {
                player_index,
                remaining,
            }) => {
                assert_eq!(player_index, 0);
                assert_eq!(remaining, 1);
            }
            other => panic!("unexpected departure: {:?}", other),
        }

        assert_eq!(registry.join_room(&room, 4), Ok(0));
        assert_eq!(registry.get(&room).unwrap().player_index_of(4), Some(0));
    }

    #[test]
    fn test_screen_disconnect_is_idempotent() {
        let mut registry = RoomRegistry::with_seed(2, 1);
        let room = registry.create_room(1);
        registry.join_room(&room, 2).unwrap();

        assert!(matches!(
            registry.disconnect(1, MemberRole::Screen, &room),
            Some(Departure::RoomClosed(_))
        ));
        assert!(!registry.contains(&room));
        assert!(registry.disconnect(1, MemberRole::Screen, &room).is_none());
        assert!(registry.disconnect(2, MemberRole::Controller, &room).is_none());
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_max_players_is_clamped() {
        assert_eq!(RoomRegistry::with_seed(300, 1).max_players(), MAX_PLAYERS_LIMIT);
        assert_eq!(RoomRegistry::with_seed(0, 1).max_players(), 1);

        let mut registry = RoomRegistry::with_seed(usize::MAX, 1);
        let room = registry.create_room(1);
        for controller in 0..MAX_PLAYERS_LIMIT as ConnectionId {
            registry.join_room(&room, 10 + controller).unwrap();
        }
        assert_eq!(registry.join_room(&room, 99), Err(JoinError::RoomFull));
        assert_eq!(registry.get(&room).unwrap().max_players(), MAX_PLAYERS_LIMIT);
    }

    #[test]
    fn test_controller_disconnect_from_unknown_connection() {
        let mut registry = RoomRegistry::with_seed(2, 1);
        let room = registry.create_room(1);
        registry.join_room(&room, 2).unwrap();

        assert!(registry.disconnect(99, MemberRole::Controller, &room).is_none());
        assert_eq!(registry.get(&room).unwrap().controller_count(), 1);
    }
}
