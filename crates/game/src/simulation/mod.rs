use std::collections::BTreeSet;
use std::time::Instant;

use crate::net::{ClientMessage, GameOver, ServerMessage};
use crate::physics::{PhysicsConfig, Round, RoundPhase};
use crate::room::{DEFAULT_MAX_PLAYERS, PlayerIndex, RoomCode, clamp_max_players};

/// Screen-side driver: follows the lobby through relayed server messages and
/// owns the round once it starts.
#[derive(Debug)]
pub struct ScreenSession {
    config: PhysicsConfig,
    capacity: usize,
    seed: Option<u64>,
    rounds_started: u64,
    room_code: Option<RoomCode>,
    roster: BTreeSet<PlayerIndex>,
    round: Option<Round>,
    last_error: Option<String>,
    closed: bool,
}

impl Default for ScreenSession {
    fn default() -> Self {
        Self::new(PhysicsConfig::default(), DEFAULT_MAX_PLAYERS)
    }
}

impl ScreenSession {
    pub fn new(config: PhysicsConfig, capacity: usize) -> Self {
        Self {
            config,
            capacity: clamp_max_players(capacity),
            seed: None,
            rounds_started: 0,
            room_code: None,
            roster: BTreeSet::new(),
            round: None,
            last_error: None,
            closed: false,
        }
    }

    /// Every round gets a deterministic obstacle stream derived from `seed`.
    pub fn with_seed(config: PhysicsConfig, capacity: usize, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::new(config, capacity)
        }
    }

    pub fn apply(&mut self, message: ServerMessage, now: Instant) {
        match message {
            ServerMessage::RoomCreated(code) => {
                log::info!("hosting room {}", code);
                self.room_code = Some(code);
            }
            ServerMessage::PlayerJoined(info) | ServerMessage::LobbyUpdate(info) => {
                if let Some(index) = info.player_index {
                    if self.roster.insert(index) {
                        log::info!("player {} joined", u16::from(index) + 1);
                    }
                }
                if self.room_code.is_none() {
                    self.room_code = info.room_code;
                }
                if self.roster.len() >= self.capacity && self.round.is_none() {
                    self.start(now);
                }
            }
            ServerMessage::PlayerDisconnected(data) => {
                if self.roster.remove(&data.player_index) {
                    log::info!("player {} left", u16::from(data.player_index) + 1);
                }
                if let Some(round) = &mut self.round {
                    round.release_input(data.player_index);
                }
            }
            ServerMessage::CarInput(input) => match &mut self.round {
                Some(round) => round.post_car_input(&input),
                None => log::trace!("dropping car input before the round"),
            },
            ServerMessage::PedalInput(input) => match &mut self.round {
                Some(round) => round.post_pedal_input(&input),
                None => log::trace!("dropping pedal input before the round"),
            },
            ServerMessage::RestartGame => {
                self.restart(now);
            }
            ServerMessage::RoomClosed => {
                log::info!("room closed");
                self.closed = true;
                self.round = None;
            }
            ServerMessage::Error(error) => {
                log::warn!("server error: {}", error.reason);
                self.last_error = Some(error.reason);
            }
            ServerMessage::JoinedRoom(_) | ServerMessage::GameOver(_) => {}
        }
    }

    /// Starts a round from the current roster. False without players or
    /// while a round is already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self
            .round
            .as_ref()
            .is_some_and(|round| round.phase() == RoundPhase::Running)
        {
            return false;
        }
        self.begin_round(now)
    }

    /// Fresh round from the current roster, regardless of the current phase.
    pub fn restart(&mut self, now: Instant) -> bool {
        self.begin_round(now)
    }

    fn begin_round(&mut self, now: Instant) -> bool {
        if self.closed || self.roster.is_empty() {
            return false;
        }

        let roster: Vec<_> = self.roster.iter().copied().collect();
        let mut round = match self.seed {
            Some(seed) => Round::with_seed(
                self.config.clone(),
                &roster,
                seed.wrapping_add(self.rounds_started),
            ),
            None => Round::new(self.config.clone(), &roster),
        };
        round.start(now);
        self.rounds_started += 1;
        log::info!(
            "round {} started: {} players, {:?}",
            self.rounds_started,
            roster.len(),
            round.mode()
        );
        self.round = Some(round);
        true
    }

    /// Steps the round. Yields the `game-over` to send on the step that ends it.
    pub fn frame(&mut self, now: Instant) -> Option<ClientMessage> {
        let outcome = self.round.as_mut()?.step(now)?;
        match outcome.winner {
            Some(winner) => log::info!("game over ({:?}): {}", outcome.reason, winner),
            None => log::info!("game over ({:?})", outcome.reason),
        }
        Some(ClientMessage::GameOver(GameOver {
            winner: outcome.winner,
        }))
    }

    pub fn room_code(&self) -> Option<&RoomCode> {
        self.room_code.as_ref()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn roster(&self) -> impl Iterator<Item = PlayerIndex> + '_ {
        self.roster.iter().copied()
    }

    pub fn player_count(&self) -> usize {
        self.roster.len()
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn phase(&self) -> RoundPhase {
        self.round
            .as_ref()
            .map_or(RoundPhase::Idle, |round| round.phase())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
