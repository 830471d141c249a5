use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::net::{CarInput, PedalInput, Winner};
use crate::room::PlayerIndex;

use super::{Car, InputMailbox, Obstacle, ObstacleField, PhysicsConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundPhase {
    Idle,
    Running,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundMode {
    /// Obstacles are hazards, the first crash ends the round.
    Solo,
    /// Obstacles are pickups, the round runs on a countdown.
    Versus,
}

impl RoundMode {
    pub fn for_player_count(count: usize) -> Self {
        if count > 1 {
            RoundMode::Versus
        } else {
            RoundMode::Solo
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Crash,
    AllCrashed,
    CarContact,
    TimeUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    pub reason: EndReason,
    pub winner: Option<Winner>,
}

/// Strictly highest score wins; a shared top score is a draw.
pub fn decide_winner(players: &[Car]) -> Winner {
    let Some(top) = players.iter().map(|car| car.score).max() else {
        return Winner::Draw;
    };
    let mut leaders = players.iter().filter(|car| car.score == top);
    match (leaders.next(), leaders.next()) {
        (Some(car), None) => Winner::Player(car.index),
        _ => Winner::Draw,
    }
}

#[derive(Debug)]
pub struct Round {
    config: PhysicsConfig,
    mode: RoundMode,
    phase: RoundPhase,
    roster: Vec<PlayerIndex>,
    players: Vec<Car>,
    inputs: BTreeMap<PlayerIndex, InputMailbox>,
    field: ObstacleField,
    camera: f32,
    scroll_offset: f32,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    outcome: Option<RoundOutcome>,
    rng: StdRng,
}

impl Round {
    pub fn new(config: PhysicsConfig, roster: &[PlayerIndex]) -> Self {
        Self::with_rng(config, roster, StdRng::from_entropy())
    }

    pub fn with_seed(config: PhysicsConfig, roster: &[PlayerIndex], seed: u64) -> Self {
        Self::with_rng(config, roster, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: PhysicsConfig, roster: &[PlayerIndex], mut rng: StdRng) -> Self {
        let mut roster = roster.to_vec();
        roster.sort_unstable();
        roster.dedup();

        let field = ObstacleField::new(&config, StdRng::seed_from_u64(rng.r#gen()));
        let mut round = Self {
            mode: RoundMode::for_player_count(roster.len()),
            phase: RoundPhase::Idle,
            players: Vec::new(),
            inputs: BTreeMap::new(),
            field,
            camera: 0.0,
            scroll_offset: 0.0,
            started_at: None,
            ended_at: None,
            outcome: None,
            roster,
            config,
            rng,
        };
        round.reset_state();
        round
    }

    fn reset_state(&mut self) {
        let count = self.roster.len();
        self.players = self
            .roster
            .iter()
            .enumerate()
            .map(|(slot, &index)| Car::new(index, self.config.start_position(slot, count)))
            .collect();
        for car in &mut self.players {
            car.display_position = self.config.camera_lookahead;
        }
        self.inputs = self
            .roster
            .iter()
            .map(|&index| (index, InputMailbox::new()))
            .collect();
        self.field = ObstacleField::new(&self.config, StdRng::seed_from_u64(self.rng.r#gen()));
        self.camera = -self.config.camera_lookahead;
        self.scroll_offset = 0.0;
        self.started_at = None;
        self.ended_at = None;
        self.outcome = None;
    }

    /// `Idle -> Running`. No effect in any other phase.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.phase != RoundPhase::Idle {
            return false;
        }
        self.started_at = Some(now);
        self.phase = RoundPhase::Running;
        log::debug!("round started with {} players ({:?})", self.players.len(), self.mode);
        true
    }

    /// Fresh players and obstacles, straight into `Running`.
    pub fn restart(&mut self, now: Instant) {
        self.reset_state();
        self.phase = RoundPhase::Idle;
        self.start(now);
    }

    pub fn post_car_input(&mut self, input: &CarInput) {
        if let Some(mailbox) = self.mailbox_for(input.player_index) {
            mailbox.post_car_input(input);
        }
    }

    pub fn post_pedal_input(&mut self, input: &PedalInput) {
        if let Some(mailbox) = self.mailbox_for(input.player_index) {
            mailbox.post_pedal_input(input);
        }
    }

    fn mailbox_for(&mut self, index: Option<PlayerIndex>) -> Option<&mut InputMailbox> {
        let index = index.unwrap_or(0);
        let mailbox = self.inputs.get_mut(&index);
        if mailbox.is_none() {
            log::debug!("player {} has no car this round, input dropped", index);
        }
        mailbox
    }

    pub fn release_input(&mut self, index: PlayerIndex) {
        if let Some(mailbox) = self.inputs.get_mut(&index) {
            mailbox.release();
        }
    }

    /// Advances one rendering step. Returns the outcome on the step that
    /// ends the round and `None` on every other call.
    pub fn step(&mut self, now: Instant) -> Option<RoundOutcome> {
        if self.phase != RoundPhase::Running {
            return None;
        }

        for car in &mut self.players {
            if let Some(mailbox) = self.inputs.get_mut(&car.index) {
                car.apply_input(mailbox.read());
            }
        }

        for car in self.players.iter_mut().filter(|car| !car.crashed) {
            car.step_longitudinal(&self.config);
            if car.step_lateral(&self.config) {
                log::debug!("player {} hit the wall", car.index);
            }
        }

        let previous_camera = self.camera;
        self.update_camera();
        self.update_obstacles();

        let travelled = self.camera - previous_camera;
        self.scroll_offset = (self.scroll_offset + travelled * self.config.scroll_scale)
            .rem_euclid(self.config.scroll_cycle);

        let outcome = self.check_end(now)?;
        self.phase = RoundPhase::Over;
        self.ended_at = Some(now);
        self.outcome = Some(outcome);
        log::debug!("round over: {:?}", outcome);
        Some(outcome)
    }

    fn update_camera(&mut self) {
        for car in self.players.iter_mut().filter(|car| !car.crashed) {
            car.world_distance += car.forward_speed;
        }

        let leader = self
            .players
            .iter()
            .filter(|car| !car.crashed)
            .map(|car| car.world_distance)
            .reduce(f32::max);
        if let Some(lead) = leader {
            let target = lead - self.config.camera_lookahead;
            self.camera += (target - self.camera) * self.config.camera_easing;
        }

        for car in &mut self.players {
            car.display_position = car.world_distance - self.camera;
            if !car.crashed && car.display_position < -self.config.fall_behind_threshold {
                log::debug!("player {} fell behind the camera", car.index);
                car.crash();
            }
        }
    }

    fn update_obstacles(&mut self) {
        let config = &self.config;
        if self.players.iter().any(Car::is_moving) {
            self.field.tick_spawner(config);
        }
        self.field.advance(config);

        for car in self.players.iter_mut().filter(|car| !car.crashed) {
            let rect = car.rect(config);
            while self.field.take_hit(&rect).is_some() {
                match self.mode {
                    RoundMode::Solo => {
                        car.crash();
                        break;
                    }
                    RoundMode::Versus => car.score += config.pickup_score,
                }
            }
        }

        let dodged = self.field.remove_exited(config) as u32;
        if self.mode == RoundMode::Solo && dodged > 0 {
            for car in self.players.iter_mut().filter(|car| !car.crashed) {
                car.score += dodged;
            }
        }
    }

    fn check_end(&mut self, now: Instant) -> Option<RoundOutcome> {
        match self.mode {
            RoundMode::Solo => self
                .players
                .iter()
                .any(|car| car.crashed)
                .then_some(RoundOutcome {
                    reason: EndReason::Crash,
                    winner: None,
                }),
            RoundMode::Versus => {
                let reason = if self.resolve_car_contact() {
                    EndReason::CarContact
                } else if self.players.iter().all(|car| car.crashed) {
                    EndReason::AllCrashed
                } else if self.remaining(now) == Some(Duration::ZERO) {
                    EndReason::TimeUp
                } else {
                    return None;
                };
                Some(RoundOutcome {
                    reason,
                    winner: Some(decide_winner(&self.players)),
                })
            }
        }
    }

    /// Crashes both cars of the first touching pair.
    fn resolve_car_contact(&mut self) -> bool {
        let config = &self.config;
        let rects: Vec<_> = self
            .players
            .iter()
            .map(|car| (!car.crashed).then(|| car.contact_rect(config)))
            .collect();

        for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                if let (Some(a), Some(b)) = (&rects[i], &rects[j]) {
                    if a.intersects(b) {
                        self.players[i].crash();
                        self.players[j].crash();
                        return true;
                    }
                }
            }
        }
        false
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn mode(&self) -> RoundMode {
        self.mode
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn roster(&self) -> &[PlayerIndex] {
        &self.roster
    }

    pub fn players(&self) -> &[Car] {
        &self.players
    }

    pub fn car(&self, index: PlayerIndex) -> Option<&Car> {
        self.players.iter().find(|car| car.index == index)
    }

    pub fn mailbox(&self, index: PlayerIndex) -> Option<&InputMailbox> {
        self.inputs.get(&index)
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        self.field.obstacles()
    }

    pub fn obstacle_field_mut(&mut self) -> &mut ObstacleField {
        &mut self.field
    }

    pub fn camera(&self) -> f32 {
        self.camera
    }

    /// Visual only.
    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn outcome(&self) -> Option<RoundOutcome> {
        self.outcome
    }

    pub fn winner(&self) -> Option<Winner> {
        self.outcome.and_then(|outcome| outcome.winner)
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => now.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }

    /// Countdown left in a versus round.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        if self.mode != RoundMode::Versus {
            return None;
        }
        Some(
            self.config
                .round_duration
                .saturating_sub(self.elapsed(now)),
        )
    }
}
