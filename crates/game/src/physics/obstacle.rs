use rand::Rng;
use rand::rngs::StdRng;

use super::{PhysicsConfig, Rect};

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Obstacle {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Live obstacles plus the spawn timer and its difficulty ramp.
#[derive(Debug)]
pub struct ObstacleField {
    obstacles: Vec<Obstacle>,
    next_id: u32,
    timer: u32,
    interval: u32,
    rng: StdRng,
}

impl ObstacleField {
    pub fn new(config: &PhysicsConfig, rng: StdRng) -> Self {
        Self {
            obstacles: Vec::new(),
            next_id: 0,
            timer: 0,
            interval: config.spawn_interval,
            rng,
        }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn spawn_interval(&self) -> u32 {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Advances the spawn timer by one step. Returns the spawned obstacle id.
    pub fn tick_spawner(&mut self, config: &PhysicsConfig) -> Option<u32> {
        self.timer += 1;
        if self.timer <= self.interval {
            return None;
        }

        self.timer = 0;
        if self.interval > config.spawn_interval_floor {
            self.interval = self
                .interval
                .saturating_sub(config.spawn_interval_decay)
                .max(config.spawn_interval_floor);
        }
        Some(self.spawn(config))
    }

    pub fn spawn(&mut self, config: &PhysicsConfig) -> u32 {
        let low = config.lane_min;
        let high = (config.lane_max - config.obstacle_lane_margin).max(low);
        let x = if high > low {
            self.rng.gen_range(low..high)
        } else {
            low
        };

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.obstacles.push(Obstacle {
            id,
            x,
            y: config.spawn_y,
            width: config.obstacle_size,
            height: config.obstacle_size,
        });
        id
    }

    pub fn advance(&mut self, config: &PhysicsConfig) {
        for obstacle in &mut self.obstacles {
            obstacle.y += config.obstacle_speed;
        }
    }

    /// Drops obstacles that left the visible band; returns how many.
    pub fn remove_exited(&mut self, config: &PhysicsConfig) -> usize {
        let before = self.obstacles.len();
        self.obstacles.retain(|o| o.y <= config.despawn_y);
        before - self.obstacles.len()
    }

    /// Removes and returns the first obstacle overlapping `rect`.
    pub fn take_hit(&mut self, rect: &Rect) -> Option<Obstacle> {
        let pos = self
            .obstacles
            .iter()
            .position(|o| o.rect().intersects(rect))?;
        Some(self.obstacles.remove(pos))
    }

    pub fn insert(&mut self, obstacle: Obstacle) {
        self.next_id = self.next_id.max(obstacle.id.wrapping_add(1));
        self.obstacles.push(obstacle);
    }
}
