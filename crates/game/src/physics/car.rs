use crate::net::Steer;
use crate::room::PlayerIndex;

use super::input::PlayerInput;
use super::{PhysicsConfig, Rect};

#[derive(Debug, Clone, PartialEq)]
pub struct Car {
    pub index: PlayerIndex,
    pub lateral_position: f32,
    pub lateral_velocity: f32,
    pub forward_speed: f32,
    pub world_distance: f32,
    pub display_position: f32,
    pub steer: Steer,
    pub gas_held: bool,
    pub brake_held: bool,
    pub score: u32,
    pub crashed: bool,
}

impl Car {
    pub fn new(index: PlayerIndex, lateral_position: f32) -> Self {
        Self {
            index,
            lateral_position,
            lateral_velocity: 0.0,
            forward_speed: 0.0,
            world_distance: 0.0,
            display_position: 0.0,
            steer: Steer::Center,
            gas_held: false,
            brake_held: false,
            score: 0,
            crashed: false,
        }
    }

    pub fn apply_input(&mut self, input: PlayerInput) {
        self.steer = input.steer;
        self.gas_held = input.gas();
        self.brake_held = input.brake();
    }

    pub fn is_moving(&self) -> bool {
        !self.crashed && self.forward_speed > 0.0
    }

    pub fn crash(&mut self) {
        self.crashed = true;
        self.forward_speed = 0.0;
        self.lateral_velocity = 0.0;
    }

    pub fn step_longitudinal(&mut self, config: &PhysicsConfig) {
        if self.gas_held {
            self.forward_speed += config.accel_rate;
        } else if self.brake_held {
            self.forward_speed -= config.brake_rate;
        } else {
            self.forward_speed -= config.friction_rate;
        }
        self.forward_speed = self.forward_speed.clamp(0.0, config.max_speed);
    }

    /// Returns true when the car hit a lane wall this step.
    pub fn step_lateral(&mut self, config: &PhysicsConfig) -> bool {
        match self.steer {
            Steer::Left => self.lateral_velocity -= config.steer_accel,
            Steer::Right => self.lateral_velocity += config.steer_accel,
            Steer::Center => {
                if self.lateral_velocity > 0.0 {
                    self.lateral_velocity = (self.lateral_velocity - config.steer_friction).max(0.0);
                } else if self.lateral_velocity < 0.0 {
                    self.lateral_velocity = (self.lateral_velocity + config.steer_friction).min(0.0);
                }
            }
        }
        self.lateral_velocity = self
            .lateral_velocity
            .clamp(-config.max_lateral, config.max_lateral);

        self.lateral_position += self.lateral_velocity;

        let clamped = self
            .lateral_position
            .clamp(config.lane_min, config.lane_max);
        if clamped != self.lateral_position {
            self.lateral_position = clamped;
            self.crash();
            return true;
        }
        false
    }

    /// Top edge of the car on screen.
    pub fn screen_y(&self, config: &PhysicsConfig) -> f32 {
        config.car_base_y - config.car_height - self.display_position
            + config.camera_lookahead
    }

    pub fn rect(&self, config: &PhysicsConfig) -> Rect {
        Rect::new(
            self.lateral_position - config.car_width / 2.0,
            self.screen_y(config),
            config.car_width,
            config.car_height,
        )
    }

    pub fn contact_rect(&self, config: &PhysicsConfig) -> Rect {
        let center = self.rect(config).center();
        Rect::centered(center, config.car_contact_width, config.car_contact_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Pedals;

    fn config() -> PhysicsConfig {
        PhysicsConfig::default()
    }

    #[test]
    fn test_friction_never_goes_negative() {
        let config = config();
        let mut car = Car::new(0, 50.0);
        for _ in 0..100 {
            car.step_longitudinal(&config);
            assert_eq!(car.forward_speed, 0.0);
        }
    }

    #[test]
    fn test_gas_and_brake_clamp() {
        let config = config();
        let mut car = Car::new(0, 50.0);
        car.apply_input(PlayerInput {
            steer: Steer::Center,
            pedals: Pedals::GAS,
        });
        for _ in 0..1000 {
            car.step_longitudinal(&config);
        }
        assert_eq!(car.forward_speed, config.max_speed);

        car.apply_input(PlayerInput {
            steer: Steer::Center,
            pedals: Pedals::BRAKE,
        });
        for _ in 0..1000 {
            car.step_longitudinal(&config);
        }
        assert_eq!(car.forward_speed, 0.0);
    }

    #[test]
    fn test_center_friction_does_not_overshoot() {
        let config = config();
        let mut car = Car::new(0, 50.0);
        car.lateral_velocity = 0.07;
        car.step_lateral(&config);
        assert!((car.lateral_velocity - 0.02).abs() < 1e-6);
        car.step_lateral(&config);
        assert_eq!(car.lateral_velocity, 0.0);
        car.step_lateral(&config);
        assert_eq!(car.lateral_velocity, 0.0);
    }

    #[test]
    fn test_lateral_velocity_is_bounded() {
        let config = config();
        let mut car = Car::new(0, 50.0);
        car.steer = Steer::Right;
        for _ in 0..15 {
            car.step_lateral(&config);
            assert!(car.lateral_velocity <= config.max_lateral);
        }
        assert_eq!(car.lateral_velocity, config.max_lateral);
    }

    #[test]
    fn test_wall_clamps_exactly_and_crashes() {
        let config = config();
        let mut car = Car::new(0, config.lane_min + 0.05);
        car.steer = Steer::Left;

        assert!(car.step_lateral(&config));
        assert_eq!(car.lateral_position, config.lane_min);
        assert!(car.crashed);

        let mut car = Car::new(1, config.lane_max - 0.05);
        car.steer = Steer::Right;
        assert!(car.step_lateral(&config));
        assert_eq!(car.lateral_position, config.lane_max);
        assert!(car.crashed);
    }

    #[test]
    fn test_rects_track_display_position() {
        let config = config();
        let mut car = Car::new(0, 50.0);
        car.display_position = config.camera_lookahead;
        let rect = car.rect(&config);
        assert_eq!(rect.min.y, config.car_base_y - config.car_height);
        assert_eq!(rect.min.x, 50.0 - config.car_width / 2.0);

        let contact = car.contact_rect(&config);
        assert_eq!(contact.center(), rect.center());
        assert!(contact.size.x < rect.size.x);
    }
}
