mod car;
mod config;
mod input;
mod obstacle;
mod round;

use glam::Vec2;

pub use car::Car;
pub use config::PhysicsConfig;
pub use input::{InputMailbox, Pedals, PlayerInput};
pub use obstacle::{Obstacle, ObstacleField};
pub use round::{EndReason, Round, RoundMode, RoundOutcome, RoundPhase, decide_winner};

/// Axis-aligned box in view percentages, `min` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    pub fn centered(center: Vec2, width: f32, height: f32) -> Self {
        let size = Vec2::new(width, height);
        Self {
            min: center - size / 2.0,
            size,
        }
    }

    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    pub fn center(&self) -> Vec2 {
        self.min + self.size / 2.0
    }

    /// Touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        let a_max = self.max();
        let b_max = other.max();
        self.min.x < b_max.x && a_max.x > other.min.x && self.min.y < b_max.y && a_max.y > other.min.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert!(a.intersects(&Rect::new(2.0, 2.0, 1.0, 1.0)));
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 5.0, 5.0)));
        assert!(!a.intersects(&Rect::new(0.0, 11.0, 5.0, 5.0)));
    }

    #[test]
    fn test_rect_centered() {
        let rect = Rect::centered(Vec2::new(50.0, 50.0), 10.0, 4.0);
        assert_eq!(rect.min, Vec2::new(45.0, 48.0));
        assert_eq!(rect.center(), Vec2::new(50.0, 50.0));
    }
}
