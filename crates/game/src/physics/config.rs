use std::time::Duration;

/// Engine tuning. Positions are percentages of the view: x runs across the
/// road, y runs down the screen.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    pub lane_min: f32,
    pub lane_max: f32,

    pub steer_accel: f32,
    pub steer_friction: f32,
    pub max_lateral: f32,

    pub accel_rate: f32,
    pub brake_rate: f32,
    pub friction_rate: f32,
    pub max_speed: f32,

    pub car_width: f32,
    pub car_height: f32,
    pub car_base_y: f32,

    // Car-car contact box; smaller than the drawn car.
    pub car_contact_width: f32,
    pub car_contact_height: f32,

    pub camera_lookahead: f32,
    pub camera_easing: f32,
    pub fall_behind_threshold: f32,

    pub obstacle_speed: f32,
    pub obstacle_size: f32,
    pub obstacle_lane_margin: f32,
    pub spawn_y: f32,
    pub despawn_y: f32,

    pub spawn_interval: u32,
    pub spawn_interval_floor: u32,
    pub spawn_interval_decay: u32,

    pub pickup_score: u32,
    pub round_duration: Duration,

    pub scroll_scale: f32,
    pub scroll_cycle: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            lane_min: 10.0,
            lane_max: 90.0,

            steer_accel: 0.1,
            steer_friction: 0.05,
            max_lateral: 1.0,

            accel_rate: 0.02,
            brake_rate: 0.05,
            friction_rate: 0.01,
            max_speed: 1.5,

            car_width: 15.0,
            car_height: 15.0,
            car_base_y: 100.0,

            car_contact_width: 12.0,
            car_contact_height: 12.0,

            camera_lookahead: 20.0,
            camera_easing: 0.1,
            fall_behind_threshold: 10.0,

            obstacle_speed: 1.5,
            obstacle_size: 10.0,
            obstacle_lane_margin: 20.0,
            spawn_y: -10.0,
            despawn_y: 100.0,

            spawn_interval: 50,
            spawn_interval_floor: 30,
            spawn_interval_decay: 2,

            pickup_score: 10,
            round_duration: Duration::from_secs(60),

            scroll_scale: 10.0,
            scroll_cycle: 100.0,
        }
    }
}

impl PhysicsConfig {
    /// Starting x for `slot` of `count` cars, spread evenly across the road.
    pub fn start_position(&self, slot: usize, count: usize) -> f32 {
        let span = self.lane_max - self.lane_min;
        self.lane_min + span * (slot as f32 + 1.0) / (count as f32 + 1.0)
    }
}
