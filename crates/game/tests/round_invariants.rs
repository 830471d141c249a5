use std::time::{Duration, Instant};

use carconsole::{
    CarInput, EndReason, Obstacle, Pedal, PedalInput, PhysicsConfig, Round, RoundMode, RoundPhase,
    Steer,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FRAME: Duration = Duration::from_millis(16);

fn random_input(rng: &mut StdRng, round: &mut Round, index: u8) {
    match rng.gen_range(0..4) {
        0 => {
            let steer = [Steer::Left, Steer::Right, Steer::Center][rng.gen_range(0..3)];
            round.post_car_input(&CarInput {
                steer,
                player_index: Some(index),
            });
        }
        1 => {
            let pedal = if rng.gen_bool(0.5) { Pedal::Gas } else { Pedal::Brake };
            round.post_pedal_input(&PedalInput {
                pedal,
                is_down: rng.gen_bool(0.6),
                player_index: Some(index),
            });
        }
        _ => {}
    }
}

#[test]
fn test_random_play_respects_bounds_and_ends_once() {
    let config = PhysicsConfig::default();

    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let roster: &[u8] = if seed % 2 == 0 { &[0] } else { &[0, 1] };
        let mut round = Round::with_seed(config.clone(), roster, seed);
        let start = Instant::now();
        round.start(start);

        let mut outcomes = 0;
        let mut now = start;
        for _ in 0..5000 {
            now += FRAME;
            for &index in roster {
                random_input(&mut rng, &mut round, index);
            }
            if round.step(now).is_some() {
                outcomes += 1;
            }

            for car in round.players() {
                assert!(car.lateral_position >= config.lane_min);
                assert!(car.lateral_position <= config.lane_max);
                assert!((0.0..=config.max_speed).contains(&car.forward_speed));
                assert!(car.lateral_velocity.abs() <= config.max_lateral);
            }
            for obstacle in round.obstacles() {
                assert!(obstacle.y <= config.despawn_y);
            }
        }

        match round.mode() {
            // 5000 frames outlast the countdown
            RoundMode::Versus => assert_eq!(outcomes, 1, "seed {}", seed),
            RoundMode::Solo => {
                let over = round.phase() == RoundPhase::Over;
                assert_eq!(outcomes, usize::from(over), "seed {}", seed);
            }
        }
    }
}

#[test]
fn test_solo_score_counts_dodged_obstacles() {
    let config = PhysicsConfig::default();
    let mut round = Round::with_seed(config.clone(), &[0], 3);
    assert_eq!(round.mode(), RoundMode::Solo);
    let now = Instant::now();
    round.start(now);

    // far from the car at x=50, one step from leaving the band
    for (id, x) in [(0, config.lane_min), (1, config.lane_max - config.obstacle_size)] {
        round.obstacle_field_mut().insert(Obstacle {
            id,
            x,
            y: config.despawn_y - 1.0,
            width: config.obstacle_size,
            height: config.obstacle_size,
        });
    }

    assert!(round.step(now).is_none());
    assert!(round.obstacles().is_empty());
    assert_eq!(round.car(0).unwrap().score, 2);

    // an obstacle straight on the car ends the round without scoring
    let rect = round.car(0).unwrap().rect(&config);
    round.obstacle_field_mut().insert(Obstacle {
        id: 2,
        x: rect.min.x,
        y: rect.min.y,
        width: config.obstacle_size,
        height: config.obstacle_size,
    });
    let outcome = round.step(now + FRAME).unwrap();
    assert_eq!(outcome.reason, EndReason::Crash);
    assert_eq!(outcome.winner, None);
    assert_eq!(round.car(0).unwrap().score, 2);
}
