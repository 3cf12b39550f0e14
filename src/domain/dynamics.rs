//! Reference dynamics policies.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{Dynamics, Movement};

/// Never moves.
#[derive(Clone, Copy, Debug, Default)]
pub struct Idle;

impl Dynamics for Idle {
    fn change(&mut self, _delta_t: f64) -> Movement {
        Movement::NONE
    }
}

/// Constant linear speed (units per second) and turn rate (degrees per second).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Constant {
    pub speed: f64,
    pub turn_rate: f64,
}

impl Constant {
    pub fn new(speed: f64, turn_rate: f64) -> Self {
        Self { speed, turn_rate }
    }
}

impl Dynamics for Constant {
    fn change(&mut self, delta_t: f64) -> Movement {
        Movement::new(self.speed * delta_t, self.turn_rate * delta_t)
    }
}

/// Replays a fixed sequence of movements, one per tick, then stands still.
#[derive(Clone, Debug, Default)]
pub struct Scripted {
    script: Vec<Movement>,
    remaining: VecDeque<Movement>,
    ticks: usize,
}

impl Scripted {
    pub fn new(script: Vec<Movement>) -> Self {
        Self {
            remaining: script.iter().copied().collect(),
            script,
            ticks: 0,
        }
    }

    /// Number of completed ticks since the last reset.
    pub fn ticks(&self) -> usize {
        self.ticks
    }
}

impl Dynamics for Scripted {
    fn change(&mut self, _delta_t: f64) -> Movement {
        self.remaining.pop_front().unwrap_or(Movement::NONE)
    }

    fn reset(&mut self) {
        self.remaining = self.script.iter().copied().collect();
        self.ticks = 0;
    }

    fn step(&mut self, _delta_t: f64) {
        self.ticks += 1;
    }
}

/// Uniformly random forward speed and turn rate, reproducible from a seed.
#[derive(Clone, Debug)]
pub struct RandomWalk {
    seed: u64,
    max_speed: f64,
    max_turn_rate: f64,
    rng: ChaCha8Rng,
}

impl RandomWalk {
    pub fn new(seed: u64, max_speed: f64, max_turn_rate: f64) -> Self {
        Self {
            seed,
            max_speed: max_speed.abs(),
            max_turn_rate: max_turn_rate.abs(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Dynamics for RandomWalk {
    fn change(&mut self, delta_t: f64) -> Movement {
        let speed = self.rng.random_range(0.0..=self.max_speed);
        let turn_rate = self
            .rng
            .random_range(-self.max_turn_rate..=self.max_turn_rate);
        Movement::new(speed * delta_t, turn_rate * delta_t)
    }

    fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }
}
