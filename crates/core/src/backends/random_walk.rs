// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{Backend, System};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("particle {index} has {found} coordinates but the cell has {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("invalid random walk state: {0}")]
    InvalidState(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct WalkState {
    system: System,
    seed: u64,
    step_length: f64,
    steps_done: u64,
}

/// Lattice random walk in a periodic cell.
///
/// Each step moves every particle by `±step_length` along one randomly
/// chosen axis. The generator for step `k` is seeded from `(seed, k)`, so the
/// resulting trajectory does not depend on how the steps are chunked.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    system: System,
    seed: u64,
    step_length: f64,
    steps_done: u64,
}

impl RandomWalk {
    pub fn new(system: System, seed: u64) -> Self {
        Self {
            system,
            seed,
            step_length: 1.0,
            steps_done: 0,
        }
    }

    pub fn with_step_length(mut self, step_length: f64) -> Self {
        self.step_length = step_length;
        self
    }

    pub fn steps_done(&self) -> u64 {
        self.steps_done
    }

    fn step_rng(&self, step: u64) -> StdRng {
        // splitmix64 finalizer over seed and step
        let mut z = self
            .seed
            .wrapping_add(step.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        StdRng::seed_from_u64(z ^ (z >> 31))
    }

    fn check_dimensions(system: &System) -> Result<(), WalkError> {
        let expected = system.cell.ndim();
        match system
            .particles
            .iter()
            .position(|p| p.position.len() != expected)
        {
            Some(index) => Err(WalkError::DimensionMismatch {
                index,
                expected,
                found: system.particles[index].position.len(),
            }),
            None => Ok(()),
        }
    }
}

impl Backend for RandomWalk {
    type System = System;
    type Error = WalkError;

    fn name(&self) -> &str {
        "random_walk"
    }

    fn system(&self) -> &System {
        &self.system
    }

    fn system_mut(&mut self) -> &mut System {
        &mut self.system
    }

    fn advance(&mut self, steps: u64) -> Result<(), WalkError> {
        Self::check_dimensions(&self.system)?;
        let ndim = self.system.cell.ndim();
        if ndim == 0 || self.system.is_empty() {
            self.steps_done += steps;
            return Ok(());
        }

        for _ in 0..steps {
            let mut rng = self.step_rng(self.steps_done);
            let System { particles, cell } = &mut self.system;
            for p in particles.iter_mut() {
                let axis = rng.random_range(0..ndim);
                if rng.random_bool(0.5) {
                    p.position[axis] += self.step_length;
                } else {
                    p.position[axis] -= self.step_length;
                }
                cell.fold(&mut p.position);
            }
            self.steps_done += 1;
        }
        Ok(())
    }

    fn snapshot(&self) -> serde_json::Value {
        let state = WalkState {
            system: self.system.clone(),
            seed: self.seed,
            step_length: self.step_length,
            steps_done: self.steps_done,
        };
        match serde_json::to_value(state) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to snapshot random walk: {}", e);
                serde_json::Value::Null
            }
        }
    }

    fn restore(&mut self, state: serde_json::Value) -> Result<(), WalkError> {
        let state: WalkState = serde_json::from_value(state)?;
        Self::check_dimensions(&state.system)?;
        self.system = state.system;
        self.seed = state.seed;
        self.step_length = state.step_length;
        self.steps_done = state.steps_done;
        Ok(())
    }
}
