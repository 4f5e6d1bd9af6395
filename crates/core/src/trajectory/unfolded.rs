// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::{Filter, Filters, Trajectory, TrajectoryError};
use crate::System;

/// Read adapter that undoes periodic folding.
///
/// Each frame's positions are rebuilt from the previous frame's unfolded
/// positions plus the minimum-image displacement between the two stored
/// frames, so a particle leaving through one face of the cell keeps moving
/// continuously instead of reappearing on the other side. This is only
/// exact while no particle moves more than half a side between frames.
///
/// Reading frame `k` after frame `j < k` replays the frames in between;
/// reading backwards starts over from frame 0.
#[derive(Debug)]
pub struct Unfolded<T> {
    inner: T,
    last: Option<(usize, Vec<Vec<f64>>)>,
    filters: Filters<System>,
}

impl<T: Trajectory<System>> Unfolded<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            last: None,
            filters: Filters::default(),
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn positions(system: &System) -> Vec<Vec<f64>> {
        system.particles.iter().map(|p| p.position.clone()).collect()
    }

    fn unfold(&mut self, index: usize) -> Result<System, TrajectoryError> {
        let (mut at, mut unfolded, mut previous) = match self.last.take() {
            Some((at, unfolded)) if at <= index => {
                let previous = Self::positions(&self.inner.read(at)?);
                (at, unfolded, previous)
            }
            _ => {
                let first = self.inner.read(0)?;
                let positions = Self::positions(&first);
                (0, positions.clone(), positions)
            }
        };

        let mut system = self.inner.read(at)?;
        while at < index {
            at += 1;
            system = self.inner.read(at)?;
            if system.particles.len() != unfolded.len() {
                return Err(TrajectoryError::Unfold {
                    index: at,
                    reason: format!(
                        "particle count changed from {} to {}",
                        unfolded.len(),
                        system.particles.len()
                    ),
                });
            }
            for ((particle, old), prev) in system
                .particles
                .iter()
                .zip(unfolded.iter_mut())
                .zip(previous.iter_mut())
            {
                if particle.position.len() != old.len() {
                    return Err(TrajectoryError::Unfold {
                        index: at,
                        reason: format!(
                            "position has {} components, expected {}",
                            particle.position.len(),
                            old.len()
                        ),
                    });
                }
                let mut delta: Vec<f64> = particle
                    .position
                    .iter()
                    .zip(prev.iter())
                    .map(|(x, p)| x - p)
                    .collect();
                system.cell.minimum_image(&mut delta);
                for (o, d) in old.iter_mut().zip(&delta) {
                    *o += d;
                }
                prev.clone_from(&particle.position);
            }
        }

        for (particle, position) in system.particles.iter_mut().zip(&unfolded) {
            particle.position.clone_from(position);
        }
        self.last = Some((at, unfolded));
        Ok(system)
    }
}

impl<T: Trajectory<System>> Trajectory<System> for Unfolded<T> {
    fn write(&mut self, _system: &System, _step: u64) -> Result<(), TrajectoryError> {
        Err(TrajectoryError::ReadOnly)
    }

    fn read(&mut self, index: usize) -> Result<System, TrajectoryError> {
        let len = self.inner.len();
        if index >= len {
            return Err(TrajectoryError::IndexOutOfRange { index, len });
        }
        let system = self.unfold(index)?;
        Ok(self.filters.apply(system))
    }

    fn steps(&self) -> &[u64] {
        self.inner.steps()
    }

    fn add_filter(&mut self, filter: Filter<System>) {
        self.filters.push(filter);
    }

    fn timestep(&self) -> f64 {
        self.inner.timestep()
    }
}
