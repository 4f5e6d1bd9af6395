// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::{slot_for, Filter, Filters, Trajectory, TrajectoryError};

#[derive(Debug)]
pub struct MemoryTrajectory<S> {
    steps: Vec<u64>,
    systems: Vec<S>,
    timestep: f64,
    filters: Filters<S>,
}

impl<S> Default for MemoryTrajectory<S> {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl<S> MemoryTrajectory<S> {
    pub fn new(timestep: f64) -> Self {
        Self {
            steps: Vec::new(),
            systems: Vec::new(),
            timestep,
            filters: Filters::default(),
        }
    }
}

impl<S: Clone> Trajectory<S> for MemoryTrajectory<S> {
    fn write(&mut self, system: &S, step: u64) -> Result<(), TrajectoryError> {
        let (index, fresh) = slot_for(&mut self.steps, step);
        if fresh {
            self.systems.push(system.clone());
        } else {
            self.systems[index] = system.clone();
        }
        Ok(())
    }

    fn read(&mut self, index: usize) -> Result<S, TrajectoryError> {
        let system = self
            .systems
            .get(index)
            .cloned()
            .ok_or(TrajectoryError::IndexOutOfRange {
                index,
                len: self.systems.len(),
            })?;
        Ok(self.filters.apply(system))
    }

    fn steps(&self) -> &[u64] {
        &self.steps
    }

    fn add_filter(&mut self, filter: Filter<S>) {
        self.filters.push(filter);
    }

    fn timestep(&self) -> f64 {
        self.timestep
    }
}
