// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::Trajectory;
use crate::{Backend, Callback, Simulation};

/// Callback that appends the driver's system to a trajectory each time it
/// fires.
#[derive(Debug)]
pub struct TrajectoryWriter<T> {
    trajectory: T,
}

impl<T> TrajectoryWriter<T> {
    pub fn new(trajectory: T) -> Self {
        Self { trajectory }
    }

    pub fn get_ref(&self) -> &T {
        &self.trajectory
    }

    pub fn into_inner(self) -> T {
        self.trajectory
    }
}

impl<B, T> Callback<B> for TrajectoryWriter<T>
where
    B: Backend,
    T: Trajectory<B::System>,
{
    fn call(&mut self, sim: &Simulation<B>) -> anyhow::Result<()> {
        self.trajectory.write(sim.system(), sim.current_step())?;
        Ok(())
    }
}
