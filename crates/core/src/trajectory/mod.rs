// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Ordered collections of `(step, system)` frames.
//!
//! A trajectory records a system at chosen steps of a run. Writing a step
//! that is already present replaces that frame instead of appending a second
//! one. Reading applies the registered filters, in registration order, to
//! the stored system before handing it out.

pub mod jsonl;
pub mod memory;
pub mod sliced;
pub mod unfolded;
pub mod writer;

pub use jsonl::JsonlTrajectory;
pub use memory::MemoryTrajectory;
pub use sliced::Sliced;
pub use unfolded::Unfolded;
pub use writer::TrajectoryWriter;

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("trajectory I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed trajectory line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode frame at step {step}: {source}")]
    Encode {
        step: u64,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported trajectory header: {0}")]
    Header(String),
    #[error("trajectory is not open for writing")]
    ReadOnly,
    #[error("trajectory is open for writing only")]
    WriteOnly,
    #[error("index {index} is out of range ({len} frames)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("cannot unfold frame {index}: {reason}")]
    Unfold { index: usize, reason: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Frame<S> {
    pub step: u64,
    pub system: S,
}

pub type Filter<S> = Box<dyn FnMut(S) -> S>;

pub trait Trajectory<S> {
    fn write(&mut self, system: &S, step: u64) -> Result<(), TrajectoryError>;
    fn read(&mut self, index: usize) -> Result<S, TrajectoryError>;

    /// Steps of the stored frames, in first-written order.
    fn steps(&self) -> &[u64];

    /// Filter applied to every system returned by `read`.
    fn add_filter(&mut self, filter: Filter<S>);

    /// Simulated time per step.
    fn timestep(&self) -> f64 {
        1.0
    }

    fn len(&self) -> usize {
        self.steps().len()
    }

    fn is_empty(&self) -> bool {
        self.steps().is_empty()
    }

    fn times(&self) -> Vec<f64> {
        let dt = self.timestep();
        self.steps().iter().map(|s| *s as f64 * dt).collect()
    }

    fn total_time(&self) -> Option<f64> {
        self.steps().last().map(|s| *s as f64 * self.timestep())
    }

    /// Iterate over every stored frame in order, reading each one.
    fn frames(&mut self) -> Frames<'_, S, Self>
    where
        Self: Sized,
    {
        Frames {
            trajectory: self,
            next: 0,
            _system: PhantomData,
        }
    }
}

/// Iterator returned by [`Trajectory::frames`].
pub struct Frames<'a, S, T> {
    trajectory: &'a mut T,
    next: usize,
    _system: PhantomData<fn() -> S>,
}

impl<S, T: Trajectory<S>> Iterator for Frames<'_, S, T> {
    type Item = Result<Frame<S>, TrajectoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next;
        let step = *self.trajectory.steps().get(index)?;
        self.next += 1;
        Some(
            self.trajectory
                .read(index)
                .map(|system| Frame { step, system }),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.trajectory.len().saturating_sub(self.next);
        (left, Some(left))
    }
}

/// Filter pipeline shared by the trajectory implementations.
pub(crate) struct Filters<S>(Vec<Filter<S>>);

impl<S> Default for Filters<S> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<S> std::fmt::Debug for Filters<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Filters({})", self.0.len())
    }
}

impl<S> Filters<S> {
    pub(crate) fn push(&mut self, filter: Filter<S>) {
        self.0.push(filter);
    }

    pub(crate) fn apply(&mut self, system: S) -> S {
        self.0.iter_mut().fold(system, |s, f| f(s))
    }
}

/// Index of `step` in `steps`, appending it when absent.
pub(crate) fn slot_for(steps: &mut Vec<u64>, step: u64) -> (usize, bool) {
    match steps.iter().position(|s| *s == step) {
        Some(index) => (index, false),
        None => {
            steps.push(step);
            (steps.len() - 1, true)
        }
    }
}
