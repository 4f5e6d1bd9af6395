// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::{Filter, Trajectory, TrajectoryError};
use std::ops::{Bound, RangeBounds};

/// Read-only view over a subset of another trajectory's frames.
///
/// The selection is fixed when the view is built; frames written to the inner
/// trajectory afterwards are not part of it.
#[derive(Debug)]
pub struct Sliced<T> {
    inner: T,
    indices: Vec<usize>,
    steps: Vec<u64>,
}

impl<T> Sliced<T> {
    /// Keep every `stride`-th frame whose index falls in `range`. A stride of
    /// zero is treated as one.
    pub fn new<S, R>(inner: T, range: R, stride: usize) -> Self
    where
        T: Trajectory<S>,
        R: RangeBounds<usize>,
    {
        let len = inner.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .min(len);

        let indices: Vec<usize> = (start..end.max(start)).step_by(stride.max(1)).collect();
        let steps = indices.iter().map(|&i| inner.steps()[i]).collect();
        Self {
            inner,
            indices,
            steps,
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<S, T: Trajectory<S>> Trajectory<S> for Sliced<T> {
    fn write(&mut self, _system: &S, _step: u64) -> Result<(), TrajectoryError> {
        Err(TrajectoryError::ReadOnly)
    }

    fn read(&mut self, index: usize) -> Result<S, TrajectoryError> {
        let inner_index = *self
            .indices
            .get(index)
            .ok_or(TrajectoryError::IndexOutOfRange {
                index,
                len: self.indices.len(),
            })?;
        self.inner.read(inner_index)
    }

    fn steps(&self) -> &[u64] {
        &self.steps
    }

    fn add_filter(&mut self, filter: Filter<S>) {
        self.inner.add_filter(filter);
    }

    fn timestep(&self) -> f64 {
        self.inner.timestep()
    }
}
