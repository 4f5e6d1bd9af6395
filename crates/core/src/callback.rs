// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{Backend, Simulation};

/// A periodic hook invoked by the driver between backend advances.
///
/// Arguments bound at registration time live in the closure's captures or in
/// the implementing type's fields. While a callback runs, the driver it
/// receives has its callback list detached, so `callbacks()` reads empty.
pub trait Callback<B: Backend> {
    fn call(&mut self, sim: &Simulation<B>) -> anyhow::Result<()>;
}

impl<B, F> Callback<B> for F
where
    B: Backend,
    F: FnMut(&Simulation<B>) -> anyhow::Result<()>,
{
    fn call(&mut self, sim: &Simulation<B>) -> anyhow::Result<()> {
        self(sim)
    }
}

/// Named options attached to a callback registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackOptions {
    /// Label used in traces and errors. Defaults to `callback-<index>`.
    pub name: Option<String>,
    /// Also evaluate the callback at the first step of the next run, not only
    /// at steps reached by advancing.
    pub fire_at_start: bool,
}

impl CallbackOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn fire_at_start(mut self) -> Self {
        self.fire_at_start = true;
        self
    }
}

pub(crate) struct Registration<B: Backend> {
    callback: Box<dyn Callback<B>>,
    interval: u64,
    name: String,
    pending_start: bool,
}

impl<B: Backend> Registration<B> {
    /// `interval` must already be validated as non-zero.
    pub(crate) fn new(
        callback: Box<dyn Callback<B>>,
        interval: u64,
        name: String,
        fire_at_start: bool,
    ) -> Self {
        Self {
            callback,
            interval,
            name,
            pending_start: fire_at_start,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn interval(&self) -> u64 {
        self.interval
    }

    pub(crate) fn fires_at(&self, step: u64) -> bool {
        step % self.interval == 0
    }

    /// Distance from `step` to the next multiple of the interval, always >= 1.
    pub(crate) fn steps_to_next(&self, step: u64) -> u64 {
        self.interval - step % self.interval
    }

    pub(crate) fn take_pending_start(&mut self) -> bool {
        std::mem::take(&mut self.pending_start)
    }

    pub(crate) fn call(&mut self, sim: &Simulation<B>) -> anyhow::Result<()> {
        self.callback.call(sim)
    }
}
