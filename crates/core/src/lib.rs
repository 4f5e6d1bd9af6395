// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod backends;
pub mod callback;
pub mod driver;
pub mod metrics;
pub mod snapshot;
pub mod system;
pub mod trajectory;

use std::time::Duration;

mod tests;

pub use cadence_config::{DriverConfig, Increment, Verbosity};
pub use callback::{Callback, CallbackOptions};
pub use driver::Simulation;
pub use snapshot::Checkpoint;
pub use system::{Cell, Particle, System};

#[derive(Debug, thiserror::Error)]
pub enum DriverError<E> {
    #[error("cannot run backward: target step {target} is before current step {current}")]
    InvalidTarget { target: u64, current: u64 },
    #[error("callback interval must be at least 1, got {0}")]
    InvalidInterval(u64),
    #[error("step counter overflow: {current} + {steps}")]
    StepOverflow { current: u64, steps: u64 },
    #[error("checkpoint was taken from backend '{found}', expected '{expected}'")]
    CheckpointMismatch { expected: String, found: String },
    #[error("callback '{name}' failed at step {step}")]
    Callback {
        name: String,
        step: u64,
        #[source]
        source: anyhow::Error,
    },
    /// Error raised by the backend itself, passed through untouched.
    #[error(transparent)]
    Backend(E),
}

/// Trait representing a simulation backend.
///
/// A backend owns the simulated system and knows how to advance it by a
/// given number of discrete steps. The driver never looks inside the system;
/// it only calls `advance` and hands the system to callbacks.
pub trait Backend {
    type System;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Identity used in traces and checkpoints.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn system(&self) -> &Self::System;
    fn system_mut(&mut self) -> &mut Self::System;

    /// Perform exactly `steps` state transitions.
    fn advance(&mut self, steps: u64) -> Result<(), Self::Error>;

    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
    fn restore(&mut self, _state: serde_json::Value) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Trait for observing driver events in a modular way.
pub trait RunObserver: std::fmt::Debug + Send + Sync {
    fn on_run_start(&self, _backend: &str, _from: u64, _to: u64) {}
    fn on_advance(&self, _steps: u64, _current_step: u64) {}
    fn on_callback(&self, _name: &str, _step: u64) {}
    /// Called at the end of every run, successful or not.
    fn on_run_stop(&self, _step: u64, _elapsed: Duration) {}
}
