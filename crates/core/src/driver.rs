// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::callback::{Callback, CallbackOptions, Registration};
use crate::snapshot::Checkpoint;
use crate::{Backend, DriverConfig, DriverError, Increment, RunObserver, Verbosity};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub type DriverResult<T, B> = Result<T, DriverError<<B as Backend>::Error>>;

/// The step-counting orchestrator.
///
/// A `Simulation` owns one backend, counts the steps it has advanced and
/// fires periodic callbacks at exact multiples of their intervals. The step
/// counter persists across `run` calls, so a run can be resumed in pieces.
pub struct Simulation<B: Backend> {
    backend: B,
    current_step: u64,
    config: DriverConfig,
    callbacks: Vec<Registration<B>>,
    observers: Vec<Arc<dyn RunObserver>>,
}

impl<B: Backend> Simulation<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, DriverConfig::default())
    }

    pub fn with_config(backend: B, config: DriverConfig) -> Self {
        Self {
            backend,
            current_step: 0,
            config,
            callbacks: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn system(&self) -> &B::System {
        self.backend.system()
    }

    pub fn add_observer(&mut self, observer: Arc<dyn RunObserver>) {
        self.observers.push(observer);
    }

    /// Register `callback` to fire every `interval` steps.
    ///
    /// Evaluation starts from the current step onward; multiples already
    /// passed are not replayed.
    pub fn add<F>(&mut self, callback: F, interval: u64) -> DriverResult<(), B>
    where
        F: FnMut(&Simulation<B>) -> anyhow::Result<()> + 'static,
    {
        self.add_callback(callback, interval, CallbackOptions::default())
    }

    pub fn add_with<F>(
        &mut self,
        callback: F,
        interval: u64,
        options: CallbackOptions,
    ) -> DriverResult<(), B>
    where
        F: FnMut(&Simulation<B>) -> anyhow::Result<()> + 'static,
    {
        self.add_callback(callback, interval, options)
    }

    pub fn add_callback<C>(
        &mut self,
        callback: C,
        interval: u64,
        options: CallbackOptions,
    ) -> DriverResult<(), B>
    where
        C: Callback<B> + 'static,
    {
        if interval == 0 {
            return Err(DriverError::InvalidInterval(interval));
        }
        let name = options
            .name
            .unwrap_or_else(|| format!("callback-{}", self.callbacks.len()));
        debug!(callback = %name, interval, step = self.current_step, "Callback registered");
        self.callbacks.push(Registration::new(
            Box::new(callback),
            interval,
            name,
            options.fire_at_start,
        ));
        Ok(())
    }

    /// Registered callbacks as `(name, interval)`, in invocation order.
    pub fn callbacks(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.callbacks.iter().map(|r| (r.name(), r.interval()))
    }

    /// Advance the backend by `steps` more steps.
    ///
    /// On error the step counter stays at the last sub-increment the backend
    /// completed.
    pub fn run(&mut self, steps: u64) -> DriverResult<(), B> {
        let from = self.current_step;
        let to = from.checked_add(steps).ok_or(DriverError::StepOverflow {
            current: from,
            steps,
        })?;
        let quiet = self.config.verbosity == Verbosity::Quiet;
        let started = Instant::now();

        if !quiet {
            info!(
                backend = self.backend.name(),
                from, to, "Starting run of {} steps", steps
            );
        }
        for observer in &self.observers {
            observer.on_run_start(self.backend.name(), from, to);
        }

        let result = self.advance_to(to, started);
        let elapsed = started.elapsed();

        if !quiet {
            match &result {
                Ok(()) => info!(
                    backend = self.backend.name(),
                    step = self.current_step,
                    "Run finished in {:.3?}",
                    elapsed
                ),
                Err(e) => warn!(
                    backend = self.backend.name(),
                    step = self.current_step,
                    "Run aborted after {:.3?}: {}",
                    elapsed,
                    e
                ),
            }
        }
        for observer in &self.observers {
            observer.on_run_stop(self.current_step, elapsed);
        }

        result
    }

    /// Advance until the step counter equals `step`.
    pub fn run_until(&mut self, step: u64) -> DriverResult<(), B> {
        if step < self.current_step {
            return Err(DriverError::InvalidTarget {
                target: step,
                current: self.current_step,
            });
        }
        self.run(step - self.current_step)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(
            self.backend.name(),
            self.current_step,
            self.backend.snapshot(),
        )
    }

    /// Restore backend state and step counter from `checkpoint`.
    ///
    /// The counter never moves backward: a checkpoint older than the current
    /// step is rejected.
    pub fn restore(&mut self, checkpoint: Checkpoint) -> DriverResult<(), B> {
        if checkpoint.backend != self.backend.name() {
            return Err(DriverError::CheckpointMismatch {
                expected: self.backend.name().to_string(),
                found: checkpoint.backend,
            });
        }
        if checkpoint.current_step < self.current_step {
            return Err(DriverError::InvalidTarget {
                target: checkpoint.current_step,
                current: self.current_step,
            });
        }
        self.backend
            .restore(checkpoint.state)
            .map_err(DriverError::Backend)?;
        self.current_step = checkpoint.current_step;
        info!(
            backend = self.backend.name(),
            step = self.current_step,
            "Restored from checkpoint"
        );
        Ok(())
    }

    fn advance_to(&mut self, target: u64, started: Instant) -> DriverResult<(), B> {
        let from = self.current_step;
        self.dispatch(true)?;

        while self.current_step < target {
            let increment = self.next_increment(target);
            self.backend
                .advance(increment)
                .map_err(DriverError::Backend)?;
            self.current_step += increment;

            if self.config.verbosity == Verbosity::Verbose {
                debug!(
                    steps = increment,
                    step = self.current_step,
                    "Backend advanced"
                );
            }
            for observer in &self.observers {
                observer.on_advance(increment, self.current_step);
            }
            self.report_progress(increment, from, started);

            self.dispatch(false)?;
        }
        Ok(())
    }

    fn next_increment(&self, target: u64) -> u64 {
        let remaining = target - self.current_step;
        let increment = match self.config.increment {
            Increment::Single => 1,
            Increment::Auto if self.callbacks.is_empty() => remaining,
            Increment::Auto => 1,
            Increment::Checkpoint => self
                .callbacks
                .iter()
                .map(|r| r.steps_to_next(self.current_step))
                .min()
                .unwrap_or(remaining),
        };
        increment.min(remaining)
    }

    /// Fire every callback due at the current step.
    ///
    /// With `at_start`, only registrations still waiting for their start
    /// evaluation are considered.
    fn dispatch(&mut self, at_start: bool) -> DriverResult<(), B> {
        let step = self.current_step;
        let mut callbacks = std::mem::take(&mut self.callbacks);

        let mut result = Ok(());
        for registration in callbacks.iter_mut() {
            if at_start && !registration.take_pending_start() {
                continue;
            }
            if !registration.fires_at(step) {
                continue;
            }
            result = self.invoke(registration, step);
            if result.is_err() {
                break;
            }
        }

        self.callbacks = callbacks;
        result
    }

    fn invoke(&self, registration: &mut Registration<B>, step: u64) -> DriverResult<(), B> {
        if self.config.verbosity == Verbosity::Verbose {
            debug!(callback = registration.name(), step, "Firing callback");
        }
        registration
            .call(self)
            .map_err(|source| DriverError::Callback {
                name: registration.name().to_string(),
                step,
                source,
            })?;
        for observer in &self.observers {
            observer.on_callback(registration.name(), step);
        }
        Ok(())
    }

    fn report_progress(&self, increment: u64, from: u64, started: Instant) {
        let Some(every) = self.config.progress_every.filter(|n| *n > 0) else {
            return;
        };
        if self.config.verbosity == Verbosity::Quiet {
            return;
        }
        let before = self.current_step - increment;
        if self.current_step / every == before / every {
            return;
        }
        let elapsed = started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            (self.current_step - from) as f64 / elapsed
        } else {
            0.0
        };
        info!(
            "Progress: step {}, {:.2} steps/s",
            self.current_step, rate
        );
    }
}
