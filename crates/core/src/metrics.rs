// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::RunObserver;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct RunMetrics {
    run_count: AtomicU64,
    backend_calls: AtomicU64,
    step_count: AtomicU64,
    callbacks_fired: AtomicU64,
    callbacks_by_name: Mutex<HashMap<String, u64>>,
    busy_nanos: AtomicU64,
    start_time: Instant,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            run_count: AtomicU64::new(0),
            backend_calls: AtomicU64::new(0),
            step_count: AtomicU64::new(0),
            callbacks_fired: AtomicU64::new(0),
            callbacks_by_name: Mutex::new(HashMap::new()),
            busy_nanos: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn reset(&self) {
        self.run_count.store(0, Ordering::SeqCst);
        self.backend_calls.store(0, Ordering::SeqCst);
        self.step_count.store(0, Ordering::SeqCst);
        self.callbacks_fired.store(0, Ordering::SeqCst);
        self.busy_nanos.store(0, Ordering::SeqCst);
        if let Ok(mut m) = self.callbacks_by_name.lock() {
            m.clear();
        }
    }

    pub fn get_runs(&self) -> u64 {
        self.run_count.load(Ordering::SeqCst)
    }

    pub fn get_backend_calls(&self) -> u64 {
        self.backend_calls.load(Ordering::SeqCst)
    }

    pub fn get_steps(&self) -> u64 {
        self.step_count.load(Ordering::SeqCst)
    }

    pub fn get_callbacks_fired(&self) -> u64 {
        self.callbacks_fired.load(Ordering::SeqCst)
    }

    pub fn get_callback_count(&self, name: &str) -> u64 {
        self.callbacks_by_name
            .lock()
            .ok()
            .and_then(|m| m.get(name).copied())
            .unwrap_or(0)
    }

    /// Wall time spent inside `run` calls.
    pub fn get_busy_time(&self) -> Duration {
        Duration::from_nanos(self.busy_nanos.load(Ordering::SeqCst))
    }

    pub fn get_steps_per_second(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_steps() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl RunObserver for RunMetrics {
    fn on_run_start(&self, _backend: &str, _from: u64, _to: u64) {
        self.run_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_advance(&self, steps: u64, _current_step: u64) {
        self.backend_calls.fetch_add(1, Ordering::SeqCst);
        self.step_count.fetch_add(steps, Ordering::SeqCst);
    }

    fn on_callback(&self, name: &str, _step: u64) {
        self.callbacks_fired.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut m) = self.callbacks_by_name.lock() {
            *m.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    fn on_run_stop(&self, _step: u64, elapsed: Duration) {
        let nanos = elapsed.as_nanos().min(u128::from(u64::MAX)) as u64;
        self.busy_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}
