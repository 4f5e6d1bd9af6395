// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::Backend;
use std::convert::Infallible;

/// Backend that holds a system and never changes it.
///
/// Useful to exercise callbacks and trajectory output without any physics.
#[derive(Debug, Clone, Default)]
pub struct DryRun<S> {
    system: S,
}

impl<S> DryRun<S> {
    pub fn new(system: S) -> Self {
        Self { system }
    }
}

impl<S> Backend for DryRun<S> {
    type System = S;
    type Error = Infallible;

    fn name(&self) -> &str {
        "dry_run"
    }

    fn system(&self) -> &S {
        &self.system
    }

    fn system_mut(&mut self) -> &mut S {
        &mut self.system
    }

    fn advance(&mut self, _steps: u64) -> Result<(), Infallible> {
        Ok(())
    }
}
