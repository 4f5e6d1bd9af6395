// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod dry_run;
pub mod random_walk;

pub use dry_run::DryRun;
pub use random_walk::{RandomWalk, WalkError};
