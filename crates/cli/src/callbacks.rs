// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use cadence_config::CallbackConfig;
use cadence_core::trajectory::{JsonlTrajectory, TrajectoryWriter};
use cadence_core::{Backend, CallbackOptions, Simulation, System};
use std::path::{Path, PathBuf};
use tracing::info;

pub fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Register the manifest's callbacks on `sim`, in manifest order.
///
/// Relative output paths are taken against `base_dir`. When the run was
/// restored at `resumed_at`, trajectory files are continued from that step
/// instead of being recreated.
pub fn register_all<B>(
    sim: &mut Simulation<B>,
    callbacks: &[CallbackConfig],
    base_dir: &Path,
    resumed_at: Option<u64>,
) -> Result<()>
where
    B: Backend<System = System> + 'static,
{
    for (i, cb) in callbacks.iter().enumerate() {
        let name = format!("{}-{}", cb.kind(), i);
        match cb {
            CallbackConfig::Trajectory {
                every,
                path,
                fire_at_start,
            } => {
                let path = resolve(base_dir, path);
                let trajectory: JsonlTrajectory<System> = match resumed_at {
                    Some(step) => JsonlTrajectory::append(&path, 1.0, step)
                        .with_context(|| format!("Failed to reopen trajectory {:?}", path))?,
                    None => JsonlTrajectory::create(&path, 1.0)
                        .with_context(|| format!("Failed to create trajectory {:?}", path))?,
                };
                let mut options = CallbackOptions::named(&name);
                options.fire_at_start = *fire_at_start;
                sim.add_callback(TrajectoryWriter::new(trajectory), *every, options)?;
            }
            CallbackConfig::Checkpoint { every, path } => {
                let path = resolve(base_dir, path);
                sim.add_with(
                    move |sim: &Simulation<B>| sim.checkpoint().to_file(&path),
                    *every,
                    CallbackOptions::named(&name),
                )?;
            }
            CallbackConfig::Log { every } => {
                sim.add_with(
                    |sim: &Simulation<B>| {
                        info!(
                            particles = sim.system().len(),
                            "Reached step {}",
                            sim.current_step()
                        );
                        Ok(())
                    },
                    *every,
                    CallbackOptions::named(&name),
                )?;
            }
        }
    }
    Ok(())
}
