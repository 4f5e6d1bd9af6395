// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: &str = "1.0";

/// Default schema version for YAML manifests
fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// How far the driver advances the backend in a single backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Increment {
    /// Always one step per backend call.
    Single,
    /// One step per call while any callback is registered, one shot otherwise.
    #[default]
    Auto,
    /// Jump straight to the next step where some callback fires.
    Checkpoint,
}

/// Amount of tracing output the driver produces for each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    #[serde(default)]
    pub increment: Increment,
    #[serde(default)]
    pub verbosity: Verbosity,
    /// Emit a progress line every N steps.
    #[serde(default)]
    pub progress_every: Option<u64>,
}

fn default_seed() -> u64 {
    1
}

fn default_step_length() -> f64 {
    1.0
}

fn default_species() -> String {
    "A".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    RandomWalk {
        particles: usize,
        side: Vec<f64>,
        #[serde(default = "default_seed")]
        seed: u64,
        #[serde(default = "default_step_length")]
        step_length: f64,
        #[serde(default = "default_species")]
        species: String,
    },
    DryRun {
        #[serde(default)]
        particles: usize,
        side: Vec<f64>,
    },
}

impl BackendConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::RandomWalk { .. } => "random_walk",
            BackendConfig::DryRun { .. } => "dry_run",
        }
    }

    fn side(&self) -> &[f64] {
        match self {
            BackendConfig::RandomWalk { side, .. } | BackendConfig::DryRun { side, .. } => side,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallbackConfig {
    /// Append the system to a JSON-lines trajectory.
    Trajectory {
        every: u64,
        path: PathBuf,
        #[serde(default)]
        fire_at_start: bool,
    },
    /// Overwrite a checkpoint file with the current driver state.
    Checkpoint { every: u64, path: PathBuf },
    /// Log the current step.
    Log { every: u64 },
}

impl CallbackConfig {
    pub fn every(&self) -> u64 {
        match self {
            CallbackConfig::Trajectory { every, .. }
            | CallbackConfig::Checkpoint { every, .. }
            | CallbackConfig::Log { every } => *every,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CallbackConfig::Trajectory { .. } => "trajectory",
            CallbackConfig::Checkpoint { .. } => "checkpoint",
            CallbackConfig::Log { .. } => "log",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    pub backend: BackendConfig,
    pub steps: u64,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub callbacks: Vec<CallbackConfig>,
}

impl RunManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read run manifest at {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Run Manifest YAML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '{}'",
                self.schema_version,
                SCHEMA_VERSION
            );
        }

        if self.name.trim().is_empty() {
            anyhow::bail!("Manifest 'name' cannot be empty");
        }

        let side = self.backend.side();
        if side.is_empty() || side.len() > 3 {
            anyhow::bail!(
                "Backend 'side' must have 1 to 3 components, got {}",
                side.len()
            );
        }
        if let Some(bad) = side.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            anyhow::bail!("Backend 'side' components must be positive, got {}", bad);
        }

        if let BackendConfig::RandomWalk {
            particles,
            step_length,
            ..
        } = &self.backend
        {
            if *particles == 0 {
                anyhow::bail!("Backend 'particles' must be greater than zero");
            }
            if !(step_length.is_finite() && *step_length > 0.0) {
                anyhow::bail!("Backend 'step_length' must be positive");
            }
        }

        if let Some(0) = self.driver.progress_every {
            anyhow::bail!("Driver 'progress_every' must be greater than zero");
        }

        for (i, cb) in self.callbacks.iter().enumerate() {
            if cb.every() == 0 {
                anyhow::bail!(
                    "Callback #{} ({}) has 'every: 0'; intervals must be at least 1",
                    i,
                    cb.kind()
                );
            }
        }

        if self.steps == 0 {
            tracing::warn!("Manifest '{}' requests zero steps", self.name);
        }

        Ok(())
    }
}
