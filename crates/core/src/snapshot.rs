// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CHECKPOINT_SCHEMA_VERSION: &str = "1.0";

/// Driver step counter plus the backend's own snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub schema_version: String,
    pub backend: String,
    pub current_step: u64,
    #[serde(default)]
    pub state: serde_json::Value,
}

impl Checkpoint {
    pub fn new(backend: &str, current_step: u64, state: serde_json::Value) -> Self {
        Self {
            schema_version: CHECKPOINT_SCHEMA_VERSION.to_string(),
            backend: backend.to_string(),
            current_step,
            state,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read checkpoint at {:?}", path))?;
        let checkpoint: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse checkpoint {:?}", path))?;
        if checkpoint.schema_version != CHECKPOINT_SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported checkpoint schema_version '{}'. Supported versions: '{}'",
                checkpoint.schema_version,
                CHECKPOINT_SCHEMA_VERSION
            );
        }
        Ok(checkpoint)
    }

    /// Write the checkpoint, replacing any previous file at `path` only once
    /// the new content is fully on disk.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create checkpoint dir {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write checkpoint {:?}", tmp))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move checkpoint into {:?}", path))?;
        tracing::debug!(step = self.current_step, "Checkpoint written to {:?}", path);
        Ok(())
    }
}
