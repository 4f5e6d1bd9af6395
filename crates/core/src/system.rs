// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Minimal particle system used by the bundled backends.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Particle {
    pub species: String,
    pub position: Vec<f64>,
    /// Open-ended per-particle fields attached by user code.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl Particle {
    pub fn new(species: impl Into<String>, position: Vec<f64>) -> Self {
        Self {
            species: species.into(),
            position,
            extras: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

/// Orthorhombic periodic cell spanning `[origin, origin + side)` on each axis.
///
/// Sides are expected to be finite and positive. Axes that are not are left
/// alone by [`Cell::fold`] and [`Cell::minimum_image`]. A missing origin
/// component counts as zero.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub side: Vec<f64>,
    #[serde(default)]
    pub origin: Vec<f64>,
}

impl Cell {
    pub fn new(side: Vec<f64>) -> Self {
        let origin = vec![0.0; side.len()];
        Self { side, origin }
    }

    pub fn with_origin(mut self, origin: Vec<f64>) -> Self {
        self.origin = origin;
        self
    }

    pub fn ndim(&self) -> usize {
        self.side.len()
    }

    pub fn volume(&self) -> f64 {
        self.side.iter().product()
    }

    fn origin_at(&self, axis: usize) -> f64 {
        self.origin.get(axis).copied().unwrap_or(0.0)
    }

    /// Wrap `position` back into the cell along every axis.
    pub fn fold(&self, position: &mut [f64]) {
        for (axis, (x, l)) in position.iter_mut().zip(&self.side).enumerate() {
            if !(l.is_finite() && *l > 0.0) {
                continue;
            }
            let o = self.origin_at(axis);
            let mut r = (*x - o).rem_euclid(*l);
            // rem_euclid can round up to exactly `l` for tiny negatives
            if r >= *l {
                r -= *l;
            }
            *x = o + r;
        }
    }

    /// Shortest periodic image of the displacement `delta`, in place.
    pub fn minimum_image(&self, delta: &mut [f64]) {
        for (d, l) in delta.iter_mut().zip(&self.side) {
            if l.is_finite() && *l > 0.0 {
                *d -= (*d / l).round() * l;
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct System {
    pub particles: Vec<Particle>,
    pub cell: Cell,
}

impl System {
    pub fn new(particles: Vec<Particle>, cell: Cell) -> Self {
        Self { particles, cell }
    }

    /// Place `n` particles of one species on a regular grid filling the cell.
    pub fn lattice(n: usize, side: Vec<f64>, species: &str) -> Self {
        let cell = Cell::new(side);
        let ndim = cell.ndim();
        if n == 0 || ndim == 0 {
            return Self::new(Vec::new(), cell);
        }

        let mut per_side = 1usize;
        while per_side.pow(ndim as u32) < n {
            per_side += 1;
        }

        let particles = (0..n)
            .map(|k| {
                let mut index = k;
                let position = cell
                    .side
                    .iter()
                    .map(|l| {
                        let coord = index % per_side;
                        index /= per_side;
                        (coord as f64 + 0.5) * l / per_side as f64
                    })
                    .collect();
                Particle::new(species, position)
            })
            .collect();

        Self::new(particles, cell)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}
