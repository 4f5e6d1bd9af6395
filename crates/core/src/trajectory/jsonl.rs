// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::{slot_for, Filter, Filters, Frame, Trajectory, TrajectoryError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const FORMAT: &str = "cadence-jsonl";
const FORMAT_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize, Debug)]
struct Header {
    format: String,
    version: String,
    timestep: f64,
}

#[derive(Serialize)]
struct FrameRef<'a, S> {
    step: u64,
    system: &'a S,
}

#[derive(Deserialize)]
struct StepOnly {
    step: u64,
}

fn parse_header(line: &str, line_no: usize) -> Result<Header, TrajectoryError> {
    let h: Header = serde_json::from_str(line).map_err(|source| TrajectoryError::Parse {
        line: line_no,
        source,
    })?;
    if h.format != FORMAT || h.version != FORMAT_VERSION {
        return Err(TrajectoryError::Header(format!("{} {}", h.format, h.version)));
    }
    Ok(h)
}

enum Mode<S> {
    Read(Vec<S>),
    Write(BufWriter<File>),
}

/// JSON-lines trajectory file.
///
/// The first line is a header carrying the format tag and the timestep; each
/// following line is one `{"step": .., "system": ..}` frame. A file opened
/// with [`JsonlTrajectory::open`] is read-only, one made with
/// [`JsonlTrajectory::create`] or [`JsonlTrajectory::append`] is write-only. Every frame is flushed as soon
/// as it is written so a crashed run leaves a readable prefix.
pub struct JsonlTrajectory<S> {
    path: PathBuf,
    timestep: f64,
    steps: Vec<u64>,
    mode: Mode<S>,
    filters: Filters<S>,
}

impl<S> std::fmt::Debug for JsonlTrajectory<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlTrajectory")
            .field("path", &self.path)
            .field("timestep", &self.timestep)
            .field("frames", &self.steps.len())
            .field("writable", &matches!(self.mode, Mode::Write(_)))
            .finish()
    }
}

impl<S> JsonlTrajectory<S> {
    pub fn create<P: AsRef<Path>>(path: P, timestep: f64) -> Result<Self, TrajectoryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut out = BufWriter::new(File::create(&path)?);
        let header = Header {
            format: FORMAT.to_string(),
            version: FORMAT_VERSION.to_string(),
            timestep,
        };
        serde_json::to_writer(&mut out, &header).map_err(std::io::Error::from)?;
        out.write_all(b"\n")?;
        out.flush()?;

        Ok(Self {
            path,
            timestep,
            steps: Vec::new(),
            mode: Mode::Write(out),
            filters: Filters::default(),
        })
    }

    /// Continue writing an existing file after a restart from `keep_through`.
    ///
    /// Frames past `keep_through` belong to the abandoned run and are dropped;
    /// the rest are kept and the header's timestep is reused. A missing file
    /// is created with `timestep`.
    pub fn append<P: AsRef<Path>>(
        path: P,
        timestep: f64,
        keep_through: u64,
    ) -> Result<Self, TrajectoryError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Self::create(path, timestep);
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut header: Option<(String, Header)> = None;
        let mut kept = Vec::new();
        let mut steps = Vec::new();
        let mut dropped = 0usize;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = i + 1;

            if header.is_none() {
                let h = parse_header(&line, line_no)?;
                header = Some((line, h));
                continue;
            }

            let frame: StepOnly =
                serde_json::from_str(&line).map_err(|source| TrajectoryError::Parse {
                    line: line_no,
                    source,
                })?;
            if frame.step <= keep_through {
                slot_for(&mut steps, frame.step);
                kept.push(line);
            } else {
                dropped += 1;
            }
        }
        let (header_line, header) =
            header.ok_or_else(|| TrajectoryError::Header("missing header".into()))?;

        let tmp = path.with_extension("jsonl.tmp");
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            for line in std::iter::once(&header_line).chain(&kept) {
                out.write_all(line.as_bytes())?;
                out.write_all(b"\n")?;
            }
            out.flush()?;
        }
        std::fs::rename(&tmp, &path)?;

        if dropped > 0 {
            tracing::debug!(
                "Dropped {} frames past step {} from {:?}",
                dropped,
                keep_through,
                path
            );
        }
        let out = BufWriter::new(OpenOptions::new().append(true).open(&path)?);

        Ok(Self {
            path,
            timestep: header.timestep,
            steps,
            mode: Mode::Write(out),
            filters: Filters::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<S: DeserializeOwned> JsonlTrajectory<S> {
    /// Load every frame of an existing file. When a step appears more than
    /// once, the last frame written for it wins.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TrajectoryError> {
        let path = path.as_ref().to_path_buf();
        let reader = BufReader::new(File::open(&path)?);

        let mut header: Option<Header> = None;
        let mut steps = Vec::new();
        let mut systems = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = i + 1;

            if header.is_none() {
                header = Some(parse_header(&line, line_no)?);
                continue;
            }

            let frame: Frame<S> =
                serde_json::from_str(&line).map_err(|source| TrajectoryError::Parse {
                    line: line_no,
                    source,
                })?;
            let (index, fresh) = slot_for(&mut steps, frame.step);
            if fresh {
                systems.push(frame.system);
            } else {
                systems[index] = frame.system;
            }
        }

        let header = header.ok_or_else(|| TrajectoryError::Header("missing header".into()))?;
        tracing::debug!("Opened trajectory {:?} with {} frames", path, steps.len());

        Ok(Self {
            path,
            timestep: header.timestep,
            steps,
            mode: Mode::Read(systems),
            filters: Filters::default(),
        })
    }
}

impl<S: Serialize + Clone> Trajectory<S> for JsonlTrajectory<S> {
    fn write(&mut self, system: &S, step: u64) -> Result<(), TrajectoryError> {
        let Mode::Write(out) = &mut self.mode else {
            return Err(TrajectoryError::ReadOnly);
        };
        serde_json::to_writer(&mut *out, &FrameRef { step, system })
            .map_err(|source| TrajectoryError::Encode { step, source })?;
        out.write_all(b"\n")?;
        out.flush()?;
        slot_for(&mut self.steps, step);
        Ok(())
    }

    fn read(&mut self, index: usize) -> Result<S, TrajectoryError> {
        let Mode::Read(systems) = &self.mode else {
            return Err(TrajectoryError::WriteOnly);
        };
        let system = systems
            .get(index)
            .cloned()
            .ok_or(TrajectoryError::IndexOutOfRange {
                index,
                len: systems.len(),
            })?;
        Ok(self.filters.apply(system))
    }

    fn steps(&self) -> &[u64] {
        &self.steps
    }

    fn add_filter(&mut self, filter: Filter<S>) {
        self.filters.push(filter);
    }

    fn timestep(&self) -> f64 {
        self.timestep
    }
}
