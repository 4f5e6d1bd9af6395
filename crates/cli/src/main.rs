// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod callbacks;

use anyhow::Context;
use cadence_config::{BackendConfig, RunManifest};
use cadence_core::backends::{DryRun, RandomWalk};
use cadence_core::metrics::RunMetrics;
use cadence_core::{Backend, Checkpoint, Simulation, System, Verbosity};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

const EXIT_PASS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(author, version, about = "Cadence simulation driver", long_about = None)]
struct Cli {
    /// Enable per-step and per-callback tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a simulation described by a run manifest (YAML).
    Run(RunArgs),

    /// Parse and validate a run manifest without running it.
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to the run manifest (YAML)
    #[arg(short, long)]
    config: PathBuf,

    /// Number of steps to run (overrides the manifest's `steps`)
    #[arg(long, conflicts_with = "until")]
    steps: Option<u64>,

    /// Run until the step counter reaches this value
    #[arg(long)]
    until: Option<u64>,

    /// Restore driver and backend state from a checkpoint before running
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Write a checkpoint here after a successful run
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Directory for result.json and relative callback outputs
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Path to the run manifest (YAML)
    #[arg(short, long)]
    config: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct RunResult {
    result_schema_version: String,
    status: String,
    name: String,
    backend: String,
    start_step: u64,
    final_step: u64,
    steps_requested: u64,
    elapsed_ms: u64,
    callbacks_fired: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    manifest_hash: String,
}

/// What a finished (or aborted) run reports back to `main`.
#[derive(Debug)]
struct RunReport {
    exit_code: u8,
    backend: String,
    start_step: u64,
    final_step: u64,
    steps_requested: u64,
    elapsed_ms: u64,
    callbacks_fired: u64,
    message: Option<String>,
}

impl RunReport {
    fn new(backend: &str) -> Self {
        Self {
            exit_code: EXIT_PASS,
            backend: backend.to_string(),
            start_step: 0,
            final_step: 0,
            steps_requested: 0,
            elapsed_ms: 0,
            callbacks_fired: 0,
            message: None,
        }
    }

    fn fail(mut self, exit_code: u8, err: anyhow::Error) -> Self {
        let msg = format!("{:#}", err);
        error!("{}", msg);
        self.exit_code = exit_code;
        self.message = Some(msg);
        self
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    match cli.command {
        Commands::Run(args) => run_manifest(args, cli.trace),
        Commands::Validate(args) => validate_manifest(args),
    }
}

fn load_manifest(path: &Path) -> anyhow::Result<(RunManifest, String)> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read run manifest at {:?}", path))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let hash = format!("{:x}", hasher.finalize());

    let text = std::str::from_utf8(&bytes)
        .with_context(|| format!("Run manifest {:?} is not valid UTF-8", path))?;
    let manifest = RunManifest::from_yaml(text)?;
    Ok((manifest, hash))
}

fn validate_manifest(args: ValidateArgs) -> ExitCode {
    match load_manifest(&args.config) {
        Ok((manifest, _)) => {
            info!(
                "Manifest '{}' is valid: {} backend, {} steps, {} callbacks",
                manifest.name,
                manifest.backend.kind(),
                manifest.steps,
                manifest.callbacks.len()
            );
            ExitCode::from(EXIT_PASS)
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

fn run_manifest(args: RunArgs, trace: bool) -> ExitCode {
    let (manifest, manifest_hash) = match load_manifest(&args.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            let report = RunReport::new("").fail(EXIT_CONFIG_ERROR, e);
            write_result(&args, "", &report, String::new());
            return ExitCode::from(report.exit_code);
        }
    };

    info!("Starting Cadence run '{}'", manifest.name);

    let base_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => args
            .config
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    let report = match &manifest.backend {
        BackendConfig::RandomWalk {
            particles,
            side,
            seed,
            step_length,
            species,
        } => {
            let system = System::lattice(*particles, side.clone(), species);
            let backend = RandomWalk::new(system, *seed).with_step_length(*step_length);
            execute(backend, &manifest, &args, &base_dir, trace)
        }
        BackendConfig::DryRun { particles, side } => {
            let backend = DryRun::new(System::lattice(*particles, side.clone(), "A"));
            execute(backend, &manifest, &args, &base_dir, trace)
        }
    };

    write_result(&args, &manifest.name, &report, manifest_hash);
    ExitCode::from(report.exit_code)
}

fn execute<B>(
    backend: B,
    manifest: &RunManifest,
    args: &RunArgs,
    base_dir: &Path,
    trace: bool,
) -> RunReport
where
    B: Backend<System = System> + 'static,
{
    let mut config = manifest.driver.clone();
    if trace && config.verbosity == Verbosity::Normal {
        config.verbosity = Verbosity::Verbose;
    }

    let mut sim = Simulation::with_config(backend, config);
    let metrics = Arc::new(RunMetrics::new());
    sim.add_observer(metrics.clone());
    let mut report = RunReport::new(sim.backend().name());

    if let Some(path) = &args.resume {
        let restored = Checkpoint::from_file(path)
            .and_then(|cp| sim.restore(cp).map_err(anyhow::Error::from))
            .with_context(|| format!("Failed to resume from {:?}", path));
        if let Err(e) = restored {
            return report.fail(EXIT_CONFIG_ERROR, e);
        }
    }

    report.start_step = sim.current_step();
    report.final_step = sim.current_step();

    let resumed_at = args.resume.as_ref().map(|_| sim.current_step());
    if let Err(e) = callbacks::register_all(&mut sim, &manifest.callbacks, base_dir, resumed_at) {
        return report.fail(EXIT_RUNTIME_ERROR, e);
    }

    let started = Instant::now();
    let result = match args.until {
        Some(step) => {
            report.steps_requested = step.saturating_sub(report.start_step);
            sim.run_until(step)
        }
        None => {
            let steps = args.steps.unwrap_or(manifest.steps);
            report.steps_requested = steps;
            sim.run(steps)
        }
    };
    report.elapsed_ms = started.elapsed().as_millis() as u64;
    report.final_step = sim.current_step();
    report.callbacks_fired = metrics.get_callbacks_fired();

    if let Err(e) = result {
        return report.fail(EXIT_RUNTIME_ERROR, anyhow::Error::from(e));
    }

    if let Some(path) = &args.checkpoint {
        if let Err(e) = sim.checkpoint().to_file(path) {
            return report.fail(EXIT_RUNTIME_ERROR, e);
        }
        info!("Checkpoint written to {:?}", path);
    }

    info!(
        "Run '{}' finished at step {} ({} callbacks fired, {:.0} steps/s)",
        manifest.name,
        report.final_step,
        report.callbacks_fired,
        metrics.get_steps_per_second()
    );
    report
}

fn write_result(args: &RunArgs, name: &str, report: &RunReport, manifest_hash: String) {
    let Some(output_dir) = &args.output_dir else {
        return;
    };

    let status = if report.exit_code == EXIT_PASS {
        "pass"
    } else {
        "error"
    };
    let result = RunResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: status.to_string(),
        name: name.to_string(),
        backend: report.backend.clone(),
        start_step: report.start_step,
        final_step: report.final_step,
        steps_requested: report.steps_requested,
        elapsed_ms: report.elapsed_ms,
        callbacks_fired: report.callbacks_fired,
        message: report.message.clone(),
        manifest_hash,
    };

    if let Err(e) = std::fs::create_dir_all(output_dir) {
        error!("Failed to create output directory {:?}: {}", output_dir, e);
        return;
    }
    let result_path = output_dir.join("result.json");
    match std::fs::File::create(&result_path) {
        Ok(f) => {
            if let Err(e) = serde_json::to_writer_pretty(f, &result) {
                error!("Failed to write result.json: {}", e);
            }
        }
        Err(e) => error!("Failed to create result.json: {}", e),
    }
}
