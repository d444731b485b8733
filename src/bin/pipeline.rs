//! pipeline - process one wildlife-camera video and print the report
//!
//! Wire contract (consumed by the upload service):
//! - invocation: `pipeline <videoPath>`
//! - stderr: free-form diagnostics
//! - stdout: exactly one line beginning with `{`, the JSON report
//! - exit code: 0 on success, nonzero on failure
//!
//! On failure the stdout line is `{"success": false, "error": "..."}`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::Parser;

use trailwatch::{failure_line, pipeline, DangerPolicy, PipelineConfig, PipelineError, Report};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the video to process (or a stub:// synthetic source).
    video: String,
    /// Optional TOML config file (also: TRAILWATCH_CONFIG).
    #[arg(long, env = "TRAILWATCH_CONFIG")]
    config: Option<PathBuf>,
    /// Override the snapshot output directory.
    #[arg(long)]
    snapshots_dir: Option<String>,
    /// Override the detector backend (stub, scripted, ...).
    #[arg(long)]
    backend: Option<String>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match process(&args) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("run failed: {err:#}");
            println!("{}", failure_line(&format!("{err:#}")));
            ExitCode::FAILURE
        }
    }
}

fn process(args: &Args) -> Result<String> {
    let config = load_config(args)?;
    let report = run_detection(&config, &args.video)?;

    if let Some(history_path) = &config.history.path {
        // History is a local convenience log; failure to write it must not
        // fail a run that already produced a valid report.
        match trailwatch::history::append(history_path, &report, config.history.limit) {
            Ok(0) => {}
            Ok(written) => log::info!(
                "history: saved {} detections to {}",
                written,
                history_path.display()
            ),
            Err(e) => log::warn!("history: {e:#}"),
        }
    }

    Ok(report.to_stdout_line()?)
}

fn run_detection(config: &PipelineConfig, video: &str) -> Result<Report, PipelineError> {
    let registry = trailwatch::builtin_backends();
    let backend = registry.get(&config.detection.backend).ok_or_else(|| {
        PipelineError::detection(format!(
            "unknown detector backend '{}' (available: {})",
            config.detection.backend,
            registry.list().join(", ")
        ))
    })?;
    let mut backend = backend
        .lock()
        .map_err(|_| PipelineError::detection("detector backend lock poisoned"))?;

    let policy = DangerPolicy::default();
    pipeline::run(config, &policy, &mut *backend, video)
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load_from(args.config.as_deref())?;
    if let Some(dir) = &args.snapshots_dir {
        if dir.trim().is_empty() {
            return Err(anyhow!("--snapshots-dir must not be empty"));
        }
        config.snapshots.dir = dir.clone();
    }
    if let Some(backend) = &args.backend {
        config.detection.backend = backend.clone();
    }
    Ok(config)
}
