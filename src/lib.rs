//! trailwatch - wildlife camera detection pipeline
//!
//! This crate turns an uploaded wildlife-camera video into a structured
//! detection report: frames are sampled at a fixed stride, a detector
//! backend classifies each one, detections are aggregated into species
//! counts and rate-limited snapshots, dangerous species raise the alert
//! severity, and annotated snapshot images are written to durable storage.
//!
//! # Architecture
//!
//! ```text
//! video file -> VideoSampler -> SampledFrame -> DetectorBackend
//!            -> DetectionAggregator -> DangerPolicy -> SnapshotWriter
//!            -> ReportBuilder -> Report (one JSON line on stdout)
//! ```
//!
//! The preferred integration is the in-process call
//! [`pipeline::run`], which returns a typed [`Report`]. The `pipeline`
//! binary wraps it in the child-process wire contract: diagnostics on
//! stderr, exactly one JSON line on stdout, exit code 0 on success.
//!
//! # Module Structure
//!
//! - `sample`: video open + fixed-stride frame sampling (stub:// and FFmpeg)
//! - `detect`: detector backend trait, registry, detection types
//! - `aggregate`: species counting + snapshot rate limiting
//! - `alert`: shared dangerous-species severity policy
//! - `snapshot`: bounding-box rendering and JPEG storage
//! - `report`: the report contract and its invariants
//! - `history`: local rolling detection history file

pub mod aggregate;
pub mod alert;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod history;
pub mod pipeline;
pub mod report;
pub mod sample;
pub mod snapshot;

pub use aggregate::{DetectionAggregator, SnapshotCandidate};
pub use alert::{Alert, AlertLevel, DangerPolicy};
pub use config::PipelineConfig;
pub use detect::{BackendRegistry, BoundingBox, Detection, DetectorBackend, ScriptedBackend, StubBackend};
pub use error::PipelineError;
pub use frame::{SampledFrame, VideoMeta};
pub use report::{failure_line, Report, SnapshotRecord, VideoSummary};
pub use sample::VideoSampler;
pub use snapshot::{SnapshotWriter, StoredSnapshot};

/// Build the registry of in-tree detector backends.
///
/// Library users plug real model backends in by registering their own
/// `DetectorBackend` implementations on top of (or instead of) these.
pub fn builtin_backends() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new());
    registry.register(ScriptedBackend::empty());
    registry
}
