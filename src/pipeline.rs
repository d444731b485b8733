//! Pipeline orchestration.
//!
//! One call, one video, one report: sample frames at the configured stride,
//! run the detector on each, fold results into the aggregator, and turn
//! snapshot candidates into persisted images. Single-threaded, single-pass,
//! fail-fast: any error aborts the run with no partial report.

use crate::aggregate::DetectionAggregator;
use crate::alert::DangerPolicy;
use crate::config::PipelineConfig;
use crate::detect::DetectorBackend;
use crate::error::PipelineError;
use crate::report::{Report, ReportBuilder, SnapshotRecord, VideoSummary};
use crate::sample::VideoSampler;
use crate::snapshot::SnapshotWriter;

/// Process one video end to end.
///
/// This is the in-process entry point; the `pipeline` binary wraps it with
/// the stdout/exit-code wire contract.
pub fn run(
    config: &PipelineConfig,
    policy: &DangerPolicy,
    backend: &mut dyn DetectorBackend,
    video_path: &str,
) -> Result<Report, PipelineError> {
    log::info!(
        "pipeline: processing {} with backend '{}' (policy {})",
        video_path,
        backend.name(),
        policy.version
    );

    let mut sampler = VideoSampler::open(video_path, config.sampling.frame_stride)?;
    let writer = SnapshotWriter::create(
        &config.snapshots.dir,
        config.snapshots.web_prefix.clone(),
        config.snapshots.max_width,
        config.snapshots.max_height,
        config.snapshots.jpeg_quality,
    )?;
    let mut aggregator = DetectionAggregator::new(
        config.detection.confidence_threshold,
        config.snapshots.cooldown_frames,
    );

    backend.warm_up()?;

    let mut snapshots: Vec<SnapshotRecord> = Vec::new();
    while let Some(frame) = sampler.next_sample()? {
        let detections = backend.detect(&frame)?;
        let Some(candidate) = aggregator.ingest(frame.index, detections) else {
            continue;
        };

        let level = policy.classify(candidate.species());
        let stored = writer.write(&frame, &candidate.detections, level)?;
        snapshots.push(SnapshotRecord {
            file: stored.file,
            path: stored.path,
            frame: frame.index,
            timestamp: frame.timestamp,
            alert_level: level,
            detections: candidate.detections,
        });
    }

    let video = VideoSummary::new(sampler.meta(), sampler.frames_processed());
    log::info!(
        "pipeline: {} frames processed, {} detections, {} snapshots",
        video.processed_frames,
        aggregator.total_detections(),
        snapshots.len()
    );

    let total = aggregator.total_detections();
    ReportBuilder::new(video, config.snapshots.dir.clone()).finish(
        aggregator.into_summary(),
        total,
        snapshots,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertLevel;
    use crate::detect::{ScriptedBackend, StubBackend};

    fn test_config(dir: &std::path::Path, stride: u64, cooldown: u64) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.sampling.frame_stride = stride;
        config.snapshots.dir = dir.join("snapshots").to_string_lossy().into_owned();
        config.snapshots.cooldown_frames = cooldown;
        config
    }

    #[test]
    fn empty_detector_yields_empty_successful_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 10, 90);
        let mut backend = ScriptedBackend::empty();

        let report = run(
            &config,
            &DangerPolicy::default(),
            &mut backend,
            "stub://cam?frames=300&fps=30",
        )
        .unwrap();

        assert!(report.success);
        assert_eq!(report.total_detections, 0);
        assert!(report.species_summary.is_empty());
        assert!(report.snapshots.is_empty());
        assert_eq!(report.video.processed_frames, 30);
        report.validate().unwrap();
    }

    #[test]
    fn lion_sightings_become_high_snapshots() {
        // 10s of 30fps video sampled every 10th frame; sampled indices 5 and
        // 20 carry one lion each (source frames 50 and 200).
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 10, 90);
        let mut backend = ScriptedBackend::with_sightings("lion", 0.9, &[50, 200]).unwrap();

        let report = run(
            &config,
            &DangerPolicy::default(),
            &mut backend,
            "stub://cam?frames=300&fps=30",
        )
        .unwrap();

        assert_eq!(report.total_detections, 2);
        assert_eq!(report.species_summary["lion"], 2);
        assert_eq!(report.snapshots.len(), 2);
        for snapshot in &report.snapshots {
            assert_eq!(snapshot.alert_level, AlertLevel::High);
        }
        assert_eq!(report.snapshots[0].frame, 50);
        assert_eq!(report.snapshots[1].frame, 200);
        report.validate().unwrap();
    }

    #[test]
    fn cooldown_suppresses_nearby_snapshots_but_not_counts() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 10, 500);
        let mut backend =
            ScriptedBackend::with_sightings("warthog", 0.8, &[50, 100, 200]).unwrap();

        let report = run(
            &config,
            &DangerPolicy::default(),
            &mut backend,
            "stub://cam?frames=300&fps=30",
        )
        .unwrap();

        assert_eq!(report.species_summary["warthog"], 3);
        assert_eq!(report.snapshots.len(), 1);
        assert_eq!(report.snapshots[0].alert_level, AlertLevel::Medium);
    }

    #[test]
    fn detector_failure_aborts_with_no_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 10, 90);
        let mut backend = ScriptedBackend::empty().failing_at(100);

        let err = run(
            &config,
            &DangerPolicy::default(),
            &mut backend,
            "stub://cam?frames=300&fps=30",
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Detection(_)));
    }

    #[test]
    fn unopenable_video_is_a_media_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 10, 90);
        let mut backend = ScriptedBackend::empty();

        let err = run(
            &config,
            &DangerPolicy::default(),
            &mut backend,
            "stub://cam?frames=0",
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MediaOpen(_)));
    }

    #[test]
    fn reruns_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 5, 90);

        let run_once = || {
            let mut backend = StubBackend::new();
            run(
                &config,
                &DangerPolicy::default(),
                &mut backend,
                "stub://cam?frames=200&fps=25",
            )
            .unwrap()
        };

        let first = run_once();
        let second = run_once();

        assert_eq!(first.species_summary, second.species_summary);
        assert_eq!(first.total_detections, second.total_detections);
        let frames = |report: &Report| -> Vec<u64> {
            report.snapshots.iter().map(|s| s.frame).collect()
        };
        assert_eq!(frames(&first), frames(&second));
    }
}
