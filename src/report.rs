//! The report contract.
//!
//! A run produces exactly one `Report`, serialized as a single JSON line on
//! stdout. Callers scan stdout for the first line starting with `{` and
//! parse from there, so the report must never be pretty-printed or emitted
//! incrementally. On fatal errors the pipeline emits `failure_line` instead
//! and exits nonzero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::alert::AlertLevel;
use crate::detect::Detection;
use crate::error::PipelineError;
use crate::frame::VideoMeta;

/// Video metadata as it appears in the report, including the processed
/// frame count known only after the sample sequence was drained.
#[derive(Clone, Debug, Serialize)]
pub struct VideoSummary {
    pub path: String,
    pub duration: f64,
    pub fps: f64,
    pub total_frames: u64,
    pub processed_frames: u64,
}

impl VideoSummary {
    pub fn new(meta: &VideoMeta, processed_frames: u64) -> Self {
        Self {
            path: meta.path.clone(),
            duration: meta.duration,
            fps: meta.fps,
            total_frames: meta.total_frames,
            processed_frames,
        }
    }
}

/// One persisted snapshot. Immutable once built; owned by the report.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Image filename within the snapshots folder.
    pub file: String,
    /// Web-servable path (`/snapshots/<file>`), never an absolute
    /// filesystem path.
    pub path: String,
    pub frame: u64,
    pub timestamp: f64,
    #[serde(rename = "alertLevel")]
    pub alert_level: AlertLevel,
    pub detections: Vec<Detection>,
}

/// Root aggregate of a successful run.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub success: bool,
    pub video: VideoSummary,
    pub total_detections: u64,
    pub species_summary: BTreeMap<String, u64>,
    pub snapshots: Vec<SnapshotRecord>,
    pub snapshots_folder: String,
}

impl Report {
    /// Check the report's structural invariants.
    ///
    /// These hold by construction when the report comes out of the
    /// pipeline; validation runs anyway so a violation is caught before the
    /// report leaves the process rather than in a consumer.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let summed: u64 = self.species_summary.values().sum();
        if summed != self.total_detections {
            return Err(PipelineError::Invariant(format!(
                "total_detections {} != species summary sum {}",
                self.total_detections, summed
            )));
        }

        let mut previous_frame: Option<u64> = None;
        for snapshot in &self.snapshots {
            if let Some(prev) = previous_frame {
                if snapshot.frame <= prev {
                    return Err(PipelineError::Invariant(format!(
                        "snapshot frames not strictly increasing ({} after {})",
                        snapshot.frame, prev
                    )));
                }
            }
            previous_frame = Some(snapshot.frame);

            for det in &snapshot.detections {
                match self.species_summary.get(&det.species) {
                    Some(count) if *count >= 1 => {}
                    _ => {
                        return Err(PipelineError::Invariant(format!(
                            "snapshot species '{}' missing from summary",
                            det.species
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    /// Serialize as the single machine-readable stdout line.
    pub fn to_stdout_line(&self) -> Result<String, PipelineError> {
        serde_json::to_string(self)
            .map_err(|e| PipelineError::Invariant(format!("report serialization failed: {e}")))
    }
}

/// Assembles and validates the report at the end of a run.
pub struct ReportBuilder {
    video: VideoSummary,
    snapshots_folder: String,
}

impl ReportBuilder {
    pub fn new(video: VideoSummary, snapshots_folder: impl Into<String>) -> Self {
        Self {
            video,
            snapshots_folder: snapshots_folder.into(),
        }
    }

    pub fn finish(
        self,
        species_summary: BTreeMap<String, u64>,
        total_detections: u64,
        snapshots: Vec<SnapshotRecord>,
    ) -> Result<Report, PipelineError> {
        let report = Report {
            success: true,
            video: self.video,
            total_detections,
            species_summary,
            snapshots,
            snapshots_folder: self.snapshots_folder,
        };
        report.validate()?;
        Ok(report)
    }
}

/// The single stdout line emitted when a run fails.
pub fn failure_line(error: &str) -> String {
    // serde_json escapes embedded newlines, so this is always one line.
    serde_json::json!({
        "success": false,
        "error": error,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn video_summary() -> VideoSummary {
        VideoSummary {
            path: "uploads/herd.mp4".to_string(),
            duration: 10.0,
            fps: 30.0,
            total_frames: 300,
            processed_frames: 30,
        }
    }

    fn snapshot(frame: u64, species: &str) -> SnapshotRecord {
        let bbox = BoundingBox::new(10, 10, 60, 60).unwrap();
        SnapshotRecord {
            file: format!("{species}_f{frame:06}.jpg"),
            path: format!("/snapshots/{species}_f{frame:06}.jpg"),
            frame,
            timestamp: frame as f64 / 30.0,
            alert_level: AlertLevel::High,
            detections: vec![Detection::new(species, 0.9, bbox).unwrap()],
        }
    }

    fn summary(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs
            .iter()
            .map(|(name, count)| (name.to_string(), *count))
            .collect()
    }

    #[test]
    fn builder_accepts_consistent_report() {
        let report = ReportBuilder::new(video_summary(), "snapshots")
            .finish(summary(&[("lion", 2)]), 2, vec![snapshot(50, "lion"), snapshot(200, "lion")])
            .unwrap();
        assert!(report.success);
        assert_eq!(report.snapshots.len(), 2);
    }

    #[test]
    fn mismatched_total_is_rejected() {
        let err = ReportBuilder::new(video_summary(), "snapshots")
            .finish(summary(&[("lion", 2)]), 3, vec![])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Invariant(_)));
    }

    #[test]
    fn out_of_order_snapshots_are_rejected() {
        let err = ReportBuilder::new(video_summary(), "snapshots")
            .finish(
                summary(&[("lion", 2)]),
                2,
                vec![snapshot(200, "lion"), snapshot(50, "lion")],
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::Invariant(_)));
    }

    #[test]
    fn snapshot_species_must_appear_in_summary() {
        let err = ReportBuilder::new(video_summary(), "snapshots")
            .finish(summary(&[("zebra", 1)]), 1, vec![snapshot(50, "lion")])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Invariant(_)));
    }

    #[test]
    fn report_serializes_to_one_line_with_wire_names() {
        let report = ReportBuilder::new(video_summary(), "snapshots")
            .finish(summary(&[("lion", 1)]), 1, vec![snapshot(50, "lion")])
            .unwrap();
        let line = report.to_stdout_line().unwrap();

        assert!(!line.contains('\n'));
        assert!(line.starts_with('{'));
        assert!(line.contains("\"alertLevel\":\"high\""));
        assert!(line.contains("\"species_summary\":{\"lion\":1}"));
        assert!(line.contains("\"total_frames\":300"));
        assert!(line.contains("\"processed_frames\":30"));
        assert!(line.contains("\"snapshots_folder\":\"snapshots\""));
        assert!(line.contains("\"bbox\":{\"x1\":10,\"y1\":10,\"x2\":60,\"y2\":60}"));
    }

    #[test]
    fn failure_line_is_one_line_and_not_a_success_report() {
        let err = PipelineError::media_open("could not open video:\nuploads/broken.mp4");
        let line = failure_line(&err.to_string());
        assert!(!line.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["success"], false);
        assert!(value["error"].as_str().unwrap().contains("media open failed"));
    }
}
