//! Detection aggregation.
//!
//! Folds the per-frame detection stream into a running species summary and a
//! bounded set of snapshot candidates. Counting is intentionally per
//! accepted detection: an animal that stays in view is counted on every
//! sampled frame it survives the confidence filter. Cross-frame identity
//! tracking belongs in a separate layer, not here.

use std::collections::BTreeMap;

use crate::detect::Detection;

/// A frame the aggregator marked as snapshot-worthy, together with the
/// detections that survived the confidence filter on that frame.
#[derive(Clone, Debug)]
pub struct SnapshotCandidate {
    pub frame_index: u64,
    pub detections: Vec<Detection>,
}

impl SnapshotCandidate {
    /// Distinct species on this frame, first-seen order preserved.
    pub fn species(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for det in &self.detections {
            if !seen.contains(&det.species.as_str()) {
                seen.push(det.species.as_str());
            }
        }
        seen
    }
}

/// Single-pass aggregator over frame-ordered detection results.
///
/// Snapshot selection is a rate limiter, not identity deduplication: the
/// first qualifying frame always becomes a candidate, and later qualifying
/// frames only do once `cooldown_frames` source frames have elapsed since
/// the previous snapshot.
pub struct DetectionAggregator {
    confidence_threshold: f32,
    cooldown_frames: u64,
    summary: BTreeMap<String, u64>,
    total: u64,
    last_snapshot_frame: Option<u64>,
}

impl DetectionAggregator {
    pub fn new(confidence_threshold: f32, cooldown_frames: u64) -> Self {
        Self {
            confidence_threshold,
            cooldown_frames,
            summary: BTreeMap::new(),
            total: 0,
            last_snapshot_frame: None,
        }
    }

    /// Fold one frame's detections in. Frames must arrive in source order.
    ///
    /// Returns a snapshot candidate when the frame has at least one
    /// surviving detection and the cooldown gate is open.
    pub fn ingest(
        &mut self,
        frame_index: u64,
        detections: Vec<Detection>,
    ) -> Option<SnapshotCandidate> {
        let surviving: Vec<Detection> = detections
            .into_iter()
            .filter(|det| det.confidence >= self.confidence_threshold)
            .collect();

        for det in &surviving {
            *self.summary.entry(det.species.clone()).or_insert(0) += 1;
            self.total += 1;
        }

        if surviving.is_empty() {
            return None;
        }

        let due = match self.last_snapshot_frame {
            None => true,
            Some(last) => frame_index.saturating_sub(last) >= self.cooldown_frames,
        };
        if !due {
            log::debug!(
                "aggregator: frame {} qualifies but is inside the snapshot cooldown",
                frame_index
            );
            return None;
        }

        self.last_snapshot_frame = Some(frame_index);
        Some(SnapshotCandidate {
            frame_index,
            detections: surviving,
        })
    }

    /// Total accepted detections so far.
    pub fn total_detections(&self) -> u64 {
        self.total
    }

    /// Consume the aggregator, yielding the species summary.
    pub fn into_summary(self) -> BTreeMap<String, u64> {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn det(species: &str, confidence: f32) -> Detection {
        let bbox = BoundingBox::new(0, 0, 50, 50).unwrap();
        Detection::new(species, confidence, bbox).unwrap()
    }

    #[test]
    fn below_threshold_detections_contribute_nothing() {
        let mut agg = DetectionAggregator::new(0.5, 10);
        assert!(agg.ingest(0, vec![det("lion", 0.49), det("zebra", 0.2)]).is_none());
        assert_eq!(agg.total_detections(), 0);
        assert!(agg.into_summary().is_empty());
    }

    #[test]
    fn every_accepted_detection_is_counted() {
        let mut agg = DetectionAggregator::new(0.5, 1_000);
        agg.ingest(0, vec![det("lion", 0.9), det("lion", 0.8), det("zebra", 0.6)]);
        agg.ingest(5, vec![det("lion", 0.7)]);

        assert_eq!(agg.total_detections(), 4);
        let summary = agg.into_summary();
        assert_eq!(summary["lion"], 3);
        assert_eq!(summary["zebra"], 1);
    }

    #[test]
    fn first_qualifying_frame_is_always_a_candidate() {
        let mut agg = DetectionAggregator::new(0.5, 500);
        assert!(agg.ingest(0, vec![]).is_none());
        assert!(agg.ingest(5, vec![det("lion", 0.3)]).is_none());
        let candidate = agg.ingest(10, vec![det("lion", 0.9)]).unwrap();
        assert_eq!(candidate.frame_index, 10);
    }

    #[test]
    fn cooldown_gates_subsequent_candidates() {
        let mut agg = DetectionAggregator::new(0.5, 90);
        assert!(agg.ingest(50, vec![det("lion", 0.9)]).is_some());
        // Inside the cooldown window: counted but not snapshotted.
        assert!(agg.ingest(100, vec![det("lion", 0.9)]).is_none());
        assert!(agg.ingest(139, vec![det("lion", 0.9)]).is_none());
        // 140 - 50 == 90: the gate reopens.
        assert!(agg.ingest(140, vec![det("lion", 0.9)]).is_some());
        assert_eq!(agg.total_detections(), 4);
    }

    #[test]
    fn suppressed_frames_still_count_toward_summary() {
        let mut agg = DetectionAggregator::new(0.5, 1_000);
        agg.ingest(0, vec![det("elephant", 0.9)]);
        agg.ingest(10, vec![det("elephant", 0.9)]);
        agg.ingest(20, vec![det("elephant", 0.9)]);
        assert_eq!(agg.into_summary()["elephant"], 3);
    }

    #[test]
    fn candidate_species_are_distinct_and_ordered() {
        let mut agg = DetectionAggregator::new(0.5, 10);
        let candidate = agg
            .ingest(0, vec![det("lion", 0.9), det("zebra", 0.8), det("lion", 0.7)])
            .unwrap();
        assert_eq!(candidate.species(), vec!["lion", "zebra"]);
        assert_eq!(candidate.detections.len(), 3);
    }
}
