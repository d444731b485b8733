use std::collections::HashMap;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};
use crate::error::PipelineError;
use crate::frame::SampledFrame;

/// Fixture backend: a fixed map from source frame index to detections.
///
/// Used by tests and dry runs where the expected sightings are known up
/// front. Frames without an entry yield no detections.
pub struct ScriptedBackend {
    script: HashMap<u64, Vec<Detection>>,
    fail_on: Option<u64>,
}

impl ScriptedBackend {
    pub fn empty() -> Self {
        Self {
            script: HashMap::new(),
            fail_on: None,
        }
    }

    pub fn new(script: HashMap<u64, Vec<Detection>>) -> Self {
        Self {
            script,
            fail_on: None,
        }
    }

    /// Convenience: one detection of `species` at each listed frame index.
    pub fn with_sightings(
        species: &str,
        confidence: f32,
        frames: &[u64],
    ) -> Result<Self, PipelineError> {
        let bbox = BoundingBox::new(40, 40, 200, 160)?;
        let mut script = HashMap::new();
        for &frame in frames {
            script.insert(frame, vec![Detection::new(species, confidence, bbox)?]);
        }
        Ok(Self::new(script))
    }

    /// Make `detect` fail when it reaches the given frame index.
    pub fn failing_at(mut self, frame: u64) -> Self {
        self.fail_on = Some(frame);
        self
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, frame: &SampledFrame) -> Result<Vec<Detection>, PipelineError> {
        if self.fail_on == Some(frame.index) {
            return Err(PipelineError::detection(format!(
                "scripted failure at frame {}",
                frame.index
            )));
        }
        Ok(self.script.get(&frame.index).cloned().unwrap_or_default())
    }
}
