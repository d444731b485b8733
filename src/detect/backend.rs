use crate::detect::result::Detection;
use crate::error::PipelineError;
use crate::frame::SampledFrame;

/// Detector backend trait.
///
/// The pipeline treats a backend as a pure per-frame capability: given one
/// frame it returns zero or more detections already in frame-pixel space.
/// Any error aborts the run; there is no per-frame recovery.
///
/// Implementations must treat the frame's pixel buffer as read-only and
/// ephemeral, and must return detections through `Detection::new` so that
/// species names and confidence bounds are enforced at the seam.
pub trait DetectorBackend: Send {
    /// Backend identifier, used for registry lookup.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &SampledFrame) -> Result<Vec<Detection>, PipelineError>;

    /// Optional warm-up hook (model load, first-inference cost).
    fn warm_up(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }
}
