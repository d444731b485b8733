use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};
use crate::error::PipelineError;
use crate::frame::SampledFrame;

/// Species the stub can "see", in hash-bucket order.
const STUB_SPECIES: [&str; 6] = ["elephant", "lion", "zebra", "baboon", "warthog", "impala"];

/// Stub backend for smoke runs without a model.
///
/// Derives detections purely from a hash of the frame's pixels, so the same
/// video always produces the same report (the idempotence property holds
/// end-to-end). Roughly a quarter of distinct frames yield one detection.
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &SampledFrame) -> Result<Vec<Detection>, PipelineError> {
        if frame.width < 16 || frame.height < 16 {
            return Ok(vec![]);
        }

        let digest: [u8; 32] = Sha256::digest(&frame.pixels).into();
        if digest[0] % 4 != 0 {
            return Ok(vec![]);
        }

        let species = STUB_SPECIES[(digest[1] as usize) % STUB_SPECIES.len()];
        // Map hash bytes into [0.55, 0.95).
        let confidence = 0.55 + (digest[2] as f32 / 255.0) * 0.4;

        // Carve a box somewhere in the middle two-thirds of the frame.
        let x1 = (digest[3] as u32 * (frame.width / 3)) / 256;
        let y1 = (digest[4] as u32 * (frame.height / 3)) / 256;
        let x2 = x1 + frame.width / 3 + (digest[5] as u32 * (frame.width / 6)) / 256;
        let y2 = y1 + frame.height / 3 + (digest[6] as u32 * (frame.height / 6)) / 256;
        let bbox = BoundingBox::new(x1, y1, x2.min(frame.width), y2.min(frame.height))?;

        Ok(vec![Detection::new(species, confidence, bbox)?])
    }
}
