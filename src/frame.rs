//! Sampled frames and per-video metadata.
//!
//! A `SampledFrame` is an owned RGB24 pixel buffer tagged with its position
//! in the source video. Frames are produced by the sampler, handed to the
//! detector, and (for snapshot candidates) to the snapshot writer; nothing
//! retains them beyond the current loop iteration.

use serde::Serialize;

/// One decoded frame surviving the sampling stride.
#[derive(Clone, Debug)]
pub struct SampledFrame {
    /// Tightly packed RGB24 rows (`width * height * 3` bytes).
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Zero-based index of this frame in the source video (pre-stride).
    pub index: u64,
    /// Position in the video, in seconds.
    pub timestamp: f64,
}

impl SampledFrame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, index: u64, timestamp: f64) -> Self {
        debug_assert_eq!(pixels.len(), (width as usize) * (height as usize) * 3);
        Self {
            pixels,
            width,
            height,
            index,
            timestamp,
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

/// Immutable properties of the source video, computed once at open time.
///
/// `processed_frames` is not part of this struct: it is only known after the
/// sample sequence has been fully drained and is reported separately by the
/// sampler.
#[derive(Clone, Debug, Serialize)]
pub struct VideoMeta {
    pub path: String,
    /// Duration in seconds.
    pub duration: f64,
    pub fps: f64,
    pub total_frames: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_carries_position() {
        let frame = SampledFrame::new(vec![0u8; 4 * 4 * 3], 4, 4, 40, 1.333);
        assert_eq!(frame.pixel_count(), 16);
        assert_eq!(frame.index, 40);
        assert!((frame.timestamp - 1.333).abs() < 1e-9);
    }
}
