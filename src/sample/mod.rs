//! Frame sampling.
//!
//! This module opens a video container, reports its immutable metadata, and
//! yields a finite, non-restartable sequence of frames at a fixed stride.
//! Two backends:
//! - `stub://` paths: deterministic synthetic frames (always available,
//!   used by tests and smoke runs)
//! - local files: FFmpeg decode (feature: decode-ffmpeg)
//!
//! The sampler is responsible for:
//! - Rejecting unopenable or zero-frame media at open time
//! - Frame decimation at a fixed stride (policy, not content-derived)
//! - Stamping each surviving frame with its source index and timestamp
//!
//! It holds the decoder handle for the pipeline's lifetime; dropping the
//! sampler releases it, including on error paths.

mod video;
#[cfg(feature = "decode-ffmpeg")]
pub(crate) mod video_ffmpeg;

pub use video::{SyntheticSpec, VideoSampler};
