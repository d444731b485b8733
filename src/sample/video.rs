use crate::error::PipelineError;
use crate::frame::{SampledFrame, VideoMeta};
#[cfg(feature = "decode-ffmpeg")]
use crate::sample::video_ffmpeg::FfmpegVideo;

/// Frame sampler over a single video file.
///
/// `open` computes the `VideoMeta`; `next_sample` then yields every
/// `stride`-th frame until the container is exhausted. The sequence is not
/// restartable: a second pass means a second `open`.
#[derive(Debug)]
pub struct VideoSampler {
    backend: VideoBackend,
    meta: VideoMeta,
    stride: u64,
    next_index: u64,
    processed: u64,
}

#[derive(Debug)]
enum VideoBackend {
    Synthetic(SyntheticVideo),
    #[cfg(feature = "decode-ffmpeg")]
    Ffmpeg(FfmpegVideo),
}

impl VideoSampler {
    /// Open a video and compute its metadata.
    ///
    /// Fails with `PipelineError::MediaOpen` when the path is not a local
    /// file, the container cannot be decoded, or it holds zero frames.
    pub fn open(path: &str, stride: u64) -> Result<Self, PipelineError> {
        if stride == 0 {
            return Err(PipelineError::media_open("sampling stride must be >= 1"));
        }
        if !is_local_media_path(path) {
            return Err(PipelineError::media_open(format!(
                "'{path}' is not a local video path (no URL schemes)"
            )));
        }

        let (backend, meta) = if path.starts_with("stub://") {
            let spec = SyntheticSpec::parse(path)?;
            let meta = spec.meta(path);
            (VideoBackend::Synthetic(SyntheticVideo::new(spec)), meta)
        } else {
            open_file(path)?
        };

        if meta.total_frames == 0 {
            return Err(PipelineError::media_open(format!(
                "'{path}' contains no video frames"
            )));
        }

        log::info!(
            "sampler: opened {} ({} frames at {:.2} fps, stride {})",
            meta.path,
            meta.total_frames,
            meta.fps,
            stride
        );

        Ok(Self {
            backend,
            meta,
            stride,
            next_index: 0,
            processed: 0,
        })
    }

    pub fn meta(&self) -> &VideoMeta {
        &self.meta
    }

    /// Number of sampled frames emitted so far. Only meaningful as the
    /// report's `processed_frames` once `next_sample` has returned `None`.
    pub fn frames_processed(&self) -> u64 {
        self.processed
    }

    /// Pull the next sampled frame, skipping frames between stride points.
    pub fn next_sample(&mut self) -> Result<Option<SampledFrame>, PipelineError> {
        loop {
            let index = self.next_index;
            let Some((pixels, width, height)) = self.next_raw()? else {
                return Ok(None);
            };
            self.next_index += 1;

            if index % self.stride != 0 {
                continue;
            }

            self.processed += 1;
            let timestamp = if self.meta.fps > 0.0 {
                index as f64 / self.meta.fps
            } else {
                0.0
            };
            return Ok(Some(SampledFrame::new(pixels, width, height, index, timestamp)));
        }
    }

    fn next_raw(&mut self) -> Result<Option<(Vec<u8>, u32, u32)>, PipelineError> {
        match &mut self.backend {
            VideoBackend::Synthetic(video) => Ok(video.next_raw()),
            #[cfg(feature = "decode-ffmpeg")]
            VideoBackend::Ffmpeg(video) => video.next_raw(),
        }
    }
}

#[cfg(feature = "decode-ffmpeg")]
fn open_file(path: &str) -> Result<(VideoBackend, VideoMeta), PipelineError> {
    let video = FfmpegVideo::open(path)?;
    let meta = video.meta().clone();
    Ok((VideoBackend::Ffmpeg(video), meta))
}

#[cfg(not(feature = "decode-ffmpeg"))]
fn open_file(path: &str) -> Result<(VideoBackend, VideoMeta), PipelineError> {
    Err(PipelineError::media_open(format!(
        "cannot decode '{path}': built without the decode-ffmpeg feature"
    )))
}

fn is_local_media_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and smoke runs
// ----------------------------------------------------------------------------

/// Parameters of a synthetic video, parsed from a `stub://` path.
///
/// Syntax: `stub://<name>?frames=300&fps=30&width=320&height=240`
/// (every parameter optional).
#[derive(Clone, Debug)]
pub struct SyntheticSpec {
    pub frames: u64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            frames: 150,
            fps: 30.0,
            width: 320,
            height: 240,
        }
    }
}

impl SyntheticSpec {
    pub fn parse(path: &str) -> Result<Self, PipelineError> {
        let mut spec = Self::default();
        let Some(query) = path.splitn(2, '?').nth(1) else {
            return Ok(spec);
        };
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                PipelineError::media_open(format!("malformed stub parameter '{pair}'"))
            })?;
            let invalid =
                || PipelineError::media_open(format!("invalid stub parameter '{pair}'"));
            match key {
                "frames" => spec.frames = value.parse().map_err(|_| invalid())?,
                "fps" => spec.fps = value.parse().map_err(|_| invalid())?,
                "width" => spec.width = value.parse().map_err(|_| invalid())?,
                "height" => spec.height = value.parse().map_err(|_| invalid())?,
                other => {
                    return Err(PipelineError::media_open(format!(
                        "unknown stub parameter '{other}'"
                    )))
                }
            }
        }
        if spec.fps <= 0.0 || spec.width < 16 || spec.height < 16 {
            return Err(PipelineError::media_open(format!(
                "unusable stub geometry: {spec:?}"
            )));
        }
        Ok(spec)
    }

    fn meta(&self, path: &str) -> VideoMeta {
        VideoMeta {
            path: path.to_string(),
            duration: self.frames as f64 / self.fps,
            fps: self.fps,
            total_frames: self.frames,
        }
    }
}

#[derive(Debug)]
struct SyntheticVideo {
    spec: SyntheticSpec,
    emitted: u64,
    scene_state: u8,
}

impl SyntheticVideo {
    fn new(spec: SyntheticSpec) -> Self {
        Self {
            spec,
            emitted: 0,
            scene_state: 0,
        }
    }

    fn next_raw(&mut self) -> Option<(Vec<u8>, u32, u32)> {
        if self.emitted >= self.spec.frames {
            return None;
        }
        let frame_number = self.emitted;
        self.emitted += 1;
        // Scene changes every 50 frames so diff-sensitive consumers see
        // something other than a static wall.
        if frame_number % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let pixel_count = (self.spec.width * self.spec.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + frame_number + self.scene_state as u64) % 256) as u8;
        }
        Some((pixels, self.spec.width, self.spec.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_meta_and_stride() {
        let mut sampler = VideoSampler::open("stub://cam?frames=300&fps=30", 10).unwrap();
        assert_eq!(sampler.meta().total_frames, 300);
        assert!((sampler.meta().duration - 10.0).abs() < 1e-9);

        let mut indices = Vec::new();
        while let Some(frame) = sampler.next_sample().unwrap() {
            indices.push(frame.index);
        }
        assert_eq!(indices.len(), 30);
        assert_eq!(indices[0], 0);
        assert_eq!(indices[1], 10);
        assert_eq!(indices[29], 290);
        assert_eq!(sampler.frames_processed(), 30);
    }

    #[test]
    fn timestamps_follow_source_index() {
        let mut sampler = VideoSampler::open("stub://cam?frames=61&fps=30", 30).unwrap();
        let mut stamps = Vec::new();
        while let Some(frame) = sampler.next_sample().unwrap() {
            stamps.push(frame.timestamp);
        }
        assert_eq!(stamps.len(), 3);
        assert!((stamps[1] - 1.0).abs() < 1e-9);
        assert!((stamps[2] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn zero_frame_stub_fails_to_open() {
        let err = VideoSampler::open("stub://cam?frames=0", 5).unwrap_err();
        assert!(matches!(err, PipelineError::MediaOpen(_)));
    }

    #[test]
    fn url_schemes_are_rejected() {
        let err = VideoSampler::open("rtsp://camera-1/stream", 5).unwrap_err();
        assert!(matches!(err, PipelineError::MediaOpen(_)));
    }

    #[test]
    fn malformed_stub_parameters_are_rejected() {
        assert!(VideoSampler::open("stub://cam?frames=abc", 5).is_err());
        assert!(VideoSampler::open("stub://cam?rate=30", 5).is_err());
        assert!(VideoSampler::open("stub://cam?fps=0", 5).is_err());
    }

    #[cfg(not(feature = "decode-ffmpeg"))]
    #[test]
    fn real_files_require_ffmpeg_feature() {
        let err = VideoSampler::open("uploads/herd.mp4", 5).unwrap_err();
        assert!(matches!(err, PipelineError::MediaOpen(_)));
    }

    #[test]
    fn synthetic_frames_are_deterministic() {
        let collect = || {
            let mut sampler = VideoSampler::open("stub://cam?frames=40&fps=10", 4).unwrap();
            let mut frames = Vec::new();
            while let Some(frame) = sampler.next_sample().unwrap() {
                frames.push(frame.pixels);
            }
            frames
        };
        assert_eq!(collect(), collect());
    }
}
