//! FFmpeg-backed video decode.
//!
//! Frames are decoded in-memory and scaled to tightly packed RGB24 before
//! they leave this module. The decoder handle lives as long as the sampler.

use ffmpeg_next as ffmpeg;

use crate::error::PipelineError;
use crate::frame::VideoMeta;

pub(crate) struct FfmpegVideo {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    meta: VideoMeta,
    eof_sent: bool,
}

impl FfmpegVideo {
    pub(crate) fn open(path: &str) -> Result<Self, PipelineError> {
        ffmpeg::init().map_err(|e| media_open(path, "initialize ffmpeg", e))?;

        let input = ffmpeg::format::input(&path)
            .map_err(|e| media_open(path, "open container", e))?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| PipelineError::media_open(format!("'{path}' has no video track")))?;
        let stream_index = stream.index();

        let rate = stream.avg_frame_rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        let duration = stream_duration_seconds(&stream, &input);
        let total_frames = if stream.frames() > 0 {
            stream.frames() as u64
        } else {
            // Containers without an exact count: estimate from duration.
            (duration * fps).round() as u64
        };

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| media_open(path, "load decoder parameters", e))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| media_open(path, "open video decoder", e))?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|e| media_open(path, "create scaler", e))?;

        let meta = VideoMeta {
            path: path.to_string(),
            duration,
            fps,
            total_frames,
        };

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
            meta,
            eof_sent: false,
        })
    }

    pub(crate) fn meta(&self) -> &VideoMeta {
        &self.meta
    }

    pub(crate) fn next_raw(&mut self) -> Result<Option<(Vec<u8>, u32, u32)>, PipelineError> {
        let mut decoded = ffmpeg::frame::Video::empty();
        let mut rgb_frame = ffmpeg::frame::Video::empty();

        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                self.scaler
                    .run(&decoded, &mut rgb_frame)
                    .map_err(|e| media_open(&self.meta.path, "scale frame to RGB", e))?;
                return Ok(Some(frame_to_pixels(&rgb_frame, &self.meta.path)?));
            }

            if self.eof_sent {
                return Ok(None);
            }

            let stream_index = self.stream_index;
            match self
                .input
                .packets()
                .find(|(stream, _)| stream.index() == stream_index)
            {
                Some((_, packet)) => {
                    self.decoder
                        .send_packet(&packet)
                        .map_err(|e| media_open(&self.meta.path, "send packet to decoder", e))?;
                }
                None => {
                    // Container exhausted: flush frames buffered in the decoder.
                    self.decoder
                        .send_eof()
                        .map_err(|e| media_open(&self.meta.path, "flush decoder", e))?;
                    self.eof_sent = true;
                }
            }
        }
    }
}

fn stream_duration_seconds(
    stream: &ffmpeg::format::stream::Stream<'_>,
    input: &ffmpeg::format::context::Input,
) -> f64 {
    let tb = stream.time_base();
    if stream.duration() > 0 && tb.denominator() != 0 {
        return stream.duration() as f64 * tb.numerator() as f64 / tb.denominator() as f64;
    }
    if input.duration() > 0 {
        return input.duration() as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE);
    }
    0.0
}

fn frame_to_pixels(
    frame: &ffmpeg::frame::Video,
    path: &str,
) -> Result<(Vec<u8>, u32, u32), PipelineError> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        return Ok((data.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        let slice = data.get(start..end).ok_or_else(|| {
            PipelineError::media_open(format!("'{path}': decoded frame row out of bounds"))
        })?;
        pixels.extend_from_slice(slice);
    }

    Ok((pixels, width, height))
}

fn media_open(path: &str, what: &str, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::media_open(format!("'{path}': {what}: {err}"))
}
