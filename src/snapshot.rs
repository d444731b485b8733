//! Snapshot rendering and storage.
//!
//! Renders bounding boxes and species/confidence labels onto a copy of the
//! frame, caps the image size for phone-friendly delivery, and writes a
//! compressed JPEG under the run's snapshot directory. Filenames derive
//! from the source frame index, which is unique within a run, so names are
//! collision-free and deterministic. The returned path is web-relative; the
//! process's filesystem layout never leaks into the report.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::alert::AlertLevel;
use crate::detect::Detection;
use crate::error::PipelineError;
use crate::frame::SampledFrame;

/// Box/label colors keyed to alert severity.
fn severity_color(level: AlertLevel) -> Rgb<u8> {
    match level {
        AlertLevel::High => Rgb([220, 40, 40]),
        AlertLevel::Medium => Rgb([240, 140, 20]),
        AlertLevel::Low => Rgb([60, 180, 75]),
    }
}

/// Location of a snapshot written to durable storage.
#[derive(Clone, Debug)]
pub struct StoredSnapshot {
    pub file: String,
    pub path: String,
}

/// Writes annotated snapshot images under a per-run output directory.
#[derive(Debug)]
pub struct SnapshotWriter {
    dir: PathBuf,
    web_prefix: String,
    max_width: u32,
    max_height: u32,
    jpeg_quality: u8,
}

impl SnapshotWriter {
    /// Create the output directory and the writer.
    ///
    /// Fails with `PipelineError::Storage` when the directory cannot be
    /// created; an unwritable directory is fatal for the whole run.
    pub fn create(
        dir: impl Into<PathBuf>,
        web_prefix: impl Into<String>,
        max_width: u32,
        max_height: u32,
        jpeg_quality: u8,
    ) -> Result<Self, PipelineError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            PipelineError::storage(format!(
                "cannot create snapshot directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(Self {
            dir,
            web_prefix: web_prefix.into(),
            max_width,
            max_height,
            jpeg_quality,
        })
    }

    /// Render and persist one snapshot.
    pub fn write(
        &self,
        frame: &SampledFrame,
        detections: &[Detection],
        level: AlertLevel,
    ) -> Result<StoredSnapshot, PipelineError> {
        let mut img = RgbImage::from_raw(frame.width, frame.height, frame.pixels.clone())
            .ok_or_else(|| {
                PipelineError::storage(format!(
                    "frame {} buffer does not match {}x{}",
                    frame.index, frame.width, frame.height
                ))
            })?;

        let color = severity_color(level);
        for det in detections {
            draw_detection(&mut img, det, color);
        }

        let img = cap_size(img, self.max_width, self.max_height);

        let file = snapshot_filename(frame.index, detections);
        let disk_path = self.dir.join(&file);
        let out = File::create(&disk_path).map_err(|e| {
            PipelineError::storage(format!("cannot write {}: {e}", disk_path.display()))
        })?;
        let encoder = JpegEncoder::new_with_quality(BufWriter::new(out), self.jpeg_quality);
        encoder
            .write_image(
                img.as_raw(),
                img.width(),
                img.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| {
                PipelineError::storage(format!("jpeg encode of {} failed: {e}", disk_path.display()))
            })?;

        log::info!(
            "snapshot: {} ({} detections, {})",
            file,
            detections.len(),
            level.as_str()
        );

        Ok(StoredSnapshot {
            path: format!("{}/{}", self.web_prefix, file),
            file,
        })
    }
}

/// `<primary_species>_f<frame:06>.jpg`, primary = highest confidence.
fn snapshot_filename(frame_index: u64, detections: &[Detection]) -> String {
    let primary = detections
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .map(|det| det.species.replace(' ', "_"))
        .unwrap_or_else(|| "unknown".to_string());
    format!("{primary}_f{frame_index:06}.jpg")
}

fn draw_detection(img: &mut RgbImage, det: &Detection, color: Rgb<u8>) {
    let bbox = &det.bbox;
    let x2 = bbox.x2.min(img.width());
    let y2 = bbox.y2.min(img.height());
    if bbox.x1 >= x2 || bbox.y1 >= y2 {
        return;
    }
    let width = x2 - bbox.x1;
    let height = y2 - bbox.y1;

    // Two nested rects give a 2px border without a filled overlay.
    let outer = Rect::at(bbox.x1 as i32, bbox.y1 as i32).of_size(width, height);
    draw_hollow_rect_mut(img, outer, color);
    if width > 2 && height > 2 {
        let inner = Rect::at(bbox.x1 as i32 + 1, bbox.y1 as i32 + 1).of_size(width - 2, height - 2);
        draw_hollow_rect_mut(img, inner, color);
    }

    let label = format!("{} {:.0}%", det.species.to_uppercase(), det.confidence * 100.0);
    let label_y = bbox.y1.saturating_sub(label::GLYPH_HEIGHT + 2);
    label::stamp(img, &label, bbox.x1, label_y, color);
}

/// Cap to the configured bounds, preserving aspect ratio; never upscale.
fn cap_size(img: RgbImage, max_width: u32, max_height: u32) -> RgbImage {
    let (w, h) = (img.width(), img.height());
    if w <= max_width && h <= max_height {
        return img;
    }
    let scale_w = max_width as f64 / w as f64;
    let scale_h = max_height as f64 / h as f64;
    let scale = scale_w.min(scale_h);
    let new_w = ((w as f64 * scale).round() as u32).max(1);
    let new_h = ((h as f64 * scale).round() as u32).max(1);
    imageops::resize(&img, new_w, new_h, imageops::FilterType::Triangle)
}

/// Minimal 5x7 bitmap glyphs for snapshot labels.
///
/// A font rasterizer is deliberately not pulled in for a dozen uppercase
/// characters; labels only ever contain species names and a percentage.
mod label {
    use image::{Rgb, RgbImage};

    pub const GLYPH_HEIGHT: u32 = 7;
    const GLYPH_WIDTH: u32 = 5;

    /// Column-encoded 5x7 glyph, bit 0 = top row.
    fn glyph(ch: char) -> [u8; 5] {
        match ch {
            'A' => [0x7E, 0x11, 0x11, 0x11, 0x7E],
            'B' => [0x7F, 0x49, 0x49, 0x49, 0x36],
            'C' => [0x3E, 0x41, 0x41, 0x41, 0x22],
            'D' => [0x7F, 0x41, 0x41, 0x22, 0x1C],
            'E' => [0x7F, 0x49, 0x49, 0x49, 0x41],
            'F' => [0x7F, 0x09, 0x09, 0x09, 0x01],
            'G' => [0x3E, 0x41, 0x49, 0x49, 0x7A],
            'H' => [0x7F, 0x08, 0x08, 0x08, 0x7F],
            'I' => [0x00, 0x41, 0x7F, 0x41, 0x00],
            'J' => [0x20, 0x40, 0x41, 0x3F, 0x01],
            'K' => [0x7F, 0x08, 0x14, 0x22, 0x41],
            'L' => [0x7F, 0x40, 0x40, 0x40, 0x40],
            'M' => [0x7F, 0x02, 0x0C, 0x02, 0x7F],
            'N' => [0x7F, 0x04, 0x08, 0x10, 0x7F],
            'O' => [0x3E, 0x41, 0x41, 0x41, 0x3E],
            'P' => [0x7F, 0x09, 0x09, 0x09, 0x06],
            'Q' => [0x3E, 0x41, 0x51, 0x21, 0x5E],
            'R' => [0x7F, 0x09, 0x19, 0x29, 0x46],
            'S' => [0x46, 0x49, 0x49, 0x49, 0x31],
            'T' => [0x01, 0x01, 0x7F, 0x01, 0x01],
            'U' => [0x3F, 0x40, 0x40, 0x40, 0x3F],
            'V' => [0x1F, 0x20, 0x40, 0x20, 0x1F],
            'W' => [0x3F, 0x40, 0x38, 0x40, 0x3F],
            'X' => [0x63, 0x14, 0x08, 0x14, 0x63],
            'Y' => [0x07, 0x08, 0x70, 0x08, 0x07],
            'Z' => [0x61, 0x51, 0x49, 0x45, 0x43],
            '0' => [0x3E, 0x51, 0x49, 0x45, 0x3E],
            '1' => [0x00, 0x42, 0x7F, 0x40, 0x00],
            '2' => [0x42, 0x61, 0x51, 0x49, 0x46],
            '3' => [0x21, 0x41, 0x45, 0x4B, 0x31],
            '4' => [0x18, 0x14, 0x12, 0x7F, 0x10],
            '5' => [0x27, 0x45, 0x45, 0x45, 0x39],
            '6' => [0x3C, 0x4A, 0x49, 0x49, 0x30],
            '7' => [0x01, 0x71, 0x09, 0x05, 0x03],
            '8' => [0x36, 0x49, 0x49, 0x49, 0x36],
            '9' => [0x06, 0x49, 0x49, 0x29, 0x1E],
            '%' => [0x23, 0x13, 0x08, 0x64, 0x62],
            '-' => [0x08, 0x08, 0x08, 0x08, 0x08],
            '_' => [0x40, 0x40, 0x40, 0x40, 0x40],
            _ => [0x00; 5],
        }
    }

    /// Stamp `text` starting at (x, y); pixels outside the image are dropped.
    pub fn stamp(img: &mut RgbImage, text: &str, x: u32, y: u32, color: Rgb<u8>) {
        let mut cursor = x;
        for ch in text.chars() {
            for (col, bits) in glyph(ch).iter().enumerate() {
                for row in 0..GLYPH_HEIGHT {
                    if bits >> row & 1 == 1 {
                        let px = cursor + col as u32;
                        let py = y + row;
                        if px < img.width() && py < img.height() {
                            img.put_pixel(px, py, color);
                        }
                    }
                }
            }
            cursor += GLYPH_WIDTH + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn frame(width: u32, height: u32, index: u64) -> SampledFrame {
        SampledFrame::new(
            vec![128u8; (width * height * 3) as usize],
            width,
            height,
            index,
            index as f64 / 30.0,
        )
    }

    fn lion(confidence: f32) -> Detection {
        let bbox = BoundingBox::new(40, 40, 200, 160).unwrap();
        Detection::new("lion", confidence, bbox).unwrap()
    }

    #[test]
    fn writes_jpeg_with_stable_name_and_web_path() {
        let dir = tempfile::tempdir().unwrap();
        let writer =
            SnapshotWriter::create(dir.path().join("snapshots"), "/snapshots", 480, 480, 70)
                .unwrap();

        let stored = writer
            .write(&frame(320, 240, 50), &[lion(0.9)], AlertLevel::High)
            .unwrap();

        assert_eq!(stored.file, "lion_f000050.jpg");
        assert_eq!(stored.path, "/snapshots/lion_f000050.jpg");
        let on_disk = dir.path().join("snapshots").join(&stored.file);
        assert!(on_disk.exists());
        assert!(std::fs::metadata(&on_disk).unwrap().len() > 0);
    }

    #[test]
    fn primary_species_is_highest_confidence() {
        let bbox = BoundingBox::new(5, 5, 30, 30).unwrap();
        let dets = vec![
            Detection::new("zebra", 0.6, bbox).unwrap(),
            Detection::new("african elephant", 0.95, bbox).unwrap(),
        ];
        assert_eq!(snapshot_filename(7, &dets), "african_elephant_f000007.jpg");
    }

    #[test]
    fn large_frames_are_capped_without_upscaling_small_ones() {
        let big = cap_size(RgbImage::new(1920, 1080), 480, 480);
        assert_eq!(big.width(), 480);
        assert_eq!(big.height(), 270);

        let small = cap_size(RgbImage::new(320, 240), 480, 480);
        assert_eq!((small.width(), small.height()), (320, 240));
    }

    #[test]
    fn unwritable_directory_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = SnapshotWriter::create(blocker.join("snapshots"), "/snapshots", 480, 480, 70)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
    }

    #[test]
    fn annotation_changes_pixels_inside_the_box() {
        let mut img = RgbImage::from_pixel(100, 100, Rgb([128, 128, 128]));
        let det = lion(0.8);
        draw_detection(&mut img, &det, Rgb([220, 40, 40]));
        // Border pixel of the (clamped) box took the severity color.
        assert_eq!(*img.get_pixel(40, 40), Rgb([220, 40, 40]));
    }
}
