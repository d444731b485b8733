use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Axis-aligned bounding box in frame-pixel coordinates.
///
/// Invariant: `x1 < x2` and `y1 < y2`, enforced at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Result<Self, PipelineError> {
        if x1 >= x2 || y1 >= y2 {
            return Err(PipelineError::detection(format!(
                "degenerate bounding box ({x1},{y1})-({x2},{y2})"
            )));
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// A single detection on a single frame, as returned by a backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
    pub species: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    /// Build a detection, normalizing the species name and enforcing the
    /// confidence bounds. Backends must go through here so that malformed
    /// outputs abort the run instead of polluting the summary.
    pub fn new(species: &str, confidence: f32, bbox: BoundingBox) -> Result<Self, PipelineError> {
        let species = normalize_species(species)?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(PipelineError::detection(format!(
                "confidence {confidence} out of bounds for '{species}'"
            )));
        }
        Ok(Self {
            species,
            confidence,
            bbox,
        })
    }
}

/// Species names are lowercased identifiers, not free text.
///
/// Allowed: "lion", "african elephant", "warthog_2".
/// Disallowed: empty names, punctuation outside [ _-], anything non-ASCII.
pub fn normalize_species(raw: &str) -> Result<String, PipelineError> {
    // Compile once for hot paths.
    static SPECIES_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = SPECIES_RE
        .get_or_init(|| regex::Regex::new(r"^[a-z0-9][a-z0-9 _-]{0,63}$").unwrap());

    let name = raw.trim().to_lowercase();
    if !re.is_match(&name) {
        return Err(PipelineError::detection(format!(
            "species name '{raw}' does not match ^[a-z0-9][a-z0-9 _-]{{0,63}}$"
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_rejects_degenerate_corners() {
        assert!(BoundingBox::new(10, 10, 10, 20).is_err());
        assert!(BoundingBox::new(10, 30, 20, 30).is_err());
        assert!(BoundingBox::new(20, 10, 10, 20).is_err());

        let bbox = BoundingBox::new(10, 20, 110, 70).unwrap();
        assert_eq!(bbox.width(), 100);
        assert_eq!(bbox.height(), 50);
    }

    #[test]
    fn detection_normalizes_species() {
        let bbox = BoundingBox::new(0, 0, 10, 10).unwrap();
        let det = Detection::new("  Lion ", 0.9, bbox).unwrap();
        assert_eq!(det.species, "lion");
    }

    #[test]
    fn detection_rejects_bad_inputs() {
        let bbox = BoundingBox::new(0, 0, 10, 10).unwrap();
        assert!(Detection::new("", 0.9, bbox).is_err());
        assert!(Detection::new("li/on", 0.9, bbox).is_err());
        assert!(Detection::new("lion", 1.2, bbox).is_err());
        assert!(Detection::new("lion", -0.1, bbox).is_err());
    }
}
