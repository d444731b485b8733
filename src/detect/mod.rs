//! The detector seam.
//!
//! The actual classifier is an external capability; this module defines the
//! trait the pipeline calls through (`DetectorBackend`), the detection types
//! it returns, and a registry for selecting a backend by name. Two backends
//! ship in-tree: `stub` (deterministic, pixel-hash driven) and `scripted`
//! (frame-index fixture for tests and dry runs).

mod backend;
pub mod backends;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::{ScriptedBackend, StubBackend};
pub use registry::BackendRegistry;
pub use result::{normalize_species, BoundingBox, Detection};
