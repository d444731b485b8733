use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::Deserialize;

const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_FRAME_STRIDE: u64 = 5;
const DEFAULT_SNAPSHOT_DIR: &str = "snapshots";
const DEFAULT_WEB_PREFIX: &str = "/snapshots";
const DEFAULT_COOLDOWN_FRAMES: u64 = 90;
const DEFAULT_MAX_SNAPSHOT_WIDTH: u32 = 480;
const DEFAULT_MAX_SNAPSHOT_HEIGHT: u32 = 480;
const DEFAULT_JPEG_QUALITY: u8 = 70;
const DEFAULT_HISTORY_PATH: &str = "detection_history.json";
const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    detection: Option<DetectionConfigFile>,
    sampling: Option<SamplingConfigFile>,
    snapshots: Option<SnapshotConfigFile>,
    history: Option<HistoryConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    confidence_threshold: Option<f32>,
    backend: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SamplingConfigFile {
    frame_stride: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct SnapshotConfigFile {
    dir: Option<String>,
    web_prefix: Option<String>,
    cooldown_frames: Option<u64>,
    max_width: Option<u32>,
    max_height: Option<u32>,
    jpeg_quality: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
struct HistoryConfigFile {
    path: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub detection: DetectionSettings,
    pub sampling: SamplingSettings,
    pub snapshots: SnapshotSettings,
    pub history: HistorySettings,
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    /// Detections below this confidence are discarded before aggregation.
    pub confidence_threshold: f32,
    /// Registry name of the detector backend to run.
    pub backend: String,
}

#[derive(Debug, Clone)]
pub struct SamplingSettings {
    /// Process every Nth source frame.
    pub frame_stride: u64,
}

#[derive(Debug, Clone)]
pub struct SnapshotSettings {
    pub dir: String,
    /// Prefix of the web-servable snapshot paths in the report.
    pub web_prefix: String,
    /// Minimum source-frame distance between two snapshots.
    pub cooldown_frames: u64,
    pub max_width: u32,
    pub max_height: u32,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone)]
pub struct HistorySettings {
    /// `None` disables the local history file.
    pub path: Option<PathBuf>,
    pub limit: usize,
}

impl PipelineConfig {
    /// Load configuration: optional TOML file (`TRAILWATCH_CONFIG`), then
    /// `TRAILWATCH_*` environment overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("TRAILWATCH_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Same as `load`, with the config file path supplied by the caller
    /// (e.g. a `--config` flag) instead of the environment.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => PipelineConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PipelineConfigFile) -> Self {
        let detection = DetectionSettings {
            confidence_threshold: file
                .detection
                .as_ref()
                .and_then(|d| d.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            backend: file
                .detection
                .and_then(|d| d.backend)
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
        };
        let sampling = SamplingSettings {
            frame_stride: file
                .sampling
                .and_then(|s| s.frame_stride)
                .unwrap_or(DEFAULT_FRAME_STRIDE),
        };
        let snapshots = SnapshotSettings {
            dir: file
                .snapshots
                .as_ref()
                .and_then(|s| s.dir.clone())
                .unwrap_or_else(|| DEFAULT_SNAPSHOT_DIR.to_string()),
            web_prefix: file
                .snapshots
                .as_ref()
                .and_then(|s| s.web_prefix.clone())
                .unwrap_or_else(|| DEFAULT_WEB_PREFIX.to_string()),
            cooldown_frames: file
                .snapshots
                .as_ref()
                .and_then(|s| s.cooldown_frames)
                .unwrap_or(DEFAULT_COOLDOWN_FRAMES),
            max_width: file
                .snapshots
                .as_ref()
                .and_then(|s| s.max_width)
                .unwrap_or(DEFAULT_MAX_SNAPSHOT_WIDTH),
            max_height: file
                .snapshots
                .as_ref()
                .and_then(|s| s.max_height)
                .unwrap_or(DEFAULT_MAX_SNAPSHOT_HEIGHT),
            jpeg_quality: file
                .snapshots
                .as_ref()
                .and_then(|s| s.jpeg_quality)
                .unwrap_or(DEFAULT_JPEG_QUALITY),
        };
        let history = match file.history {
            Some(h) => HistorySettings {
                path: history_path(h.path.as_deref().unwrap_or(DEFAULT_HISTORY_PATH)),
                limit: h.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
            },
            None => HistorySettings {
                path: history_path(DEFAULT_HISTORY_PATH),
                limit: DEFAULT_HISTORY_LIMIT,
            },
        };
        Self {
            detection,
            sampling,
            snapshots,
            history,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(backend) = std::env::var("TRAILWATCH_BACKEND") {
            if !backend.trim().is_empty() {
                self.detection.backend = backend;
            }
        }
        if let Ok(threshold) = std::env::var("TRAILWATCH_CONFIDENCE") {
            self.detection.confidence_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("TRAILWATCH_CONFIDENCE must be a float in [0, 1]"))?;
        }
        if let Ok(stride) = std::env::var("TRAILWATCH_FRAME_STRIDE") {
            self.sampling.frame_stride = stride
                .parse()
                .map_err(|_| anyhow!("TRAILWATCH_FRAME_STRIDE must be a positive integer"))?;
        }
        if let Ok(dir) = std::env::var("TRAILWATCH_SNAPSHOTS_DIR") {
            if !dir.trim().is_empty() {
                self.snapshots.dir = dir;
            }
        }
        if let Ok(cooldown) = std::env::var("TRAILWATCH_COOLDOWN_FRAMES") {
            self.snapshots.cooldown_frames = cooldown
                .parse()
                .map_err(|_| anyhow!("TRAILWATCH_COOLDOWN_FRAMES must be an integer"))?;
        }
        if let Ok(path) = std::env::var("TRAILWATCH_HISTORY") {
            self.history.path = history_path(&path);
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detection.confidence_threshold) {
            return Err(anyhow!("confidence_threshold must be within [0, 1]"));
        }
        if self.detection.backend.trim().is_empty() {
            return Err(anyhow!("detection backend must not be empty"));
        }
        if self.sampling.frame_stride == 0 {
            return Err(anyhow!("frame_stride must be >= 1"));
        }
        if self.snapshots.cooldown_frames == 0 {
            return Err(anyhow!("cooldown_frames must be >= 1"));
        }
        if self.snapshots.max_width < 16 || self.snapshots.max_height < 16 {
            return Err(anyhow!("snapshot size cap must be at least 16x16"));
        }
        if !(1..=100).contains(&self.snapshots.jpeg_quality) {
            return Err(anyhow!("jpeg_quality must be within 1..=100"));
        }
        if self.history.limit == 0 {
            return Err(anyhow!("history limit must be >= 1"));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_file(PipelineConfigFile::default())
    }
}

/// An empty or "none" path disables the history file.
fn history_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

fn read_config_file(path: &Path) -> Result<PipelineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
