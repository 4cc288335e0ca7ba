//! Configuration types for the game
//!
//! Every tunable of the motion detector, tracker, phase timing and face
//! bookkeeping lives here. Configurations are loaded from TOML files; any
//! missing field falls back to its default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::vision::BoundingBox;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete game configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub roi: RoiConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub faces: FaceConfig,
}

/// Size of the frames delivered by the frame source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameConfig {
    #[serde(default = "default_frame_width")]
    pub width: u32,
    #[serde(default = "default_frame_height")]
    pub height: u32,
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    480
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: default_frame_width(),
            height: default_frame_height(),
        }
    }
}

/// Rectangular region of interest, in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiConfig {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for RoiConfig {
    /// Central 80% of a 640x480 frame
    fn default() -> Self {
        Self {
            x: 64,
            y: 48,
            width: 512,
            height: 384,
        }
    }
}

impl RoiConfig {
    /// The region as a bounding box
    pub fn to_box(&self) -> BoundingBox {
        BoundingBox::new(
            clamp_i32(self.x),
            clamp_i32(self.y),
            clamp_i32(self.width),
            clamp_i32(self.height),
        )
    }
}

fn clamp_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Background subtraction and box extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Background learning rate
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    /// Gaussian blur sigma (1.1 matches a 5x5 kernel)
    #[serde(default = "default_blur_sigma")]
    pub blur_sigma: f32,
    /// Differences strictly above this count as motion
    #[serde(default = "default_diff_threshold")]
    pub diff_threshold: u8,
    /// Dilation radius with a square structuring element
    #[serde(default = "default_dilate_radius")]
    pub dilate_radius: u8,
    /// Contours with an area at or below this are noise
    #[serde(default = "default_min_area")]
    pub min_area: f64,
    /// Boxes overlapping an accepted box by more than this IoU are dropped
    #[serde(default = "default_overlap_iou")]
    pub overlap_iou: f32,
}

fn default_alpha() -> f32 {
    0.05
}

fn default_blur_sigma() -> f32 {
    1.1
}

fn default_diff_threshold() -> u8 {
    25
}

fn default_dilate_radius() -> u8 {
    2
}

fn default_min_area() -> f64 {
    2000.0
}

fn default_overlap_iou() -> f32 {
    0.3
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            blur_sigma: default_blur_sigma(),
            diff_threshold: default_diff_threshold(),
            dilate_radius: default_dilate_radius(),
            min_area: default_min_area(),
            overlap_iou: default_overlap_iou(),
        }
    }
}

/// Player association parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f32,
    /// Multiplier applied to `distance_threshold` when matching
    #[serde(default = "default_match_radius_factor")]
    pub match_radius_factor: f32,
    /// How long an eliminated player stays in the roster
    #[serde(default = "default_grace_secs")]
    pub grace_secs: f64,
}

fn default_distance_threshold() -> f32 {
    50.0
}

fn default_match_radius_factor() -> f32 {
    1.5
}

fn default_grace_secs() -> f64 {
    3.0
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            distance_threshold: default_distance_threshold(),
            match_radius_factor: default_match_radius_factor(),
            grace_secs: default_grace_secs(),
        }
    }
}

impl TrackerConfig {
    /// Centers strictly closer than this belong to the same player
    pub fn match_radius(&self) -> f32 {
        self.distance_threshold * self.match_radius_factor
    }

    pub fn grace(&self) -> Duration {
        secs(self.grace_secs)
    }
}

/// How long a green light lasts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GreenTiming {
    Fixed { secs: f64 },
    /// Uniform in `[min_secs, min_secs + range_secs)`
    Random { min_secs: f64, range_secs: f64 },
}

impl Default for GreenTiming {
    fn default() -> Self {
        GreenTiming::Random {
            min_secs: 3.0,
            range_secs: 4.0,
        }
    }
}

/// Phase durations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_red_secs")]
    pub red_secs: f64,
    #[serde(default)]
    pub green: GreenTiming,
    /// Start in the face-capture phase instead of green light
    #[serde(default)]
    pub read_faces: bool,
}

fn default_red_secs() -> f64 {
    5.0
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            red_secs: default_red_secs(),
            green: GreenTiming::default(),
            read_faces: false,
        }
    }
}

impl TimingConfig {
    pub fn red(&self) -> Duration {
        secs(self.red_secs)
    }
}

/// Face filter parameters for the face-capture variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceConfig {
    /// Side length faces are resized to before comparison
    #[serde(default = "default_face_size")]
    pub size: u32,
    /// Mean absolute difference above which a face counts as moving
    #[serde(default = "default_movement_threshold")]
    pub movement_threshold: f32,
    /// Consecutive moving frames before a player is flagged
    #[serde(default = "default_moving_frames")]
    pub moving_frames: u32,
    /// Apparent face size (pixels) that wins the game
    #[serde(default = "default_win_face_size")]
    pub win_face_size: u32,
}

fn default_face_size() -> u32 {
    100
}

fn default_movement_threshold() -> f32 {
    90.0
}

fn default_moving_frames() -> u32 {
    3
}

fn default_win_face_size() -> u32 {
    200
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            size: default_face_size(),
            movement_threshold: default_movement_threshold(),
            moving_frames: default_moving_frames(),
            win_face_size: default_win_face_size(),
        }
    }
}

/// Seconds to a duration; negative or non-finite values become zero
pub(crate) fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must be a non-negative number of seconds, got {}",
            name, value
        )))
    }
}

impl GameConfig {
    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load a configuration, falling back to defaults if it is missing or broken
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Check value ranges and that the region of interest fits in the frame
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(ConfigError::Invalid("frame size must be non-zero".into()));
        }

        let roi = &self.roi;
        if roi.width == 0 || roi.height == 0 {
            return Err(ConfigError::Invalid("region of interest is empty".into()));
        }
        if u64::from(roi.x) + u64::from(roi.width) > u64::from(self.frame.width)
            || u64::from(roi.y) + u64::from(roi.height) > u64::from(self.frame.height)
        {
            return Err(ConfigError::Invalid(format!(
                "region of interest {}x{}+{}+{} exceeds the {}x{} frame",
                roi.width, roi.height, roi.x, roi.y, self.frame.width, self.frame.height
            )));
        }

        if !(self.motion.alpha > 0.0 && self.motion.alpha <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "motion.alpha must be in (0, 1], got {}",
                self.motion.alpha
            )));
        }
        if !(self.motion.blur_sigma > 0.0) {
            return Err(ConfigError::Invalid("motion.blur_sigma must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.motion.overlap_iou) {
            return Err(ConfigError::Invalid("motion.overlap_iou must be in [0, 1]".into()));
        }

        if !(self.tracker.distance_threshold >= 0.0 && self.tracker.match_radius_factor >= 0.0) {
            return Err(ConfigError::Invalid("tracker distances must be non-negative".into()));
        }
        non_negative("tracker.grace_secs", self.tracker.grace_secs)?;

        non_negative("timing.red_secs", self.timing.red_secs)?;
        match self.timing.green {
            GreenTiming::Fixed { secs } => non_negative("timing.green.secs", secs)?,
            GreenTiming::Random {
                min_secs,
                range_secs,
            } => {
                non_negative("timing.green.min_secs", min_secs)?;
                non_negative("timing.green.range_secs", range_secs)?;
            }
        }

        if self.faces.size == 0 {
            return Err(ConfigError::Invalid("faces.size must be non-zero".into()));
        }

        Ok(())
    }
}
