//! Configuration management for the face overlay application
//!
//! Two layers live here:
//! - [`OverlayConfig`]: the live, slider-driven overlay settings. Every write
//!   goes through a clamping setter and, at runtime, through the single
//!   [`ConfigStore`] write path.
//! - [`Settings`]: the optional YAML file read at startup.

use crate::constants::{
    DEFAULT_ASSET_ROOT, DEFAULT_EYE_ADJUSTMENT_RATIO, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH,
    DEFAULT_MODEL_PATH, DEFAULT_NOSE_OFFSET, DEFAULT_SMOOTHING_FILTER,
    EYE_ADJUSTMENT_RATIO_MAX, EYE_ADJUSTMENT_RATIO_MIN, EYE_SPACING_MAX, EYE_SPACING_MIN,
    FRAME_SCALE_RATIO, FRAME_UPDATE_INTERVAL_MS, MIN_DETECTION_CONFIDENCE, OFFSET_MAX, OFFSET_MIN,
    SIZE_PERCENT_DEFAULT, SIZE_PERCENT_MAX, SIZE_PERCENT_MIN,
};
use crate::keypoints::Feature;
use crate::shared::{Snapshot, Versioned};
use crate::utils::safe_cast::f64_to_i32_clamp;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Runtime overlay configuration, shared between UI and pipeline
pub type ConfigStore = Versioned<OverlayConfig>;

/// Configuration as seen by one pipeline tick
pub type ConfigSnapshot = Snapshot<OverlayConfig>;

/// Pixel offset applied to a feature after smoothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

impl Offset {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Per-feature overlay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Size multiplier per feature, in percent
    sizes: BTreeMap<Feature, f64>,
    /// Pixel offset per feature
    offsets: BTreeMap<Feature, Offset>,
    /// Fraction of the face box width added to the eye gap
    eye_adjustment_ratio: f64,
    /// Additional eye gap in pixels
    eye_spacing: f64,
    /// Feature visibility
    enabled: BTreeMap<Feature, bool>,
    /// Use the eyebrow variant of the eye sprites
    eyebrows: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            sizes: Feature::ALL.iter().map(|&f| (f, SIZE_PERCENT_DEFAULT)).collect(),
            offsets: Feature::ALL.iter().map(|&f| (f, default_offset(f))).collect(),
            eye_adjustment_ratio: DEFAULT_EYE_ADJUSTMENT_RATIO,
            eye_spacing: 0.0,
            enabled: Feature::ALL.iter().map(|&f| (f, true)).collect(),
            eyebrows: false,
        }
    }
}

fn default_offset(feature: Feature) -> Offset {
    match feature {
        Feature::Nose => Offset::new(DEFAULT_NOSE_OFFSET.0, DEFAULT_NOSE_OFFSET.1),
        _ => Offset::default(),
    }
}

/// Clamp a float into `[min, max]`; NaN yields `None`
fn clamp_f64(value: f64, min: f64, max: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(min, max))
    }
}

fn clamp_offset(value: i32) -> i32 {
    value.clamp(OFFSET_MIN, OFFSET_MAX)
}

impl OverlayConfig {
    /// Size multiplier of a feature in percent
    #[must_use]
    pub fn size_percent(&self, feature: Feature) -> f64 {
        self.sizes.get(&feature).copied().unwrap_or(SIZE_PERCENT_DEFAULT)
    }

    /// Pixel offset of a feature
    #[must_use]
    pub fn offset(&self, feature: Feature) -> Offset {
        self.offsets.get(&feature).copied().unwrap_or_else(|| default_offset(feature))
    }

    #[must_use]
    pub fn eye_adjustment_ratio(&self) -> f64 {
        self.eye_adjustment_ratio
    }

    #[must_use]
    pub fn eye_spacing(&self) -> f64 {
        self.eye_spacing
    }

    /// Whether the feature's overlay is drawn
    #[must_use]
    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.enabled.get(&feature).copied().unwrap_or(true)
    }

    #[must_use]
    pub fn eyebrows(&self) -> bool {
        self.eyebrows
    }

    /// Set the size multiplier, clamped to [1, 400] percent
    pub fn set_size_percent(&mut self, feature: Feature, percent: f64) {
        if let Some(value) = clamp_f64(percent, SIZE_PERCENT_MIN, SIZE_PERCENT_MAX) {
            self.sizes.insert(feature, value);
        }
    }

    /// Set the horizontal offset, clamped to [-100, 100]
    pub fn set_offset_x(&mut self, feature: Feature, x: i32) {
        let current = self.offset(feature);
        self.offsets.insert(feature, Offset::new(clamp_offset(x), current.y));
    }

    /// Set the vertical offset, clamped to [-100, 100]
    pub fn set_offset_y(&mut self, feature: Feature, y: i32) {
        let current = self.offset(feature);
        self.offsets.insert(feature, Offset::new(current.x, clamp_offset(y)));
    }

    /// Set both offset components, each clamped to [-100, 100]
    pub fn set_offset(&mut self, feature: Feature, offset: Offset) {
        self.offsets
            .insert(feature, Offset::new(clamp_offset(offset.x), clamp_offset(offset.y)));
    }

    /// Set the additive eye spacing, clamped to [-20, 20] pixels
    pub fn set_eye_spacing(&mut self, spacing: f64) {
        if let Some(value) = clamp_f64(spacing, EYE_SPACING_MIN, EYE_SPACING_MAX) {
            self.eye_spacing = value;
        }
    }

    /// Set the eye gap ratio, clamped to [0, 1]
    pub fn set_eye_adjustment_ratio(&mut self, ratio: f64) {
        if let Some(value) = clamp_f64(ratio, EYE_ADJUSTMENT_RATIO_MIN, EYE_ADJUSTMENT_RATIO_MAX) {
            self.eye_adjustment_ratio = value;
        }
    }

    pub fn set_enabled(&mut self, feature: Feature, enabled: bool) {
        self.enabled.insert(feature, enabled);
    }

    pub fn set_eyebrows(&mut self, eyebrows: bool) {
        self.eyebrows = eyebrows;
    }

    /// Apply one slider movement
    ///
    /// Out-of-range values are clamped and non-finite values are ignored.
    /// The eye group writes both eyes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for `spacing` outside the eye group
    pub fn apply_slider(&mut self, group: FeatureGroup, kind: SliderKind, value: f64) -> Result<()> {
        if kind == SliderKind::Spacing && group != FeatureGroup::Eye {
            return Err(Error::InvalidInput(format!(
                "The spacing slider only exists for the eye group, not {group}"
            )));
        }
        if !value.is_finite() {
            log::debug!("Ignoring non-finite {kind} value for {group}");
            return Ok(());
        }

        let pixels = f64_to_i32_clamp(value.round(), OFFSET_MIN, OFFSET_MAX);
        match kind {
            SliderKind::Size => {
                for &feature in group.features() {
                    self.set_size_percent(feature, value);
                }
            }
            SliderKind::OffsetX => {
                for &feature in group.features() {
                    self.set_offset_x(feature, pixels);
                }
            }
            SliderKind::OffsetY => {
                for &feature in group.features() {
                    self.set_offset_y(feature, pixels);
                }
            }
            SliderKind::Spacing => self.set_eye_spacing(value),
        }
        Ok(())
    }

    /// Fill in missing features and clamp every value into its range
    #[must_use]
    pub fn normalized(self) -> Self {
        let mut out = Self::default();
        for feature in Feature::ALL {
            out.set_size_percent(feature, self.size_percent(feature));
            out.set_offset(feature, self.offset(feature));
            out.set_enabled(feature, self.is_enabled(feature));
        }
        out.set_eye_adjustment_ratio(self.eye_adjustment_ratio);
        out.set_eye_spacing(self.eye_spacing);
        out.set_eyebrows(self.eyebrows);
        out
    }
}

/// Slider group as laid out in the control panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureGroup {
    /// Both eyes
    Eye,
    Nose,
    Mouth,
}

impl FeatureGroup {
    /// Features written by this group's sliders
    #[must_use]
    pub fn features(self) -> &'static [Feature] {
        match self {
            Self::Eye => &[Feature::RightEye, Feature::LeftEye],
            Self::Nose => &[Feature::Nose],
            Self::Mouth => &[Feature::Mouth],
        }
    }
}

impl fmt::Display for FeatureGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eye => "eye",
            Self::Nose => "nose",
            Self::Mouth => "mouth",
        })
    }
}

impl FromStr for FeatureGroup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "eye" | "eyes" => Ok(Self::Eye),
            "nose" => Ok(Self::Nose),
            "mouth" => Ok(Self::Mouth),
            other => Err(Error::InvalidInput(format!("Unknown feature group: {other}"))),
        }
    }
}

/// What a slider controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderKind {
    Size,
    OffsetX,
    OffsetY,
    Spacing,
}

impl fmt::Display for SliderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Size => "size",
            Self::OffsetX => "offset-x",
            Self::OffsetY => "offset-y",
            Self::Spacing => "spacing",
        })
    }
}

impl FromStr for SliderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "size" => Ok(Self::Size),
            "offset-x" | "x" => Ok(Self::OffsetX),
            "offset-y" | "y" => Ok(Self::OffsetY),
            "spacing" => Ok(Self::Spacing),
            other => Err(Error::InvalidInput(format!("Unknown slider: {other}"))),
        }
    }
}

/// Size frames are resized to before detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameSize {
    fn default() -> Self {
        Self {
            width: scaled_dimension(DEFAULT_FRAME_WIDTH),
            height: scaled_dimension(DEFAULT_FRAME_HEIGHT),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // small positive constants
fn scaled_dimension(base: u32) -> u32 {
    (f64::from(base) * FRAME_SCALE_RATIO).round() as u32
}

/// Application settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Overlay asset locations
    pub assets: AssetSettings,

    /// Capture source and frame processing
    pub video: VideoSettings,

    /// Face detector parameters
    pub detection: DetectionSettings,

    /// Keypoint smoothing
    pub smoothing: SmoothingSettings,

    /// Initial overlay configuration
    pub overlay: OverlayConfig,
}

/// Overlay asset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory holding one sub-directory per identity
    pub root: PathBuf,

    /// Identity loaded at startup
    pub default_identity: Option<String>,
}

/// Video source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// Camera device index
    pub camera_index: i32,

    /// Video file used instead of the camera when set
    pub file: Option<PathBuf>,

    /// Processing frame size
    pub frame_size: FrameSize,

    /// Pause between ticks in milliseconds
    pub tick_interval_ms: u64,
}

/// Face detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Path to the SCRFD ONNX model
    pub model: PathBuf,

    /// Confidence threshold for face detection (0.0-1.0)
    pub confidence_threshold: f32,
}

/// Keypoint smoothing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingSettings {
    /// Filter description, e.g. `exponential:0.3` or `none`
    pub filter: String,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ASSET_ROOT),
            default_identity: None,
        }
    }
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            camera_index: 0,
            file: None,
            frame_size: FrameSize::default(),
            tick_interval_ms: FRAME_UPDATE_INTERVAL_MS,
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            model: PathBuf::from(DEFAULT_MODEL_PATH),
            confidence_threshold: MIN_DETECTION_CONFIDENCE,
        }
    }
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_SMOOTHING_FILTER.to_string(),
        }
    }
}

impl VideoSettings {
    /// Pause between pipeline ticks
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Settings {
    /// Load settings from a YAML file
    ///
    /// Overlay values outside their ranges are clamped rather than rejected.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse settings from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut settings: Self = serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        settings.overlay = settings.overlay.normalized();
        Ok(settings)
    }

    /// Save settings to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detection.confidence_threshold) {
            return Err(Error::ConfigError(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.video.frame_size.width == 0 || self.video.frame_size.height == 0 {
            return Err(Error::ConfigError("Frame size must be greater than 0".to_string()));
        }
        if self.video.tick_interval_ms == 0 {
            return Err(Error::ConfigError(
                "Tick interval must be greater than 0".to_string(),
            ));
        }
        if self.video.camera_index < 0 {
            return Err(Error::ConfigError("Camera index must not be negative".to_string()));
        }

        crate::filters::create_filter(&self.smoothing.filter)
            .map_err(|e| Error::ConfigError(format!("Invalid smoothing filter: {e}")))?;

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Face Overlay Configuration

assets:
  root: "media/human_face"
  default_identity: null

video:
  camera_index: 0
  file: null
  frame_size:
    width: 704
    height: 704
  tick_interval_ms: 10

detection:
  model: "assets/face_detector.onnx"
  confidence_threshold: 0.2

smoothing:
  filter: "exponential:0.3"

overlay:
  sizes:
    right_eye: 100.0
    left_eye: 100.0
    nose: 100.0
    mouth: 100.0
  offsets:
    nose:
      x: 0
      y: -20
  eye_adjustment_ratio: 0.1
  eye_spacing: 0.0
  eyebrows: false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OverlayConfig::default();
        for feature in Feature::ALL {
            assert_eq!(config.size_percent(feature), 100.0);
            assert!(config.is_enabled(feature));
        }
        assert_eq!(config.offset(Feature::Nose), Offset::new(0, -20));
        assert_eq!(config.offset(Feature::Mouth), Offset::new(0, 0));
        assert_eq!(config.eye_adjustment_ratio(), 0.1);
        assert_eq!(config.eye_spacing(), 0.0);
        assert!(!config.eyebrows());
    }

    #[test]
    fn test_out_of_range_writes_are_clamped() {
        let mut config = OverlayConfig::default();
        config.set_size_percent(Feature::Nose, 1000.0);
        assert_eq!(config.size_percent(Feature::Nose), 400.0);
        config.set_size_percent(Feature::Nose, -3.0);
        assert_eq!(config.size_percent(Feature::Nose), 1.0);
        config.set_size_percent(Feature::Nose, f64::NAN);
        assert_eq!(config.size_percent(Feature::Nose), 1.0);

        config.set_offset_x(Feature::Mouth, 250);
        config.set_offset_y(Feature::Mouth, -250);
        assert_eq!(config.offset(Feature::Mouth), Offset::new(100, -100));

        config.set_eye_spacing(99.0);
        assert_eq!(config.eye_spacing(), 20.0);
        config.set_eye_adjustment_ratio(-1.0);
        assert_eq!(config.eye_adjustment_ratio(), 0.0);
    }

    #[test]
    fn test_eye_slider_writes_both_eyes() {
        let mut config = OverlayConfig::default();
        config.apply_slider(FeatureGroup::Eye, SliderKind::Size, 150.0).unwrap();
        config.apply_slider(FeatureGroup::Eye, SliderKind::OffsetY, 7.4).unwrap();
        assert_eq!(config.size_percent(Feature::RightEye), 150.0);
        assert_eq!(config.size_percent(Feature::LeftEye), 150.0);
        assert_eq!(config.offset(Feature::LeftEye), Offset::new(0, 7));
        assert_eq!(config.size_percent(Feature::Nose), 100.0);
    }

    #[test]
    fn test_spacing_only_for_eyes() {
        let mut config = OverlayConfig::default();
        assert!(config.apply_slider(FeatureGroup::Eye, SliderKind::Spacing, -30.0).is_ok());
        assert_eq!(config.eye_spacing(), -20.0);
        assert!(config.apply_slider(FeatureGroup::Mouth, SliderKind::Spacing, 5.0).is_err());
    }

    #[test]
    fn test_non_finite_slider_values_are_ignored() {
        let mut config = OverlayConfig::default();
        config.apply_slider(FeatureGroup::Nose, SliderKind::Size, 150.0).unwrap();
        config.apply_slider(FeatureGroup::Nose, SliderKind::OffsetX, 12.0).unwrap();
        let before = config.clone();

        for kind in [SliderKind::Size, SliderKind::OffsetX, SliderKind::OffsetY] {
            config.apply_slider(FeatureGroup::Nose, kind, f64::NAN).unwrap();
            config.apply_slider(FeatureGroup::Nose, kind, f64::INFINITY).unwrap();
        }
        config.apply_slider(FeatureGroup::Eye, SliderKind::Spacing, f64::NAN).unwrap();

        assert_eq!(config, before);
        assert_eq!(config.offset(Feature::Nose), Offset::new(12, -20));
        assert!(config.apply_slider(FeatureGroup::Nose, SliderKind::Spacing, f64::NAN).is_err());
    }

    #[test]
    fn test_slider_names() {
        assert_eq!("offset_x".parse::<SliderKind>().unwrap(), SliderKind::OffsetX);
        assert_eq!("Offset-Y".parse::<SliderKind>().unwrap(), SliderKind::OffsetY);
        assert_eq!("eyes".parse::<FeatureGroup>().unwrap(), FeatureGroup::Eye);
        assert!("brightness".parse::<SliderKind>().is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let settings = Settings::from_yaml(EXAMPLE_CONFIG).unwrap();
        settings.validate().unwrap();
        assert_eq!(settings.video.frame_size, FrameSize { width: 704, height: 704 });
        assert_eq!(settings.overlay, OverlayConfig::default());
    }

    #[test]
    fn test_partial_overlay_is_normalized() {
        let yaml = "overlay:\n  sizes:\n    nose: 900.0\n  eye_spacing: -50.0\n";
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.overlay.size_percent(Feature::Nose), 400.0);
        assert_eq!(settings.overlay.size_percent(Feature::Mouth), 100.0);
        assert_eq!(settings.overlay.offset(Feature::Nose), Offset::new(0, -20));
        assert_eq!(settings.overlay.eye_spacing(), -20.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.detection.confidence_threshold = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.smoothing.filter = "exponential:2".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.video.tick_interval_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_default_frame_size() {
        assert_eq!(FrameSize::default(), FrameSize { width: 704, height: 704 });
    }
}
