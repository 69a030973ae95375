//! Constants used throughout the application

/// Weight of a new keypoint observation in exponential smoothing
pub const SMOOTHING_FACTOR: f64 = 0.3;

/// Face bounding-box height (pixels) at which sprites render at native size
pub const BASE_SCALE_FACTOR: f64 = 400.0;

/// Overlay size slider bounds, in percent
pub const SIZE_PERCENT_MIN: f64 = 1.0;
pub const SIZE_PERCENT_MAX: f64 = 400.0;
pub const SIZE_PERCENT_DEFAULT: f64 = 100.0;

/// Overlay offset slider bounds, in pixels
pub const OFFSET_MIN: i32 = -100;
pub const OFFSET_MAX: i32 = 100;

/// Nose sprites sit slightly off the detected nose tip by default
pub const DEFAULT_NOSE_OFFSET: (i32, i32) = (0, -20);

/// Additive eye spacing slider bounds, in pixels
pub const EYE_SPACING_MIN: f64 = -20.0;
pub const EYE_SPACING_MAX: f64 = 20.0;

/// Fraction of the face box width added to the gap between the eyes
pub const DEFAULT_EYE_ADJUSTMENT_RATIO: f64 = 0.1;
pub const EYE_ADJUSTMENT_RATIO_MIN: f64 = 0.0;
pub const EYE_ADJUSTMENT_RATIO_MAX: f64 = 1.0;

/// Smallest scale a sprite is ever rendered at
pub const MIN_SPRITE_SCALE: f64 = 0.01;

/// Upper bound on the pixel count of a transformed sprite
pub const MAX_TRANSFORMED_PIXELS: u64 = 4096 * 4096;

/// Pause between pipeline ticks
pub const FRAME_UPDATE_INTERVAL_MS: u64 = 10;

/// Detections below this score are discarded by the detector
pub const MIN_DETECTION_CONFIDENCE: f32 = 0.2;

/// Nominal frame size, enlarged by `FRAME_SCALE_RATIO` for processing
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 640;
pub const FRAME_SCALE_RATIO: f64 = 1.1;

/// Video file extensions accepted as capture sources
pub const SUPPORTED_VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

/// Display window title
pub const WINDOW_TITLE: &str = "Face Overlay";

/// Default locations
pub const DEFAULT_ASSET_ROOT: &str = "media/human_face";
pub const DEFAULT_LOG_FILE: &str = "logs/face-overlay.log";
pub const DEFAULT_MODEL_PATH: &str = "assets/face_detector.onnx";

/// Default smoothing filter description, see [`crate::filters::create_filter`]
pub const DEFAULT_SMOOTHING_FILTER: &str = "exponential:0.3";

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-9;
