//! Real-time face overlay library.
//!
//! Small transparent sprites (eyes, nose, mouth) are drawn onto a live video
//! stream, following the keypoints of a tracked face.
//!
//! The per-frame pipeline consists of:
//! 1. Face detection (an external collaborator behind [`pipeline::FaceDetector`])
//! 2. Exponential smoothing of the keypoints and roll-angle estimation
//! 3. Per-feature placement: position, offset, eye gap and scale
//! 4. Resizing and rotating each sprite together with its alpha mask
//! 5. Alpha blending onto the frame, clipped at the frame borders
//!
//! # Examples
//!
//! ## Compositing one frame
//!
//! ```no_run
//! use face_overlay::{
//!     compositor::Frame,
//!     config::ConfigStore,
//!     geometry::FeatureGeometry,
//!     keypoints::{Feature, KeypointSet, Point},
//!     overlay::OverlayRegistry,
//! };
//! use std::collections::BTreeMap;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigStore::default();
//! let registry = OverlayRegistry::new("media/human_face", config.clone());
//! registry.load_overlays("kim")?;
//!
//! let mut geometry = FeatureGeometry::new()?;
//! let points = BTreeMap::from([
//!     (Feature::RightEye, Point::new(300.0, 320.0)),
//!     (Feature::LeftEye, Point::new(400.0, 320.0)),
//!     (Feature::Nose, Point::new(350.0, 380.0)),
//! ]);
//! let keypoints = KeypointSet::new(points, 220.0, 260.0);
//!
//! let snapshot = config.snapshot();
//! let placements = geometry.compute_from_keypoints(&keypoints, &snapshot);
//! let mut frame = Frame::new(704, 704);
//! let drawn = registry.apply_overlays(&mut frame, &placements, &snapshot)?;
//! println!("{drawn} overlays drawn");
//! # Ok(())
//! # }
//! ```
//!
//! ## Smoothing keypoints
//!
//! ```
//! use face_overlay::keypoints::{Feature, KeypointSet, Point};
//! use face_overlay::smoothing::PositionSmoother;
//! use std::collections::BTreeMap;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut smoother = PositionSmoother::new()?;
//! let frame = |x: f64| KeypointSet::new(BTreeMap::from([(Feature::Nose, Point::new(x, 100.0))]), 200.0, 200.0);
//!
//! smoother.update(&frame(100.0));
//! let positions = smoother.update(&frame(110.0));
//! assert!((positions[&Feature::Nose].x - 103.0).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```

/// UI-event dispatch boundary
pub mod app;

/// Alpha compositing onto frames
pub mod compositor;

/// Configuration management
pub mod config;

/// Text command console standing in for the control panel
pub mod console;

/// Constants used throughout the application
pub mod constants;

/// SCRFD face detector on ONNX Runtime
#[cfg(feature = "vision")]
pub mod detection;

/// Error types and result handling
pub mod error;

/// Point filters used by the smoother
pub mod filters;

/// Per-feature placement computation
pub mod geometry;

/// Facial features, points and detections
pub mod keypoints;

/// Overlay sprite registry
pub mod overlay;

/// Capture session and per-tick frame pipeline
pub mod pipeline;

/// Versioned values shared across threads
pub mod shared;

/// Keypoint smoothing and roll angle
pub mod smoothing;

/// Overlay sprites
pub mod sprite;

/// Sprite resize and rotation
pub mod transform;

/// Utility functions for numeric casts and image conversion
pub mod utils;

/// `OpenCV` camera, video file and window backend
#[cfg(feature = "vision")]
pub mod vision;

pub use error::{Error, Notification, Result};
