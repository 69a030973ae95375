//! Facial keypoint types shared by the detector boundary and the overlay pipeline.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// Facial feature that can carry an overlay sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// The subject's right eye (image left for a camera facing the subject)
    RightEye,
    /// The subject's left eye
    LeftEye,
    /// Nose tip
    Nose,
    /// Mouth center
    Mouth,
}

impl Feature {
    /// All features in drawing order
    pub const ALL: [Feature; 4] = [Feature::RightEye, Feature::LeftEye, Feature::Nose, Feature::Mouth];

    /// Name used in asset files and commands
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RightEye => "right_eye",
            Self::LeftEye => "left_eye",
            Self::Nose => "nose",
            Self::Mouth => "mouth",
        }
    }

    /// Whether this is one of the two eyes
    #[must_use]
    pub fn is_eye(self) -> bool {
        matches!(self, Self::RightEye | Self::LeftEye)
    }

    /// The other eye, if this is an eye
    #[must_use]
    pub fn opposite_eye(self) -> Option<Feature> {
        match self {
            Self::RightEye => Some(Self::LeftEye),
            Self::LeftEye => Some(Self::RightEye),
            Self::Nose | Self::Mouth => None,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "right_eye" => Ok(Self::RightEye),
            "left_eye" => Ok(Self::LeftEye),
            "nose" => Ok(Self::Nose),
            "mouth" => Ok(Self::Mouth),
            other => Err(Error::InvalidInput(format!("Unknown feature: {other}"))),
        }
    }
}

/// 2D coordinate, in pixels unless stated otherwise
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate, growing downwards
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint between two points
    #[must_use]
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Face bounding box in coordinates relative to the frame (0.0-1.0)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One face as reported by the detector, in frame-relative coordinates
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedDetection {
    /// Face bounding box
    pub bbox: NormalizedBox,
    /// Named keypoints; features the detector could not place are absent
    pub keypoints: BTreeMap<Feature, Point>,
    /// Detector confidence
    pub score: f32,
}

/// Pixel keypoints and face box size for one frame
///
/// Produced fresh for every detection and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeypointSet {
    points: BTreeMap<Feature, Point>,
    bbox_width: f64,
    bbox_height: f64,
}

impl KeypointSet {
    /// Build a keypoint set from pixel coordinates; non-finite points are dropped
    #[must_use]
    pub fn new(points: BTreeMap<Feature, Point>, bbox_width: f64, bbox_height: f64) -> Self {
        let points = points.into_iter().filter(|(_, p)| p.is_finite()).collect();
        Self {
            points,
            bbox_width: sanitize_extent(bbox_width),
            bbox_height: sanitize_extent(bbox_height),
        }
    }

    /// Convert a normalized detection into pixel coordinates of a `width` x `height` frame
    #[must_use]
    pub fn from_detection(detection: &NormalizedDetection, width: u32, height: u32) -> Self {
        let (w, h) = (f64::from(width), f64::from(height));
        let points = detection
            .keypoints
            .iter()
            .map(|(&feature, p)| (feature, Point::new(p.x * w, p.y * h)))
            .collect();
        Self::new(points, detection.bbox.width * w, detection.bbox.height * h)
    }

    /// Pixel position of a feature, if detected
    #[must_use]
    pub fn get(&self, feature: Feature) -> Option<Point> {
        self.points.get(&feature).copied()
    }

    /// Iterate over detected features and their positions
    pub fn iter(&self) -> impl Iterator<Item = (Feature, Point)> + '_ {
        self.points.iter().map(|(&f, &p)| (f, p))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Face bounding-box width in pixels
    #[must_use]
    pub fn bbox_width(&self) -> f64 {
        self.bbox_width
    }

    /// Face bounding-box height in pixels
    #[must_use]
    pub fn bbox_height(&self) -> f64 {
        self.bbox_height
    }
}

fn sanitize_extent(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
