//! Feature geometry: turn a detection into per-feature overlay placements.
//!
//! Positions are smoothed first, then the eye gap adjustment and the
//! configured pixel offsets are applied on top. Offsets are never smoothed,
//! so moving a slider takes effect on the next frame without lag.

use crate::config::OverlayConfig;
use crate::constants::BASE_SCALE_FACTOR;
use crate::keypoints::{Feature, KeypointSet, NormalizedDetection, Point};
use crate::smoothing::{PositionSmoother, SmoothedPositions};
use crate::Result;
use std::collections::BTreeMap;

/// Where and how to draw one feature's sprite this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Frame coordinate of the sprite center
    pub position: Point,
    /// Resize factor relative to the sprite's native size
    pub scale: f64,
    /// Roll angle in degrees, counter-clockwise, shared by all features
    pub angle: f64,
}

/// Placements for the features detected this frame
pub type Placements = BTreeMap<Feature, Placement>;

/// Effective sprite scale for a size percentage and detected face height
#[must_use]
pub fn effective_scale(size_percent: f64, bbox_height: f64) -> f64 {
    size_percent / 100.0 * (bbox_height / BASE_SCALE_FACTOR)
}

#[derive(Debug)]
pub struct FeatureGeometry {
    smoother: PositionSmoother,
}

impl FeatureGeometry {
    /// Geometry engine with the default exponential smoother
    ///
    /// # Errors
    ///
    /// Propagates smoother construction errors
    pub fn new() -> Result<Self> {
        Ok(Self::with_smoother(PositionSmoother::new()?))
    }

    #[must_use]
    pub fn with_smoother(smoother: PositionSmoother) -> Self {
        Self { smoother }
    }

    /// Placements for a detection expressed in frame-relative coordinates
    pub fn compute_positions(
        &mut self,
        detection: &NormalizedDetection,
        frame_width: u32,
        frame_height: u32,
        config: &OverlayConfig,
    ) -> Placements {
        let keypoints = KeypointSet::from_detection(detection, frame_width, frame_height);
        self.compute_from_keypoints(&keypoints, config)
    }

    /// Placements for pixel-space keypoints
    ///
    /// Features missing from `keypoints` are left out of the result even if
    /// the smoother still remembers them.
    pub fn compute_from_keypoints(&mut self, keypoints: &KeypointSet, config: &OverlayConfig) -> Placements {
        let smoothed = self.smoother.update(keypoints);
        let angle = PositionSmoother::calculate_angle(&smoothed);

        let mut positions: SmoothedPositions = smoothed
            .into_iter()
            .filter(|(feature, _)| keypoints.get(*feature).is_some())
            .collect();
        adjust_eye_gap(&mut positions, keypoints.bbox_width(), config);

        positions
            .into_iter()
            .map(|(feature, position)| {
                let offset = config.offset(feature);
                let placement = Placement {
                    position: position + Point::new(f64::from(offset.x), f64::from(offset.y)),
                    scale: effective_scale(config.size_percent(feature), keypoints.bbox_height()),
                    angle,
                };
                (feature, placement)
            })
            .collect()
    }

    /// Smoother state, for inspection
    #[must_use]
    pub fn smoother(&self) -> &PositionSmoother {
        &self.smoother
    }

    /// Drop all smoothing history (identity switch or new session)
    pub fn reset(&mut self) {
        self.smoother.clear();
    }
}

/// Push both eyes symmetrically apart (positive) or together (negative)
fn adjust_eye_gap(positions: &mut SmoothedPositions, bbox_width: f64, config: &OverlayConfig) {
    let half_gap = (config.eye_adjustment_ratio() * bbox_width + config.eye_spacing()) / 2.0;
    if half_gap == 0.0 {
        return;
    }

    // The subject's right eye normally appears on the image's left side
    let right_direction = match (positions.get(&Feature::RightEye), positions.get(&Feature::LeftEye)) {
        (Some(right), Some(left)) if right.x > left.x => 1.0,
        _ => -1.0,
    };

    if let Some(right) = positions.get_mut(&Feature::RightEye) {
        right.x += right_direction * half_gap;
    }
    if let Some(left) = positions.get_mut(&Feature::LeftEye) {
        left.x -= right_direction * half_gap;
    }
}
