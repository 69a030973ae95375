//! Position smoothing for facial keypoints.
//!
//! Raw detector keypoints jitter by a few pixels from frame to frame. The
//! smoother keeps one filter per feature and blends every new observation
//! into the previous estimate, so overlays glide instead of shaking.

use crate::constants::{DEFAULT_SMOOTHING_FILTER, EPSILON};
use crate::filters::{create_filter, PointFilter};
use crate::keypoints::{Feature, KeypointSet, Point};
use crate::Result;
use std::collections::BTreeMap;

/// Smoothed position per feature
pub type SmoothedPositions = BTreeMap<Feature, Point>;

/// Exponential keypoint smoother with per-feature state
pub struct PositionSmoother {
    filter_description: String,
    filters: BTreeMap<Feature, Box<dyn PointFilter>>,
}

impl PositionSmoother {
    /// Create a smoother using the default exponential filter (factor 0.3)
    ///
    /// # Errors
    ///
    /// Never fails for the built-in filter; the `Result` mirrors [`Self::with_filter`]
    pub fn new() -> Result<Self> {
        Self::with_filter(DEFAULT_SMOOTHING_FILTER)
    }

    /// Create a smoother whose per-feature filters are built from `description`
    ///
    /// # Errors
    ///
    /// Returns `FilterError` if the description does not name a valid filter
    pub fn with_filter(description: &str) -> Result<Self> {
        // Validate once up front so later per-feature creation cannot fail
        let filter = create_filter(description)?;
        log::debug!("Smoothing keypoints with {}", filter.name());
        Ok(Self {
            filter_description: description.to_string(),
            filters: BTreeMap::new(),
        })
    }

    /// Blend the raw keypoints into the tracked state
    ///
    /// Features absent from `raw` keep their previous smoothed value. The
    /// returned map contains every feature seen since the last [`Self::clear`].
    pub fn update(&mut self, raw: &KeypointSet) -> SmoothedPositions {
        for (feature, point) in raw.iter() {
            if !self.filters.contains_key(&feature) {
                match create_filter(&self.filter_description) {
                    Ok(filter) => {
                        self.filters.insert(feature, filter);
                    }
                    Err(e) => {
                        log::warn!("Cannot create smoothing filter for {feature}: {e}");
                        continue;
                    }
                }
            }
            if let Some(filter) = self.filters.get_mut(&feature) {
                filter.apply(point);
            }
        }

        self.positions()
    }

    /// Current smoothed positions without feeding a new observation
    #[must_use]
    pub fn positions(&self) -> SmoothedPositions {
        self.filters
            .iter()
            .filter_map(|(&feature, filter)| filter.last().map(|p| (feature, p)))
            .collect()
    }

    /// Forget all tracked positions, e.g. when the overlay target changes
    pub fn clear(&mut self) {
        for filter in self.filters.values_mut() {
            filter.reset();
        }
    }

    /// Face roll angle in degrees derived from the two eye positions
    ///
    /// Positive angles are counter-clockwise on screen. Returns 0 when either
    /// eye is missing or both eyes coincide.
    #[must_use]
    pub fn calculate_angle(positions: &SmoothedPositions) -> f64 {
        let (Some(left), Some(right)) = (
            positions.get(&Feature::LeftEye),
            positions.get(&Feature::RightEye),
        ) else {
            return 0.0;
        };

        let dx = left.x - right.x;
        let dy = left.y - right.y;
        if dx.abs() < EPSILON && dy.abs() < EPSILON {
            return 0.0;
        }

        // Image y grows downwards, so negate to get a counter-clockwise angle
        -dy.atan2(dx).to_degrees() + 0.0
    }
}

impl std::fmt::Debug for PositionSmoother {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionSmoother")
            .field("filter", &self.filter_description)
            .field("positions", &self.positions())
            .finish()
    }
}
