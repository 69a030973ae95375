//! Temporal filters for smoothing noisy keypoint positions.
//!
//! Each tracked feature owns one filter instance; the smoother feeds it the
//! raw detection every frame and keeps whatever the filter returns.

/// Exponential filter for responsive smoothing
pub mod exponential;

use crate::keypoints::Point;
use crate::{Error, Result};

/// Trait for per-feature position filters
pub trait PointFilter: Send + Sync {
    /// Feed a raw observation and return the filtered position
    fn apply(&mut self, point: Point) -> Point;

    /// Last filtered position, if any observation was seen
    fn last(&self) -> Option<Point>;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes through values unchanged
#[derive(Debug, Default)]
pub struct NoFilter {
    last: Option<Point>,
}

impl PointFilter for NoFilter {
    fn apply(&mut self, point: Point) -> Point {
        self.last = Some(point);
        point
    }

    fn last(&self) -> Option<Point> {
        self.last
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Create a point filter from a description such as `none` or `exponential:0.3`
pub fn create_filter(description: &str) -> Result<Box<dyn PointFilter>> {
    let description = description.trim().to_lowercase();
    let mut parts = description.splitn(2, ':');
    let kind = parts.next().unwrap_or_default();
    let param = parts.next();

    match kind {
        "none" | "nofilter" => Ok(Box::new(NoFilter::default())),
        "exponential" | "ema" => {
            let alpha = match param {
                Some(raw) => raw
                    .parse::<f64>()
                    .map_err(|_| Error::FilterError(format!("Alpha must be a number, got '{raw}'")))?,
                None => crate::constants::SMOOTHING_FACTOR,
            };
            Ok(Box::new(exponential::ExponentialFilter::new(alpha)?))
        }
        _ => Err(Error::FilterError(format!("Unknown filter type: {description}"))),
    }
}
