use super::PointFilter;
use crate::keypoints::Point;
use crate::{Error, Result};

/// Exponential smoothing filter
///
/// `new = alpha * raw + (1 - alpha) * previous`; the first observation passes
/// through unchanged.
#[derive(Debug, Clone)]
pub struct ExponentialFilter {
    alpha: f64,
    last: Option<Point>,
}

impl ExponentialFilter {
    /// Create a filter with weight `alpha` in (0, 1]
    ///
    /// # Errors
    ///
    /// Returns `FilterError` when `alpha` is outside (0, 1]
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(Error::FilterError(format!("Alpha must be in (0, 1], got {alpha}")));
        }
        Ok(Self { alpha, last: None })
    }
}

impl PointFilter for ExponentialFilter {
    fn apply(&mut self, point: Point) -> Point {
        let filtered = match self.last {
            Some(last) => Point::new(
                self.alpha * point.x + (1.0 - self.alpha) * last.x,
                self.alpha * point.y + (1.0 - self.alpha) * last.y,
            ),
            None => point,
        };

        self.last = Some(filtered);
        filtered
    }

    fn last(&self) -> Option<Point> {
        self.last
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn name(&self) -> &str {
        "ExponentialFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_filter() {
        let mut filter = ExponentialFilter::new(0.5).unwrap();

        // First value passes through
        let p1 = filter.apply(Point::new(10.0, 20.0));
        assert_eq!(p1, Point::new(10.0, 20.0));

        // Second value is smoothed
        let p2 = filter.apply(Point::new(20.0, 30.0));
        assert_eq!(p2, Point::new(15.0, 25.0)); // 0.5 * 20 + 0.5 * 10
    }

    #[test]
    fn test_alpha_bounds() {
        // High alpha = less smoothing
        let mut filter1 = ExponentialFilter::new(0.9).unwrap();
        filter1.apply(Point::new(10.0, 0.0));
        let p = filter1.apply(Point::new(20.0, 0.0));
        assert!((p.x - 19.0).abs() < 0.001); // 0.9 * 20 + 0.1 * 10

        // Low alpha = more smoothing
        let mut filter2 = ExponentialFilter::new(0.1).unwrap();
        filter2.apply(Point::new(10.0, 0.0));
        let p = filter2.apply(Point::new(20.0, 0.0));
        assert!((p.x - 11.0).abs() < 0.001); // 0.1 * 20 + 0.9 * 10

        assert!(ExponentialFilter::new(0.0).is_err());
        assert!(ExponentialFilter::new(f64::NAN).is_err());
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut filter = ExponentialFilter::new(0.3).unwrap();
        filter.apply(Point::new(0.0, 0.0));
        filter.reset();
        assert_eq!(filter.apply(Point::new(50.0, 50.0)), Point::new(50.0, 50.0));
    }
}
