//! Smoothing and roll-angle behaviour over sequences of detections

use face_overlay::keypoints::{Feature, KeypointSet, Point};
use face_overlay::smoothing::{PositionSmoother, SmoothedPositions};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn nose_at(x: f64, y: f64) -> KeypointSet {
    KeypointSet::new(BTreeMap::from([(Feature::Nose, Point::new(x, y))]), 200.0, 200.0)
}

fn eyes(right: (f64, f64), left: (f64, f64)) -> SmoothedPositions {
    BTreeMap::from([
        (Feature::RightEye, Point::new(right.0, right.1)),
        (Feature::LeftEye, Point::new(left.0, left.1)),
    ])
}

#[test]
fn test_first_observation_passes_through() {
    let mut smoother = PositionSmoother::new().unwrap();
    let positions = smoother.update(&nose_at(42.0, 17.0));
    assert_eq!(positions[&Feature::Nose], Point::new(42.0, 17.0));
}

#[test]
fn test_single_step_blend() {
    let mut smoother = PositionSmoother::new().unwrap();
    smoother.update(&nose_at(100.0, 100.0));
    let positions = smoother.update(&nose_at(110.0, 100.0));

    let nose = positions[&Feature::Nose];
    assert!((nose.x - 103.0).abs() < 1e-9);
    assert!((nose.y - 100.0).abs() < 1e-9);
}

#[test]
fn test_geometric_convergence() {
    let mut smoother = PositionSmoother::new().unwrap();
    smoother.update(&nose_at(0.0, 0.0));

    for n in 1..=20 {
        let nose = smoother.update(&nose_at(100.0, 50.0))[&Feature::Nose];
        let expected = 0.7_f64.powi(n);
        assert!(((100.0 - nose.x) / 100.0 - expected).abs() < 1e-9, "step {n}");
        assert!(((50.0 - nose.y) / 50.0 - expected).abs() < 1e-9, "step {n}");
    }
}

#[test]
fn test_missing_feature_keeps_previous_value() {
    let mut smoother = PositionSmoother::new().unwrap();
    smoother.update(&nose_at(10.0, 10.0));

    let mouth_only = KeypointSet::new(
        BTreeMap::from([(Feature::Mouth, Point::new(5.0, 5.0))]),
        100.0,
        100.0,
    );
    let positions = smoother.update(&mouth_only);
    assert_eq!(positions[&Feature::Nose], Point::new(10.0, 10.0));
    assert_eq!(positions[&Feature::Mouth], Point::new(5.0, 5.0));
}

#[test]
fn test_clear_forgets_history() {
    let mut smoother = PositionSmoother::new().unwrap();
    smoother.update(&nose_at(0.0, 0.0));
    smoother.clear();

    let positions = smoother.update(&nose_at(80.0, 80.0));
    assert_eq!(positions[&Feature::Nose], Point::new(80.0, 80.0));
}

#[test]
fn test_level_eyes_give_zero_angle() {
    let angle = PositionSmoother::calculate_angle(&eyes((100.0, 100.0), (200.0, 100.0)));
    assert!(angle.abs() < 1e-9);
}

#[test]
fn test_tilted_eyes_angle() {
    let angle = PositionSmoother::calculate_angle(&eyes((100.0, 100.0), (160.0, 120.0)));
    assert!((angle - (-18.434_948_822_922_01)).abs() < 1e-6, "angle {angle}");
}

#[test]
fn test_angle_without_usable_eyes() {
    let same = PositionSmoother::calculate_angle(&eyes((120.0, 80.0), (120.0, 80.0)));
    assert_eq!(same, 0.0);

    let one_eye = BTreeMap::from([(Feature::LeftEye, Point::new(10.0, 10.0))]);
    assert_eq!(PositionSmoother::calculate_angle(&one_eye), 0.0);
    assert_eq!(PositionSmoother::calculate_angle(&SmoothedPositions::new()), 0.0);
}

#[test]
fn test_vertical_mirror_negates_angle() {
    let down = PositionSmoother::calculate_angle(&eyes((100.0, 100.0), (160.0, 120.0)));
    let up = PositionSmoother::calculate_angle(&eyes((100.0, 100.0), (160.0, 80.0)));
    assert!((down + up).abs() < 1e-9);
}

#[test]
fn test_swapped_eyes_turn_half_a_circle() {
    let angle = PositionSmoother::calculate_angle(&eyes((100.0, 100.0), (160.0, 120.0)));
    let swapped = PositionSmoother::calculate_angle(&eyes((160.0, 120.0), (100.0, 100.0)));
    let difference = (angle - swapped).rem_euclid(360.0);
    assert!((difference - 180.0).abs() < 1e-9, "difference {difference}");
}

proptest! {
    #[test]
    fn smoothed_position_stays_within_observed_range(
        xs in prop::collection::vec(-1000.0f64..1000.0, 1..50),
    ) {
        let mut smoother = PositionSmoother::new().unwrap();
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for x in xs {
            min = min.min(x);
            max = max.max(x);
            let nose = smoother.update(&nose_at(x, 0.0))[&Feature::Nose];
            prop_assert!(nose.x >= min - 1e-9 && nose.x <= max + 1e-9);
        }
    }

    #[test]
    fn each_step_lands_between_previous_and_raw(
        first in (-1000.0f64..1000.0, -1000.0f64..1000.0),
        steps in prop::collection::vec((-1000.0f64..1000.0, -1000.0f64..1000.0), 1..50),
    ) {
        let mut smoother = PositionSmoother::new().unwrap();
        let mut previous = smoother.update(&nose_at(first.0, first.1))[&Feature::Nose];

        for (x, y) in steps {
            let nose = smoother.update(&nose_at(x, y))[&Feature::Nose];
            for (value, before, raw) in [(nose.x, previous.x, x), (nose.y, previous.y, y)] {
                let (low, high) = (before.min(raw), before.max(raw));
                prop_assert!(value >= low - 1e-9 && value <= high + 1e-9, "{value} outside [{low}, {high}]");
            }
            previous = nose;
        }
    }

    #[test]
    fn angle_is_finite_and_bounded(
        rx in -500.0f64..500.0, ry in -500.0f64..500.0,
        lx in -500.0f64..500.0, ly in -500.0f64..500.0,
    ) {
        let angle = PositionSmoother::calculate_angle(&eyes((rx, ry), (lx, ly)));
        prop_assert!(angle.is_finite());
        prop_assert!((-180.0..=180.0).contains(&angle));
    }
}
