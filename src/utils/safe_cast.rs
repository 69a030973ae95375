//! Safe casting utilities for pixel geometry
//!
//! Sprite and frame geometry is computed in `f64` and lands in `u32`/`i64`
//! pixel coordinates; these helpers keep NaN and overflow out of buffer math.

use crate::{Error, Result};

/// Safely convert u32 to i32 with overflow checking
///
/// # Errors
///
/// Returns an error if the value exceeds i32::MAX
pub fn u32_to_i32(value: u32) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Safely convert i32 to u32, rejecting negative values
///
/// # Errors
///
/// Returns an error if the value is negative
pub fn i32_to_u32(value: i32) -> Result<u32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} cannot be a pixel dimension")))
}

/// Clamp and convert f64 to i32; NaN maps to `min`
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
pub fn f64_to_i32_clamp(value: f64, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if value.is_nan() {
        return min;
    }

    let clamped = value.clamp(f64::from(min), f64::from(max));
    (clamped as i32).clamp(min, max)
}

/// Floor an f64 pixel coordinate into i64, saturating at the i64 range; NaN maps to 0
#[must_use]
#[allow(clippy::cast_possible_truncation)] // `as` saturates for floats
pub fn f64_floor_to_i64(value: f64) -> i64 {
    if value.is_nan() {
        0
    } else {
        value.floor() as i64
    }
}

/// Round a positive f64 extent into a pixel dimension of at least 1
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped first
pub fn f64_to_dimension(value: f64) -> u32 {
    if !value.is_finite() || value < 1.0 {
        return 1;
    }
    value.round().min(f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_u32_to_i32() {
        assert_eq!(u32_to_i32(42).unwrap(), 42);
        assert_eq!(u32_to_i32(i32::MAX as u32).unwrap(), i32::MAX);
        assert!(u32_to_i32(i32::MAX as u32 + 1).is_err());
        assert!(u32_to_i32(u32::MAX).is_err());
    }

    #[test]
    fn test_i32_to_u32() {
        assert_eq!(i32_to_u32(640).unwrap(), 640);
        assert!(i32_to_u32(-1).is_err());
    }

    #[test]
    fn test_f64_to_i32_clamp() {
        assert_eq!(f64_to_i32_clamp(50.0, 0, 100), 50);
        assert_eq!(f64_to_i32_clamp(-10.0, 0, 100), 0);
        assert_eq!(f64_to_i32_clamp(150.0, 0, 100), 100);
        assert_eq!(f64_to_i32_clamp(f64::NAN, 0, 100), 0);
        assert_eq!(f64_to_i32_clamp(f64::INFINITY, -100, 100), 100);
        assert_eq!(f64_to_i32_clamp(5.0, 100, -100), 5);
    }

    #[test]
    fn test_floor_and_dimension() {
        assert_eq!(f64_floor_to_i64(-0.5), -1);
        assert_eq!(f64_floor_to_i64(2.9), 2);
        assert_eq!(f64_floor_to_i64(f64::NAN), 0);
        assert_eq!(f64_floor_to_i64(f64::NEG_INFINITY), i64::MIN);

        assert_eq!(f64_to_dimension(0.2), 1);
        assert_eq!(f64_to_dimension(f64::NAN), 1);
        assert_eq!(f64_to_dimension(63.5), 64);
    }

    proptest! {
        #[test]
        fn prop_f64_to_i32_clamp_always_within_bounds(
            value in any::<f64>(),
            min in any::<i32>(),
            max in any::<i32>()
        ) {
            let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
            let result = f64_to_i32_clamp(value, min, max);
            prop_assert!(result >= lo);
            prop_assert!(result <= hi);
        }

        #[test]
        fn prop_dimension_is_positive(value in any::<f64>()) {
            prop_assert!(f64_to_dimension(value) >= 1);
        }
    }
}
