//! Alpha compositing of transformed sprites onto video frames.

use crate::transform::TransformedSprite;
use crate::utils::safe_cast::f64_floor_to_i64;
use image::RgbImage;

/// A captured video frame, 8-bit RGB
pub type Frame = RgbImage;

/// Overlapping rectangle between a placed sprite and the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendRegion {
    pub frame_x: u32,
    pub frame_y: u32,
    pub sprite_x: u32,
    pub sprite_y: u32,
    pub width: u32,
    pub height: u32,
}

/// Clip a sprite centered at (`center_x`, `center_y`) against the frame
///
/// Returns `None` when the sprite lies entirely outside the frame.
#[must_use]
pub fn clip_region(
    frame_width: u32,
    frame_height: u32,
    sprite_width: u32,
    sprite_height: u32,
    center_x: f64,
    center_y: f64,
) -> Option<BlendRegion> {
    let left = f64_floor_to_i64(center_x - f64::from(sprite_width) / 2.0);
    let top = f64_floor_to_i64(center_y - f64::from(sprite_height) / 2.0);
    let right = left.saturating_add(i64::from(sprite_width));
    let bottom = top.saturating_add(i64::from(sprite_height));

    let x1 = left.max(0);
    let y1 = top.max(0);
    let x2 = right.min(i64::from(frame_width));
    let y2 = bottom.min(i64::from(frame_height));
    if x1 >= x2 || y1 >= y2 {
        return None;
    }

    Some(BlendRegion {
        frame_x: u32::try_from(x1).ok()?,
        frame_y: u32::try_from(y1).ok()?,
        sprite_x: u32::try_from(x1 - left).ok()?,
        sprite_y: u32::try_from(y1 - top).ok()?,
        width: u32::try_from(x2 - x1).ok()?,
        height: u32::try_from(y2 - y1).ok()?,
    })
}

/// Alpha-blend `sprite` into `frame` with its center at (`center_x`, `center_y`)
///
/// Only the on-frame part of the sprite is drawn. Pixels with alpha 0 are
/// left untouched and alpha 255 replaces the frame pixel. Returns whether
/// any part of the sprite overlapped the frame.
pub fn blend(frame: &mut Frame, sprite: &TransformedSprite, center_x: f64, center_y: f64) -> bool {
    let Some(region) = clip_region(
        frame.width(),
        frame.height(),
        sprite.width(),
        sprite.height(),
        center_x,
        center_y,
    ) else {
        return false;
    };

    let colors = sprite.image();
    let alpha = sprite.alpha();
    for row in 0..region.height {
        for col in 0..region.width {
            let sx = region.sprite_x + col;
            let sy = region.sprite_y + row;
            let a = alpha.get_pixel(sx, sy)[0];
            if a == 0 {
                continue;
            }

            let src = colors.get_pixel(sx, sy);
            let dst = frame.get_pixel_mut(region.frame_x + col, region.frame_y + row);
            if a == u8::MAX {
                *dst = *src;
                continue;
            }

            let weight = f32::from(a) / 255.0;
            for (d, s) in dst.0.iter_mut().zip(src.0) {
                *d = blend_channel(*d, s, weight);
            }
        }
    }
    true
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // result clamped to 0..=255
fn blend_channel(dst: u8, src: u8, weight: f32) -> u8 {
    let mixed = weight * f32::from(src) + (1.0 - weight) * f32::from(dst);
    mixed.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_fully_inside() {
        let region = clip_region(640, 480, 20, 10, 100.0, 50.0).unwrap();
        assert_eq!(
            region,
            BlendRegion {
                frame_x: 90,
                frame_y: 45,
                sprite_x: 0,
                sprite_y: 0,
                width: 20,
                height: 10,
            }
        );
    }

    #[test]
    fn test_region_clipped_top_left() {
        let region = clip_region(640, 640, 200, 200, -50.0, -50.0).unwrap();
        assert_eq!((region.frame_x, region.frame_y), (0, 0));
        assert_eq!((region.sprite_x, region.sprite_y), (150, 150));
        assert_eq!((region.width, region.height), (50, 50));
    }

    #[test]
    fn test_region_clipped_bottom_right() {
        let region = clip_region(100, 100, 20, 20, 95.0, 99.0).unwrap();
        assert_eq!((region.frame_x, region.frame_y), (85, 89));
        assert_eq!((region.width, region.height), (15, 11));
        assert_eq!((region.sprite_x, region.sprite_y), (0, 0));
    }

    #[test]
    fn test_region_off_frame() {
        assert!(clip_region(100, 100, 20, 20, -30.0, 50.0).is_none());
        assert!(clip_region(100, 100, 20, 20, 50.0, 200.0).is_none());
    }

    #[test]
    fn test_blend_channel() {
        assert_eq!(blend_channel(0, 255, 0.5), 128);
        assert_eq!(blend_channel(100, 100, 0.3), 100);
        assert_eq!(blend_channel(10, 250, 1.0), 250);
    }
}
