//! Sprite transformer: rescale, then rotate about the sprite center.
//!
//! Color and alpha go through identical geometry so they stay pixel-aligned.
//! Rotation expands the canvas to the bounding box of the rotated corners;
//! nothing is cropped.

use crate::constants::{EPSILON, MAX_TRANSFORMED_PIXELS, MIN_SPRITE_SCALE};
use crate::sprite::Sprite;
use crate::utils::safe_cast::f64_to_dimension;
use crate::{Error, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Pixel, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

/// Per-frame rotated and rescaled copy of a [`Sprite`]
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedSprite {
    image: RgbImage,
    alpha: GrayImage,
}

impl TransformedSprite {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    #[must_use]
    pub fn alpha(&self) -> &GrayImage {
        &self.alpha
    }

    /// Offset from the top-left corner to the sprite center
    #[must_use]
    pub fn anchor(&self) -> (f64, f64) {
        (f64::from(self.width()) / 2.0, f64::from(self.height()) / 2.0)
    }
}

/// Clamp a requested scale to the renderable minimum
#[must_use]
pub fn effective_sprite_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > MIN_SPRITE_SCALE {
        scale
    } else {
        MIN_SPRITE_SCALE
    }
}

/// Rescale `sprite` by `scale` and rotate it by `angle` degrees (counter-clockwise)
///
/// Scales at or below zero are clamped to 1%.
///
/// # Errors
///
/// Returns `ResourceExhausted` if the output would exceed the pixel budget
pub fn transform(sprite: &Sprite, scale: f64, angle: f64) -> Result<TransformedSprite> {
    let scale = effective_sprite_scale(scale);
    let width = f64_to_dimension(f64::from(sprite.width()) * scale);
    let height = f64_to_dimension(f64::from(sprite.height()) * scale);
    check_budget(width, height)?;

    let (image, alpha) = if (width, height) == (sprite.width(), sprite.height()) {
        (sprite.image().clone(), sprite.alpha().clone())
    } else {
        (
            imageops::resize(sprite.image(), width, height, FilterType::Lanczos3),
            imageops::resize(sprite.alpha(), width, height, FilterType::Lanczos3),
        )
    };

    let angle = normalize_degrees(angle);
    if angle.abs() < EPSILON {
        return Ok(TransformedSprite { image, alpha });
    }

    let rotation = Rotation::new(angle, width, height);
    check_budget(rotation.width, rotation.height)?;

    Ok(TransformedSprite {
        image: rotate(&image, &rotation),
        alpha: rotate(&alpha, &rotation),
    })
}

/// Map an angle into (-180, 180]
fn normalize_degrees(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

fn check_budget(width: u32, height: u32) -> Result<()> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_TRANSFORMED_PIXELS {
        return Err(Error::ResourceExhausted(format!(
            "Transformed sprite of {width}x{height} exceeds {MAX_TRANSFORMED_PIXELS} pixels"
        )));
    }
    Ok(())
}

/// Rotation about the sprite center onto the expanded output canvas
struct Rotation {
    width: u32,
    height: u32,
    projection: Projection,
}

impl Rotation {
    #[allow(clippy::cast_possible_truncation)] // projections are f32
    fn new(angle: f64, src_width: u32, src_height: u32) -> Self {
        let (sin, cos) = angle.to_radians().sin_cos();
        let (w, h) = (f64::from(src_width), f64::from(src_height));
        let width = f64_to_dimension(h * sin.abs() + w * cos.abs());
        let height = f64_to_dimension(h * cos.abs() + w * sin.abs());

        // Pixel indices of the padded source, centered, then rotated and moved
        // to the canvas center. Image y points down, so a counter-clockwise turn
        // on screen is a negative angle for the projection.
        let src_center = ((w / 2.0 + 0.5) as f32, (h / 2.0 + 0.5) as f32);
        let dst_center = (
            (f64::from(width) / 2.0 - 0.5) as f32,
            (f64::from(height) / 2.0 - 0.5) as f32,
        );
        let projection = Projection::translate(dst_center.0, dst_center.1)
            * Projection::rotate(-angle.to_radians() as f32)
            * Projection::translate(-src_center.0, -src_center.1);

        Self {
            width,
            height,
            projection,
        }
    }
}

/// Bilinear warp; samples outside the source read as zero (transparent black)
fn rotate<P>(src: &ImageBuffer<P, Vec<u8>>, rotation: &Rotation) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync + 'static,
{
    // One zero pixel of padding so edge samples blend towards transparent
    let mut padded: ImageBuffer<P, Vec<u8>> = ImageBuffer::new(src.width() + 2, src.height() + 2);
    imageops::replace(&mut padded, src, 1, 1);
    let transparent = *padded.get_pixel(0, 0);

    let mut out: ImageBuffer<P, Vec<u8>> = ImageBuffer::new(rotation.width, rotation.height);
    warp_into(
        &padded,
        &rotation.projection,
        Interpolation::Bilinear,
        transparent,
        &mut out,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn opaque_sprite(width: u32, height: u32) -> Sprite {
        Sprite::new(
            RgbImage::from_pixel(width, height, Rgb([200, 100, 50])),
            GrayImage::from_pixel(width, height, Luma([255])),
        )
        .unwrap()
    }

    #[test]
    fn test_identity_transform() {
        let sprite = opaque_sprite(10, 6);
        let out = transform(&sprite, 1.0, 0.0).unwrap();
        assert_eq!(out.image(), sprite.image());
        assert_eq!(out.alpha(), sprite.alpha());
        assert_eq!(out.anchor(), (5.0, 3.0));
    }

    #[test]
    fn test_scale_resizes_both_planes() {
        let sprite = opaque_sprite(40, 20);
        let out = transform(&sprite, 2.0, 0.0).unwrap();
        assert_eq!((out.width(), out.height()), (80, 40));
        assert_eq!(out.alpha().dimensions(), (80, 40));
    }

    #[test]
    fn test_non_positive_scale_clamped() {
        let sprite = opaque_sprite(200, 100);
        let zero = transform(&sprite, 0.0, 0.0).unwrap();
        let negative = transform(&sprite, -3.0, 0.0).unwrap();
        assert_eq!((zero.width(), zero.height()), (2, 1));
        assert_eq!(zero.image().dimensions(), negative.image().dimensions());
    }

    #[test]
    fn test_quarter_turn_swaps_dimensions() {
        let sprite = opaque_sprite(40, 20);
        let out = transform(&sprite, 1.0, 90.0).unwrap();
        assert_eq!((out.width(), out.height()), (20, 40));
        assert_eq!(out.anchor(), (10.0, 20.0));
    }

    #[test]
    fn test_rotation_expands_canvas() {
        let sprite = opaque_sprite(20, 20);
        let out = transform(&sprite, 1.0, 45.0).unwrap();
        // 20 * (sin 45 + cos 45) = 28.28
        assert_eq!((out.width(), out.height()), (28, 28));
        // Corners of the expanded canvas are outside the rotated square
        assert_eq!(out.alpha().get_pixel(0, 0)[0], 0);
        // Center stays opaque
        assert!(out.alpha().get_pixel(14, 14)[0] >= 254);
    }

    #[test]
    fn test_counter_clockwise_convention() {
        // Opaque marker in the right half only
        let mut alpha = GrayImage::new(21, 21);
        for y in 8..13 {
            for x in 15..21 {
                alpha.put_pixel(x, y, Luma([255]));
            }
        }
        let sprite = Sprite::new(RgbImage::new(21, 21), alpha).unwrap();
        let out = transform(&sprite, 1.0, 90.0).unwrap();
        // After a counter-clockwise quarter turn the marker sits at the top
        assert!(out.alpha().get_pixel(10, 2)[0] >= 254);
        assert_eq!(out.alpha().get_pixel(10, 18)[0], 0);
    }

    #[test]
    fn test_pixel_budget() {
        let sprite = opaque_sprite(2000, 2000);
        let err = transform(&sprite, 4.0, 0.0).unwrap_err();
        assert!(matches!(err, Error::ResourceExhausted(_)));
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), -90.0);
        assert_eq!(normalize_degrees(270.0), -90.0);
        assert_eq!(normalize_degrees(f64::NAN), 0.0);
    }
}
