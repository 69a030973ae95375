//! Overlay sprites: an RGB image plus a separate alpha mask of the same size.

use crate::keypoints::Feature;
use crate::{Error, Result};
use image::{imageops, GrayImage, Luma, Rgb, RgbImage, RgbaImage};
use std::path::Path;

/// Loaded overlay image for one feature of one identity
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    image: RgbImage,
    alpha: GrayImage,
}

impl Sprite {
    /// Pair an image with its alpha mask
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the buffers are empty or differ in size
    pub fn new(image: RgbImage, alpha: GrayImage) -> Result<Self> {
        if image.dimensions() != alpha.dimensions() {
            return Err(Error::InvalidInput(format!(
                "Sprite image {:?} and alpha mask {:?} differ in size",
                image.dimensions(),
                alpha.dimensions()
            )));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::InvalidInput("Sprite must not be empty".to_string()));
        }
        Ok(Self { image, alpha })
    }

    /// Split an RGBA buffer into color and alpha planes
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty buffer
    pub fn from_rgba(rgba: &RgbaImage) -> Result<Self> {
        let (width, height) = rgba.dimensions();
        let mut image = RgbImage::new(width, height);
        let mut alpha = GrayImage::new(width, height);
        for (x, y, pixel) in rgba.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            image.put_pixel(x, y, Rgb([r, g, b]));
            alpha.put_pixel(x, y, Luma([a]));
        }
        Self::new(image, alpha)
    }

    /// Load a PNG with an alpha channel
    ///
    /// # Errors
    ///
    /// Returns `Asset` if the file is missing, cannot be decoded or has no
    /// alpha channel
    pub fn load(path: &Path, feature: Feature) -> Result<Self> {
        let asset_error = |reason: String| Error::Asset {
            feature,
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(asset_error("file not found".to_string()));
        }

        let decoded = image::open(path).map_err(|e| asset_error(e.to_string()))?;
        if !decoded.color().has_alpha() {
            return Err(asset_error("image has no alpha channel".to_string()));
        }

        Self::from_rgba(&decoded.to_rgba8()).map_err(|e| asset_error(e.to_string()))
    }

    /// Horizontally mirrored copy, used to derive one eye from the other
    #[must_use]
    pub fn mirrored(&self) -> Self {
        Self {
            image: imageops::flip_horizontal(&self.image),
            alpha: imageops::flip_horizontal(&self.alpha),
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Color data
    #[must_use]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Alpha mask, 0 = transparent, 255 = opaque
    #[must_use]
    pub fn alpha(&self) -> &GrayImage {
        &self.alpha
    }
}
