//! Conversions between OpenCV `Mat` frames and `image` buffers.
//!
//! OpenCV delivers BGR; the overlay pipeline works on RGB [`Frame`]s.

use crate::compositor::Frame;
use crate::utils::safe_cast::{i32_to_u32, u32_to_i32};
use crate::{Error, Result};
use opencv::core::{Mat, Scalar, Vec3b, CV_8UC3};
use opencv::prelude::*;

/// Convert a BGR 8-bit OpenCV Mat into an RGB frame
///
/// # Errors
/// * Returns error if the Mat is empty or not 3-channel 8-bit
/// * Returns error if Mat data cannot be accessed
pub fn mat_to_frame(mat: &Mat) -> Result<Frame> {
    let rows = mat.rows();
    let cols = mat.cols();

    if rows <= 0 || cols <= 0 || mat.typ() != CV_8UC3 {
        return Err(Error::InvalidInput(format!(
            "Expected non-empty 8-bit BGR Mat, got {}x{} type {}",
            cols,
            rows,
            mat.typ()
        )));
    }

    let mut frame = Frame::new(i32_to_u32(cols)?, i32_to_u32(rows)?);
    for row in 0..rows {
        for col in 0..cols {
            let pixel = mat.at_2d::<Vec3b>(row, col)?;
            frame.put_pixel(
                i32_to_u32(col)?,
                i32_to_u32(row)?,
                image::Rgb([pixel[2], pixel[1], pixel[0]]),
            );
        }
    }

    Ok(frame)
}

/// Convert an RGB frame into a BGR 8-bit OpenCV Mat for display
///
/// # Errors
/// * Returns error if the frame is too large for OpenCV dimensions
/// * Returns error if Mat creation fails
pub fn frame_to_mat(frame: &Frame) -> Result<Mat> {
    let width = u32_to_i32(frame.width())?;
    let height = u32_to_i32(frame.height())?;

    let mut mat = Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::default())?;

    for (x, y, pixel) in frame.enumerate_pixels() {
        let mut bgr = Vec3b::default();
        bgr[0] = pixel[2];
        bgr[1] = pixel[1];
        bgr[2] = pixel[0];
        *mat.at_2d_mut::<Vec3b>(u32_to_i32(y)?, u32_to_i32(x)?)? = bgr;
    }

    Ok(mat)
}
