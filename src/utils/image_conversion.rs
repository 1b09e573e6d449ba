//! Conversion from OpenCV `Mat` frames to `image` buffers.

use crate::utils::safe_cast::i32_to_u32;
use crate::{Error, Result};
use image::{Rgb, RgbImage};
use opencv::core::{Mat, MatTraitConst, Vec3b, CV_8UC3};

/// Convert an 8-bit BGR `Mat` (as delivered by `VideoCapture`) to an RGB image
///
/// # Errors
/// * Returns error if the Mat is empty or not 3-channel 8-bit
/// * Returns error if Mat data cannot be accessed
pub fn bgr_mat_to_rgb_image(mat: &Mat) -> Result<RgbImage> {
    let rows = mat.rows();
    let cols = mat.cols();

    if rows <= 0 || cols <= 0 {
        return Err(Error::InvalidInput(format!("Invalid Mat dimensions: {rows}x{cols}")));
    }
    if mat.typ() != CV_8UC3 {
        return Err(Error::InvalidInput(format!(
            "Expected 8-bit 3-channel Mat, got type {}",
            mat.typ()
        )));
    }

    let mut image = RgbImage::new(i32_to_u32(cols)?, i32_to_u32(rows)?);
    for row in 0..rows {
        for col in 0..cols {
            let bgr = mat.at_2d::<Vec3b>(row, col)?;
            image.put_pixel(i32_to_u32(col)?, i32_to_u32(row)?, Rgb([bgr[2], bgr[1], bgr[0]]));
        }
    }

    Ok(image)
}
