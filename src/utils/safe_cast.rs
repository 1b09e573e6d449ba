//! Checked numeric conversions for pixel coordinates and encoder settings

use crate::{Error, Result};

/// Safely convert i32 to u32, rejecting negative values
///
/// # Errors
///
/// Returns an error if the value is negative
pub fn i32_to_u32(value: i32) -> Result<u32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} is negative")))
}

/// Safely convert f64 to u32 with bounds checking
///
/// # Errors
///
/// Returns an error if the value is not finite or outside u32 range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is safe
#[allow(clippy::cast_sign_loss)] // Sign checked above
pub fn f64_to_u32(value: f64) -> Result<u32> {
    if value.is_finite() && value >= 0.0 && value <= f64::from(u32::MAX) {
        Ok(value as u32)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to u32"
        )))
    }
}

/// Safely convert f32 to u8 with bounds checking
///
/// # Errors
///
/// Returns an error if the value is not finite or outside 0..=255
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn f32_to_u8(value: f32) -> Result<u8> {
    if value.is_finite() && (0.0..=255.0).contains(&value) {
        Ok(value as u8)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to u8"
        )))
    }
}
