//! Utility functions for numeric and image conversions.

pub mod safe_cast;

#[cfg(feature = "camera")]
pub mod image_conversion;
