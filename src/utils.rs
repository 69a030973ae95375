//! Utility functions for numeric conversions and image interoperability.

pub mod safe_cast;

#[cfg(feature = "vision")]
pub mod image_conversion;
