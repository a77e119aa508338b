//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between [`operations`](super::operations) (which decides what to
//! render and where) and the [`backend`](super::backend) (which does the pixel
//! work). Swapping the backend for a mock leaves operation logic untouched.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1 to 100, default 90). Clamped on construction.
//! - [`CropRect`]: Integer source-pixel rectangle handed to the cropper.
//! - [`CropResizeParams`]: Source, output path, rectangle, target size and quality for one crop + resize.

use crate::ratio::OutputSize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Rectangle in source-pixel coordinates, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the rectangle lies entirely inside an image of the given size.
    pub fn fits_within(&self, image: (u32, u32)) -> bool {
        self.x
            .checked_add(self.width)
            .is_some_and(|right| right <= image.0)
            && self
                .y
                .checked_add(self.height)
                .is_some_and(|bottom| bottom <= image.1)
    }
}

/// Parameters for a crop-then-resize into a new file.
#[derive(Debug, Clone, PartialEq)]
pub struct CropResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub rect: CropRect,
    pub target: OutputSize,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn crop_rect_empty() {
        assert!(CropRect::default().is_empty());
        assert!(
            CropRect {
                x: 0,
                y: 0,
                width: 10,
                height: 0
            }
            .is_empty()
        );
    }

    #[test]
    fn crop_rect_fits_within() {
        let rect = CropRect {
            x: 600,
            y: 0,
            width: 800,
            height: 1000,
        };
        assert!(rect.fits_within((2000, 1000)));
        assert!(!rect.fits_within((1399, 1000)));
        let overflow = CropRect {
            x: u32::MAX,
            y: 0,
            width: 2,
            height: 1,
        };
        assert!(!overflow.fits_within((u32::MAX, 1)));
    }
}
