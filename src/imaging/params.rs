//! What to render, independent of how.
//!
//! [`RenderParams`] is handed to an [`ImageBackend`](super::ImageBackend):
//! one source photo, two renditions, one output format. The backend decodes
//! the source once and writes both files.

use crate::config::{OutputFormat, ThumbnailMode};
use std::path::PathBuf;

/// Lossy encoder quality, always within 1-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    /// Out-of-range values are clamped rather than rejected; config
    /// validation reports them before this point.
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Unsharp mask applied after downscaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    /// Gaussian blur radius.
    pub sigma: f32,
    /// Minimum brightness difference; 0 touches every pixel.
    pub threshold: i32,
}

impl Sharpening {
    /// Recovers the crispness Lanczos loses at thumbnail scale.
    pub fn light() -> Self {
        Self {
            sigma: 0.5,
            threshold: 0,
        }
    }
}

/// The full view: longest edge bounded, aspect kept, never upscaled.
#[derive(Debug, Clone, PartialEq)]
pub struct FullParams {
    pub output: PathBuf,
    pub max_edge: u32,
    pub quality: Quality,
}

/// The thumbnail: bounded to a `size` square, fitted or cropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub output: PathBuf,
    pub size: u32,
    pub mode: ThumbnailMode,
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub source: PathBuf,
    pub format: OutputFormat,
    pub full: FullParams,
    pub thumbnail: ThumbnailParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_is_clamped() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(72).value(), 72);
        assert_eq!(Quality::new(400).value(), 100);
    }
}
