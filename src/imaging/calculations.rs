//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::config::ThumbnailMode;

/// Scale `source` so its longer edge is at most `max_edge`.
///
/// Aspect ratio is preserved and images are never upscaled: a source that
/// already fits is returned unchanged. Neither edge drops below 1px.
///
/// ```
/// # use wardrobe_catalog::imaging::calculations::bounded_dimensions;
/// assert_eq!(bounded_dimensions((4000, 3000), 1600), (1600, 1200));
/// assert_eq!(bounded_dimensions((800, 600), 1600), (800, 600));
/// ```
pub fn bounded_dimensions(source: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (w, h) = source;
    let longer = w.max(h);
    if longer <= max_edge || longer == 0 {
        return (w, h);
    }
    let ratio = max_edge as f64 / longer as f64;
    if w >= h {
        (max_edge, ((h as f64 * ratio).round() as u32).max(1))
    } else {
        (((w as f64 * ratio).round() as u32).max(1), max_edge)
    }
}

/// Final thumbnail dimensions for a square bound of `size`.
///
/// - `Fit`: the whole photo inside the square, aspect preserved.
/// - `Crop`: a square, center-cropped. The square shrinks to the source's
///   short edge rather than upscaling a tiny photo.
pub fn thumbnail_dimensions(source: (u32, u32), size: u32, mode: ThumbnailMode) -> (u32, u32) {
    match mode {
        ThumbnailMode::Fit => bounded_dimensions(source, size),
        ThumbnailMode::Crop => {
            let edge = size.min(source.0.min(source.1)).max(1);
            (edge, edge)
        }
    }
}
