//! High-level image operations.
//!
//! These functions turn catalog configuration into render parameters and
//! hand them to a backend.

use super::backend::{BackendError, ImageBackend, Rendered};
use super::params::{FullParams, Quality, RenderParams, Sharpening, ThumbnailParams};
use crate::config::{CatalogConfig, OutputFormat, ThumbnailMode};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// The image-related subset of [`CatalogConfig`].
///
/// Everything here feeds the cache key: changing any field re-renders
/// every photo.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub thumb_size: u32,
    pub thumb_mode: ThumbnailMode,
    pub thumb_quality: Quality,
    pub full_max_edge: u32,
    pub full_quality: Quality,
}

impl From<&CatalogConfig> for RenderConfig {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            format: config.output.format,
            thumb_size: config.thumbnails.size,
            thumb_mode: config.thumbnails.mode,
            thumb_quality: Quality::new(config.thumbnails.quality),
            full_max_edge: config.full.max_edge,
            full_quality: Quality::new(config.full.quality),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::from(&CatalogConfig::default())
    }
}

/// Build the parameters for rendering one source photo.
pub fn plan_render(
    source: &Path,
    thumb_output: &Path,
    full_output: &Path,
    config: &RenderConfig,
) -> RenderParams {
    RenderParams {
        source: source.to_path_buf(),
        format: config.format,
        full: FullParams {
            output: full_output.to_path_buf(),
            max_edge: config.full_max_edge,
            quality: config.full_quality,
        },
        thumbnail: ThumbnailParams {
            output: thumb_output.to_path_buf(),
            size: config.thumb_size,
            mode: config.thumb_mode,
            quality: config.thumb_quality,
            sharpening: Some(Sharpening::light()),
        },
    }
}

/// Render both renditions of one photo.
pub fn render(backend: &impl ImageBackend, params: &RenderParams) -> Result<Rendered> {
    let rendered = backend.render(params)?;
    tracing::debug!(
        source = %params.source.display(),
        width = rendered.source.width,
        height = rendered.source.height,
        "rendered"
    );
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::*;
    use std::path::PathBuf;

    #[test]
    fn render_config_follows_catalog_config() {
        let mut config = CatalogConfig::default();
        config.thumbnails.mode = ThumbnailMode::Crop;
        config.thumbnails.quality = 70;
        config.full.max_edge = 2048;
        config.output.format = OutputFormat::Avif;

        let rc = RenderConfig::from(&config);
        assert_eq!(rc.thumb_mode, ThumbnailMode::Crop);
        assert_eq!(rc.thumb_quality, Quality::new(70));
        assert_eq!(rc.full_max_edge, 2048);
        assert_eq!(rc.format, OutputFormat::Avif);
    }

    #[test]
    fn plan_render_uses_given_outputs() {
        let params = plan_render(
            Path::new("/photos/shirts/a.jpg"),
            Path::new("/site/images/thumbs/shirts-a.jpg"),
            Path::new("/site/images/full/shirts-a.jpg"),
            &RenderConfig::default(),
        );
        assert_eq!(params.source, PathBuf::from("/photos/shirts/a.jpg"));
        assert_eq!(
            params.thumbnail.output,
            PathBuf::from("/site/images/thumbs/shirts-a.jpg")
        );
        assert_eq!(params.full.output, PathBuf::from("/site/images/full/shirts-a.jpg"));
        assert_eq!(params.full.max_edge, 1600);
        assert_eq!(params.thumbnail.size, 360);
        assert_eq!(params.thumbnail.quality, Quality::new(80));
        assert!(params.thumbnail.sharpening.is_some());
    }

    #[test]
    fn render_delegates_to_backend() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::with_dimensions(3024, 4032);
        let params = plan_render(
            Path::new("/photos/shirts/a.jpg"),
            &tmp.path().join("t.jpg"),
            &tmp.path().join("f.jpg"),
            &RenderConfig::default(),
        );

        let rendered = render(&backend, &params).unwrap();

        assert_eq!(rendered.full.height, 1600);
        assert_eq!(rendered.thumbnail.height, 360);
        assert_eq!(backend.rendered_sources(), vec!["/photos/shirts/a.jpg"]);
    }
}
