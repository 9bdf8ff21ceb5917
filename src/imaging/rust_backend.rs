//! Pure Rust image processing backend.
//!
//! Everything except HEIC decoding is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Decode (HEIC, HEIF) | external converter from `[heic] command`, then PNG decode |
//! | EXIF orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Thumbnail crop | `DynamicImage::resize_to_fill` |
//! | Sharpening | `DynamicImage::unsharpen` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |

use super::backend::{BackendError, Dimensions, ImageBackend, Rendered};
use super::calculations::{bounded_dimensions, thumbnail_dimensions};
use super::params::{Quality, RenderParams};
use crate::config::{OutputFormat, ThumbnailMode};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::path::Path;
use std::process::Command;

/// Extensions the backend accepts as source photos (lowercase).
const INPUT_EXTENSIONS: &[&str] = &[
    "heic", "heif", "jpg", "jpeg", "png", "tif", "tiff", "webp",
];

/// Returns the set of image file extensions the backend can decode.
pub fn supported_input_extensions() -> &'static [&'static str] {
    INPUT_EXTENSIONS
}

fn is_heic(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("heic") || e.eq_ignore_ascii_case("heif"))
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    heic_command: Vec<String>,
}

impl RustBackend {
    /// `heic_command` is the converter program and its arguments, with
    /// `{input}` and `{output}` placeholders.
    pub fn new(heic_command: Vec<String>) -> Self {
        Self { heic_command }
    }

    fn load_image(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        if is_heic(path) {
            self.convert_heic(path)
        } else {
            decode_file(path)
        }
    }

    /// Run the external converter into a scratch PNG and decode that.
    fn convert_heic(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        let (program, args) = self
            .heic_command
            .split_first()
            .ok_or_else(|| BackendError::decode(path, "no HEIC converter configured"))?;

        let scratch = tempfile::TempDir::new().map_err(|e| BackendError::decode(path, e))?;
        let converted = scratch.path().join("converted.png");
        let input = path.to_string_lossy();
        let output = converted.to_string_lossy();
        let args: Vec<String> = args
            .iter()
            .map(|a| a.replace("{input}", &input).replace("{output}", &output))
            .collect();

        let result = Command::new(program)
            .args(&args)
            .output()
            .map_err(|e| BackendError::decode(path, format!("cannot run {program}: {e}")))?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(BackendError::decode(
                path,
                format!("{program} failed: {}", stderr.trim()),
            ));
        }

        decode_file(&converted).map_err(|e| match e {
            BackendError::Decode { reason, .. } => BackendError::decode(path, reason),
            other => other,
        })
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new(crate::config::HeicConfig::default().command)
    }
}

/// Decode an image and rotate it upright according to its EXIF orientation.
fn decode_file(path: &Path) -> Result<DynamicImage, BackendError> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| BackendError::decode(path, e))?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| BackendError::decode(path, e))?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).map_err(|e| BackendError::decode(path, e))?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Encode into memory, then replace the destination atomically.
fn save_image(
    img: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    quality: Quality,
) -> Result<(), BackendError> {
    let q = quality.value();
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut bytes = Vec::new();
    let encoded = match format {
        OutputFormat::Jpeg => rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, q)),
        OutputFormat::Avif => {
            rgb.write_with_encoder(AvifEncoder::new_with_speed_quality(&mut bytes, 6, q))
        }
    };
    encoded.map_err(|e| BackendError::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    crate::atomic::write_atomic(path, &bytes).map_err(|source| BackendError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn dims(img: &DynamicImage) -> Dimensions {
    Dimensions {
        width: img.width(),
        height: img.height(),
    }
}

impl ImageBackend for RustBackend {
    fn render(&self, params: &RenderParams) -> Result<Rendered, BackendError> {
        let img = self.load_image(&params.source)?;
        let source = (img.width(), img.height());

        let (fw, fh) = bounded_dimensions(source, params.full.max_edge);
        let full = if (fw, fh) == source {
            img.clone()
        } else {
            img.resize_exact(fw, fh, FilterType::Lanczos3)
        };
        save_image(&full, &params.full.output, params.format, params.full.quality)?;

        let thumb = &params.thumbnail;
        let (tw, th) = thumbnail_dimensions(source, thumb.size, thumb.mode);
        let resized = match thumb.mode {
            ThumbnailMode::Crop => img.resize_to_fill(tw, th, FilterType::Lanczos3),
            ThumbnailMode::Fit if (tw, th) == source => img.clone(),
            ThumbnailMode::Fit => img.resize_exact(tw, th, FilterType::Lanczos3),
        };
        let final_thumb = match thumb.sharpening {
            Some(s) => resized.unsharpen(s.sigma, s.threshold),
            None => resized,
        };
        save_image(&final_thumb, &thumb.output, params.format, thumb.quality)?;

        Ok(Rendered {
            source: source.into(),
            full: dims(&full),
            thumbnail: dims(&final_thumb),
        })
    }
}
