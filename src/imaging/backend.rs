//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait has a single operation, `render`: decode one
//! source photo and write its thumbnail and full-size renditions. Decoding
//! once per photo matters because HEIC sources go through an external
//! converter.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::RenderParams;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    /// The source could not be read or decoded. Local to one photo.
    #[error("Cannot decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
    /// The decoded image could not be encoded. Local to one photo.
    #[error("Cannot encode {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },
    /// An output file could not be written. Affects every photo.
    #[error("Cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl BackendError {
    pub fn decode(path: &Path, reason: impl ToString) -> Self {
        BackendError::Decode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Write failures mean the output tree is unusable; everything else is
    /// a problem with one photo.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BackendError::Write { .. })
    }
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// What a render produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendered {
    pub source: Dimensions,
    pub full: Dimensions,
    pub thumbnail: Dimensions,
}

/// Trait for image processing backends.
pub trait ImageBackend: Sync {
    /// Decode `params.source` and write both renditions.
    fn render(&self, params: &RenderParams) -> Result<Rendered, BackendError>;
}
