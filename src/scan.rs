//! Source tree discovery.
//!
//! Stage 1 of the catalog build. Finds every photo and the category it
//! belongs to.
//!
//! ## Directory Structure
//!
//! ```text
//! photos/                          # Source root
//! ├── catalog.toml                 # Configuration (optional)
//! ├── wardrobe_data.json           # Local overrides (optional)
//! ├── Shirts/                      # Category "shirts"
//! │   ├── IMG_7053.HEIC
//! │   └── IMG_7055.jpg
//! └── Shoes/
//!     └── boots.png
//! ```
//!
//! Only the first level of directories is a category and only files directly
//! inside them are photos. Files at the root and deeper subdirectories are
//! ignored, as are hidden entries.
//!
//! Walking and planning are separate: [`plan`] maps a list of paths to
//! photos without touching the filesystem, so ordering and filtering are
//! testable in isolation.

use crate::identity::normalize_category;
use crate::imaging::supported_input_extensions;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Source root not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Source root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// One source photo and where it sits in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePhoto {
    /// Normalized category.
    pub category: String,
    /// Basename, as found on disk.
    pub filename: String,
    /// Full path for reading.
    pub path: PathBuf,
    /// `<dir>/<filename>` relative to the source root, forward slashes.
    pub rel_path: String,
}

/// Whether a file extension is a recognized photo format (case-insensitive).
pub fn is_photo(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| supported_input_extensions().contains(&ext.as_str()))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Walk the source root and plan the photo list.
pub fn scan(root: &Path) -> Result<Vec<SourcePhoto>, ScanError> {
    if !root.exists() {
        return Err(ScanError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .max_depth(2)
        .into_iter()
        .filter_entry(|e| !is_hidden(e));
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => tracing::warn!("Error accessing entry: {}", e),
        }
    }

    let photos = plan(root, files);
    tracing::debug!(photos = photos.len(), root = %root.display(), "scan complete");
    Ok(photos)
}

/// Map file paths under `root` to photos, in catalog order.
///
/// Pure: only the path strings are inspected. Order is category, then
/// filename, then full path, independent of the input order.
pub fn plan(root: &Path, paths: impl IntoIterator<Item = PathBuf>) -> Vec<SourcePhoto> {
    let mut photos: Vec<SourcePhoto> = paths
        .into_iter()
        .filter_map(|path| {
            let rel = path.strip_prefix(root).ok()?;
            let parts: Vec<&str> = rel
                .components()
                .filter_map(|c| match c {
                    Component::Normal(s) => s.to_str(),
                    _ => None,
                })
                .collect();
            let [dir, filename] = parts.as_slice() else {
                tracing::debug!(path = %rel.display(), "ignoring file outside a category directory");
                return None;
            };
            if dir.starts_with('.') || filename.starts_with('.') || !is_photo(&path) {
                return None;
            }
            let category = normalize_category(dir);
            if category.is_empty() {
                return None;
            }
            Some(SourcePhoto {
                category,
                filename: filename.to_string(),
                rel_path: format!("{dir}/{filename}"),
                path,
            })
        })
        .collect();

    photos.sort_by(|a, b| {
        (&a.category, &a.filename, &a.path).cmp(&(&b.category, &b.filename, &b.path))
    });
    photos
}
