//! Rendition cache for incremental builds.
//!
//! Re-encoding every photo on each run is the slow part of a build. This
//! module lets the process stage skip a photo whose bytes and render
//! parameters are unchanged since the last successful build.
//!
//! # Design
//!
//! The cache covers only rendering. Identity resolution and metadata merging
//! always run, so a spreadsheet edit shows up on the next build without a
//! cache bust.
//!
//! ## Cache keys
//!
//! Entries are keyed by item id. Ids are stable across runs, so the id also
//! pins the output filenames.
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives copies and `git checkout`.
//!
//! - **`params_hash`**: SHA-256 of every render setting (format, sizes,
//!   thumbnail mode, qualities, sharpening). Editing `catalog.toml`
//!   re-renders everything.
//!
//! A cache hit requires:
//! 1. An entry for the id with matching `source_hash` and `params_hash`
//! 2. Both recorded output files still exist on disk
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<output>/images/.cache-manifest.json`,
//! next to the images it describes. Entries are kept in a sorted map so the
//! file is stable between runs.
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to `build` to start from an empty manifest. Every photo
//! is re-rendered and old outputs are overwritten.

use crate::imaging::RenderConfig;
use crate::imaging::Sharpening;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the images directory.
const MANIFEST_FILENAME: &str = ".cache-manifest.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// What was rendered for one item.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
    /// Thumbnail path relative to the output root.
    pub thumb_path: String,
    /// Full-size path relative to the output root.
    pub full_path: String,
}

/// On-disk cache manifest mapping item ids to their cache entries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: BTreeMap<String, CacheEntry>,
}

impl CacheManifest {
    /// Create an empty manifest (used for `--no-cache` or first build).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Load from the images directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(images_dir: &Path) -> Self {
        let path = manifest_path(images_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable cache manifest");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest
    }

    /// Save to the images directory, replacing any previous manifest.
    pub fn save(&self, images_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        crate::atomic::write_atomic(&manifest_path(images_dir), json.as_bytes())
    }

    /// Look up the cached renditions for an item.
    ///
    /// Returns the entry only if both hashes match **and** both output files
    /// are still on disk under `output_root`.
    pub fn find_cached(
        &self,
        id: &str,
        source_hash: &str,
        params_hash: &str,
        output_root: &Path,
    ) -> Option<&CacheEntry> {
        let entry = self.entries.get(id)?;
        let fresh = entry.source_hash == source_hash
            && entry.params_hash == params_hash
            && output_root.join(&entry.thumb_path).exists()
            && output_root.join(&entry.full_path).exists();
        fresh.then_some(entry)
    }

    /// Record the renditions written for an item, replacing any older entry.
    pub fn insert(&mut self, id: String, entry: CacheEntry) {
        self.entries.insert(id, entry);
    }

    /// Drop entries for ids not in `keep`.
    ///
    /// Keeps the manifest from growing without bound as photos come and go.
    pub fn retain_ids<'a>(&mut self, keep: impl IntoIterator<Item = &'a str>) {
        let keep: std::collections::HashSet<&str> = keep.into_iter().collect();
        self.entries.retain(|id, _| keep.contains(id.as_str()));
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// SHA-256 hash of the render settings.
///
/// If any of these change, every previously cached rendition is invalid.
pub fn hash_render_params(config: &RenderConfig, sharpening: Option<Sharpening>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"render\0");
    hasher.update(config.format.extension().as_bytes());
    hasher.update(b"\0");
    hasher.update(config.thumb_size.to_le_bytes());
    hasher.update(match config.thumb_mode {
        crate::config::ThumbnailMode::Fit => b"fit\0",
        crate::config::ThumbnailMode::Crop => b"crop",
    });
    hasher.update(config.thumb_quality.value().to_le_bytes());
    hasher.update(config.full_max_edge.to_le_bytes());
    hasher.update(config.full_quality.value().to_le_bytes());
    match sharpening {
        Some(s) => {
            hasher.update(b"\x01");
            hasher.update(s.sigma.to_le_bytes());
            hasher.update(s.threshold.to_le_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} encoded", self.misses)
        }
    }
}

/// Resolve the cache manifest path for an images directory.
pub fn manifest_path(images_dir: &Path) -> PathBuf {
    images_dir.join(MANIFEST_FILENAME)
}
