//! Image processing.
//!
//! Stage 2 of the catalog build. Takes the photos the scan found, already
//! assigned ids, and writes a thumbnail and a full-size view for each.
//!
//! ## Output Structure
//!
//! ```text
//! site/
//! ├── wardrobe_data.json
//! └── images/
//!     ├── .cache-manifest.json        # See crate::cache
//!     ├── thumbs/
//!     │   └── shirts-img-7053.jpg     # Square-bounded thumbnail
//!     └── full/
//!         └── shirts-img-7053.jpg     # Longest edge ≤ max_edge
//! ```
//!
//! Output names come from the item id, never from the source filename, so a
//! renamed category directory does not break links held by the front end.
//!
//! ## Failures
//!
//! A photo that cannot be read or decoded is reported and skipped; the rest
//! of the run continues. Failing to write output is fatal: the output root
//! is probed before any work starts, and a write failure mid-run stops the
//! parallel loop from scheduling more photos.
//!
//! ## Parallel Processing
//!
//! Photos are processed in parallel using [rayon](https://docs.rs/rayon) on a
//! pool sized by `[processing] max_processes`. Progress events go over an
//! `mpsc` channel to whoever prints them.

use crate::cache::{self, CacheEntry, CacheManifest, CacheStats};
use crate::imaging::{BackendError, ImageBackend, RenderConfig, Sharpening, plan_render, render};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Cannot read image {}: {reason}", path.display())]
    UnreadableImage { path: PathBuf, reason: String },
    #[error("Cannot write output {}: {source}", path.display())]
    OutputWriteFailure {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ProcessError {
    /// Whether the whole run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProcessError::OutputWriteFailure { .. })
    }
}

impl From<BackendError> for ProcessError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Decode { path, reason } => ProcessError::UnreadableImage { path, reason },
            BackendError::Encode { path, reason } => ProcessError::UnreadableImage {
                path,
                reason: format!("encode failed: {reason}"),
            },
            BackendError::Write { path, source } => {
                ProcessError::OutputWriteFailure { path, source }
            }
        }
    }
}

/// Where generated images go, relative to the output root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// `images/thumbs/<id>.<ext>`
    pub fn thumb_rel(&self, id: &str, ext: &str) -> String {
        format!("images/thumbs/{id}.{ext}")
    }

    /// `images/full/<id>.<ext>`
    pub fn full_rel(&self, id: &str, ext: &str) -> String {
        format!("images/full/{id}.{ext}")
    }

    pub fn resolve(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Create the output directories and prove they are writable.
    ///
    /// Runs before any photo is touched so an unusable output root fails
    /// fast instead of once per photo.
    pub fn prepare(&self) -> Result<(), ProcessError> {
        let write_failure = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| ProcessError::OutputWriteFailure { path, source }
        };
        for dir in [
            self.root.clone(),
            self.root.join("images/thumbs"),
            self.root.join("images/full"),
        ] {
            std::fs::create_dir_all(&dir).map_err(write_failure(&dir))?;
        }
        let images = self.images_dir();
        tempfile::Builder::new()
            .prefix(".write-probe-")
            .tempfile_in(&images)
            .map_err(write_failure(&images))?;
        Ok(())
    }
}

/// One photo to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessJob {
    pub id: String,
    pub source: PathBuf,
    /// Source path relative to the source root, for display.
    pub source_rel: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Outputs were already up to date.
    Cached,
    /// Outputs were (re)written.
    Encoded,
}

/// Result of processing one photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub id: String,
    /// Relative to the output root.
    pub thumb_path: String,
    /// Relative to the output root.
    pub full_path: String,
    pub content_hash: String,
    pub status: RenderStatus,
}

/// A photo that was skipped.
#[derive(Debug)]
pub struct FailedImage {
    pub id: String,
    pub source_rel: String,
    pub error: ProcessError,
}

/// Progress events emitted while processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Started {
        total: usize,
    },
    ImageProcessed {
        /// 1-based position in the job list.
        index: usize,
        id: String,
        source_path: String,
        status: RenderStatus,
    },
    ImageFailed {
        index: usize,
        id: String,
        source_path: String,
        reason: String,
    },
}

/// Settings for a processing run.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub render: RenderConfig,
    /// Consult and update the cache manifest.
    pub use_cache: bool,
    /// Worker threads.
    pub threads: usize,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            use_cache: true,
            threads: 1,
        }
    }
}

/// Everything a processing run produced.
#[derive(Debug)]
pub struct ProcessResult {
    /// Successful photos, in job order.
    pub processed: Vec<ProcessedImage>,
    /// Skipped photos, in job order.
    pub failures: Vec<FailedImage>,
    pub cache_stats: CacheStats,
}

/// Hash, check the cache, and render one photo if needed.
pub fn process_photo(
    backend: &impl ImageBackend,
    job: &ProcessJob,
    layout: &OutputLayout,
    render_config: &RenderConfig,
    params_hash: &str,
    cache: &CacheManifest,
) -> Result<ProcessedImage, ProcessError> {
    let content_hash =
        cache::hash_file(&job.source).map_err(|e| ProcessError::UnreadableImage {
            path: job.source.clone(),
            reason: e.to_string(),
        })?;

    let ext = render_config.format.extension();
    let thumb_path = layout.thumb_rel(&job.id, ext);
    let full_path = layout.full_rel(&job.id, ext);

    let status = match cache.find_cached(&job.id, &content_hash, params_hash, layout.root()) {
        Some(entry) if entry.thumb_path == thumb_path && entry.full_path == full_path => {
            tracing::debug!(id = %job.id, "cache hit");
            RenderStatus::Cached
        }
        _ => {
            let params = plan_render(
                &job.source,
                &layout.resolve(&thumb_path),
                &layout.resolve(&full_path),
                render_config,
            );
            render(backend, &params)?;
            RenderStatus::Encoded
        }
    };

    Ok(ProcessedImage {
        id: job.id.clone(),
        thumb_path,
        full_path,
        content_hash,
        status,
    })
}

/// Process all jobs in parallel.
///
/// Per-photo failures are collected in [`ProcessResult::failures`]. A fatal
/// error stops scheduling and is returned as `Err`.
pub fn process_all(
    backend: &impl ImageBackend,
    jobs: &[ProcessJob],
    layout: &OutputLayout,
    options: &ProcessOptions,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    layout.prepare()?;

    let images_dir = layout.images_dir();
    let mut cache = if options.use_cache {
        CacheManifest::load(&images_dir)
    } else {
        CacheManifest::empty()
    };
    let params_hash = cache::hash_render_params(&options.render, Some(Sharpening::light()));

    if let Some(tx) = &progress {
        let _ = tx.send(ProcessEvent::Started { total: jobs.len() });
    }

    let run = || {
        jobs.par_iter()
            .enumerate()
            .map(|(i, job)| {
                let outcome =
                    process_photo(backend, job, layout, &options.render, &params_hash, &cache);
                let event = match &outcome {
                    Ok(image) => ProcessEvent::ImageProcessed {
                        index: i + 1,
                        id: job.id.clone(),
                        source_path: job.source_rel.clone(),
                        status: image.status,
                    },
                    Err(e) => ProcessEvent::ImageFailed {
                        index: i + 1,
                        id: job.id.clone(),
                        source_path: job.source_rel.clone(),
                        reason: e.to_string(),
                    },
                };
                if let Some(tx) = &progress {
                    let _ = tx.send(event);
                }
                match outcome {
                    Err(e) if e.is_fatal() => Err(e),
                    other => Ok(other),
                }
            })
            .collect::<Result<Vec<_>, ProcessError>>()
    };
    let outcomes = match rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(run)?,
        Err(e) => {
            tracing::warn!(error = %e, "cannot build worker pool; using the global pool");
            run()?
        }
    };

    let mut result = ProcessResult {
        processed: Vec::new(),
        failures: Vec::new(),
        cache_stats: CacheStats::default(),
    };
    for (job, outcome) in jobs.iter().zip(outcomes) {
        match outcome {
            Ok(image) => {
                match image.status {
                    RenderStatus::Cached => result.cache_stats.hit(),
                    RenderStatus::Encoded => result.cache_stats.miss(),
                }
                cache.insert(
                    image.id.clone(),
                    CacheEntry {
                        source_hash: image.content_hash.clone(),
                        params_hash: params_hash.clone(),
                        thumb_path: image.thumb_path.clone(),
                        full_path: image.full_path.clone(),
                    },
                );
                result.processed.push(image);
            }
            Err(error) => {
                tracing::warn!(id = %job.id, error = %error, "skipping photo");
                result.failures.push(FailedImage {
                    id: job.id.clone(),
                    source_rel: job.source_rel.clone(),
                    error,
                });
            }
        }
    }

    cache.retain_ids(result.processed.iter().map(|p| p.id.as_str()));
    cache
        .save(&images_dir)
        .map_err(|source| ProcessError::OutputWriteFailure {
            path: cache::manifest_path(&images_dir),
            source,
        })?;

    tracing::info!(
        processed = result.processed.len(),
        failed = result.failures.len(),
        cache = %result.cache_stats,
        "images processed"
    );
    Ok(result)
}
