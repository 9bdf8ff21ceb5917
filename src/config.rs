//! Catalog configuration.
//!
//! Handles loading, validating, and merging `catalog.toml`. Stock defaults
//! are overridden by an optional `catalog.toml` in the source root; a few
//! CLI flags override the merged result.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [thumbnails]
//! size = 360                # Square bound in pixels
//! mode = "fit"              # "fit" (letterbox-free shrink) or "crop" (center crop)
//! quality = 80
//!
//! [full]
//! max_edge = 1600           # Longest edge of the full view, never upscaled
//! quality = 85
//!
//! [output]
//! format = "jpeg"           # "jpeg" or "avif"
//!
//! [merge]
//! prior_fallback = true     # Keep previously generated values when a row disappears
//!
//! [overrides]
//! json = "wardrobe_data.json"
//! # sheet = "sheet_values.json"
//! timeout_secs = 10
//!
//! [heic]
//! command = ["heif-convert", "{input}", "{output}"]
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-collection config file, looked up in the source root.
pub const CONFIG_FILENAME: &str = "catalog.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Catalog configuration loaded from `catalog.toml`.
///
/// All fields have defaults; a config file need only name what it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub thumbnails: ThumbnailsConfig,
    pub full: FullConfig,
    pub output: OutputConfig,
    pub merge: MergeConfig,
    pub overrides: OverridesConfig,
    pub heic: HeicConfig,
    pub processing: ProcessingConfig,
}

impl CatalogConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thumbnails.size == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.size must be non-zero".into(),
            ));
        }
        if self.full.max_edge == 0 {
            return Err(ConfigError::Validation(
                "full.max_edge must be non-zero".into(),
            ));
        }
        for (key, q) in [
            ("thumbnails.quality", self.thumbnails.quality),
            ("full.quality", self.full.quality),
        ] {
            if !(1..=100).contains(&q) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }
        if self.overrides.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "overrides.timeout_secs must be non-zero".into(),
            ));
        }
        let cmd = &self.heic.command;
        if cmd.is_empty()
            || !cmd.iter().any(|a| a.contains("{input}"))
            || !cmd.iter().any(|a| a.contains("{output}"))
        {
            return Err(ConfigError::Validation(
                "heic.command must name a program and use {input} and {output}".into(),
            ));
        }
        Ok(())
    }
}

/// How the thumbnail fills its square bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailMode {
    /// Shrink until the whole photo fits inside the square.
    #[default]
    Fit,
    /// Fill the square and center-crop the overflow.
    Crop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// Edge of the square bound, in pixels.
    pub size: u32,
    pub mode: ThumbnailMode,
    pub quality: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            size: 360,
            mode: ThumbnailMode::Fit,
            quality: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FullConfig {
    /// Longest edge of the full view. Smaller photos keep their size.
    pub max_edge: u32,
    pub quality: u32,
}

impl Default for FullConfig {
    fn default() -> Self {
        Self {
            max_edge: 1600,
            quality: 85,
        }
    }
}

/// Lossy web format for generated images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Avif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Avif => "avif",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// Fall back to the previous artifact's values when the authoritative
    /// source has nothing for a field.
    pub prior_fallback: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            prior_fallback: true,
        }
    }
}

/// Where authoritative metadata comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverridesConfig {
    /// Local JSON file. Relative paths resolve against the source root.
    pub json: Option<PathBuf>,
    /// Exported spreadsheet values grid, tried before `json`.
    pub sheet: Option<PathBuf>,
    /// Upper bound for fetching each source.
    pub timeout_secs: u64,
}

impl Default for OverridesConfig {
    fn default() -> Self {
        Self {
            json: Some(PathBuf::from("wardrobe_data.json")),
            sheet: None,
            timeout_secs: 10,
        }
    }
}

/// External converter for HEIC/HEIF sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeicConfig {
    /// Program and arguments; `{input}` and `{output}` are substituted.
    /// The output is a PNG in a temporary directory.
    pub command: Vec<String>,
}

impl Default for HeicConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "heif-convert".to_string(),
                "{input}".to_string(),
                "{output}".to_string(),
            ],
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(CatalogConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `catalog.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
        path: config_path.clone(),
        source,
    })?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<CatalogConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: CatalogConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config for a source root: stock defaults plus `catalog.toml`.
pub fn load_config(source_root: &Path) -> Result<CatalogConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(source_root)?;
    resolve_config(base, overlay)
}

/// Resolve a configured path against the source root.
pub fn resolve_path(source_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        source_root.join(path)
    }
}

/// Returns a fully-commented stock `catalog.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Wardrobe Catalog Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Place this file in the photo source
# root as catalog.toml. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Edge of the square the thumbnail must fit in, in pixels.
size = 360

# "fit" shrinks the whole photo into the square (aspect preserved).
# "crop" fills the square and center-crops the overflow.
mode = "fit"

# Lossy encoding quality (1 = worst, 100 = best).
quality = 80

# ---------------------------------------------------------------------------
# Full-size view
# ---------------------------------------------------------------------------
[full]
# Longest edge in pixels. Smaller photos are never upscaled.
max_edge = 1600
quality = 85

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# "jpeg" (universally supported) or "avif" (smaller, slower to encode).
format = "jpeg"

# ---------------------------------------------------------------------------
# Metadata merge
# ---------------------------------------------------------------------------
[merge]
# When the spreadsheet has no value for a field, keep the value from the
# previously generated catalog instead of reverting to the default.
prior_fallback = true

# ---------------------------------------------------------------------------
# Authoritative metadata sources
# ---------------------------------------------------------------------------
[overrides]
# Local JSON file ({"items": [{"id": ..., "title": ...}]}).
# Relative paths resolve against the source root.
json = "wardrobe_data.json"

# Exported spreadsheet values grid; tried first when set.
# sheet = "sheet_values.json"

# Seconds to wait for each source before falling back.
timeout_secs = 10

# ---------------------------------------------------------------------------
# HEIC / HEIF decoding
# ---------------------------------------------------------------------------
[heic]
# External converter writing a PNG. {input} and {output} are substituted.
# macOS alternative: ["sips", "-s", "format", "png", "{input}", "--out", "{output}"]
command = ["heif-convert", "{input}", "{output}"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
