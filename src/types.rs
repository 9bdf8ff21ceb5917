//! Shared types serialized into the catalog artifact.
//!
//! The artifact is the single source of truth for the browsing layer, so
//! field order here is the field order on disk. Keep it stable: diffs
//! between regenerations should show only what actually changed.

use serde::{Deserialize, Serialize};

/// Artifact format version, written to `metadata.version`.
pub const ARTIFACT_VERSION: &str = "1.0";

/// One cataloged photo plus its resolved metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable, URL-safe identifier.
    pub id: String,
    /// Resolved category (directory name unless overridden).
    pub category: String,
    /// Original basename of the source photo.
    pub filename: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    /// Source photo, relative to the source root.
    pub source_path: String,
    /// Thumbnail, relative to the output root.
    pub thumb_path: String,
    /// Full-size view, relative to the output root.
    pub full_path: String,
    /// SHA-256 of the source bytes.
    pub content_hash: String,
    /// Set when the source photo has disappeared. The item is kept so its
    /// notes are not lost.
    #[serde(default, skip_serializing_if = "is_false")]
    pub missing: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Item {
    /// Category taken from the source directory, regardless of overrides.
    ///
    /// Used for ordering so an override that recategorizes an item does not
    /// move it around in the artifact.
    pub fn source_category(&self) -> String {
        let dir = self.source_path.split('/').next().unwrap_or_default();
        crate::identity::normalize_category(dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    #[serde(default = "default_version")]
    pub version: String,
    /// RFC 3339 UTC timestamp. The only field allowed to differ between two
    /// runs over unchanged inputs.
    pub generated_at: String,
    pub total_items: usize,
}

fn default_version() -> String {
    ARTIFACT_VERSION.to_string()
}

/// The generated catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub metadata: ArtifactMetadata,
    /// Sorted, de-duplicated category names.
    pub categories: Vec<String>,
    pub items: Vec<Item>,
}

impl Artifact {
    /// Assemble an artifact from already-ordered items.
    ///
    /// Items are taken as given; only the category list is derived.
    pub fn new(items: Vec<Item>, generated_at: String) -> Self {
        let categories: std::collections::BTreeSet<String> =
            items.iter().map(|i| i.category.clone()).collect();
        Self {
            metadata: ArtifactMetadata {
                version: ARTIFACT_VERSION.to_string(),
                generated_at,
                total_items: items.len(),
            },
            categories: categories.into_iter().collect(),
            items,
        }
    }

    pub fn find(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }
}
