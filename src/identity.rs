//! Stable item identities.
//!
//! Every cataloged photo gets an id that must survive regeneration: notes
//! typed into the spreadsheet, or into a browser, are keyed by it. The
//! default id is a pure function of `(category, filename)`:
//!
//! ```text
//! Shirts/IMG_7053.HEIC  →  shirts-img-7053
//! ```
//!
//! An override source can assign an explicit id to a file (a spreadsheet row
//! that names the file but carries its own id). Explicit ids are supplied as
//! *pins* and win over the default. Once written to the artifact a pin keeps
//! working through the prior artifact, so it survives the row being deleted.
//!
//! Two distinct files resolving to the same id is a hard error: silently
//! keeping one of them would attach notes to the wrong photo.

use crate::naming::{self, SLUG_SEPARATOR};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Duplicate identity '{id}': {} and {} resolve to the same item", first.display(), second.display())]
    DuplicateIdentity {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Normalize a directory name into a category.
///
/// Trims whitespace and trailing path separators, then lowercases, so that
/// `Shirts`, `shirts/` and `SHIRTS` all name the same category.
pub fn normalize_category(dir_name: &str) -> String {
    dir_name
        .trim()
        .trim_end_matches(['/', '\\'])
        .trim()
        .to_lowercase()
}

/// Default id for a photo: `<category>-<stem>` reduced to `[a-z0-9-]`.
///
/// Deterministic and independent of filesystem iteration order.
/// When nothing URL-safe survives (e.g. a filename in a non-Latin script),
/// falls back to a short content-free hash of the normalized inputs so the
/// id is still stable.
pub fn default_id(category: &str, filename: &str) -> String {
    let category = normalize_category(category);
    let stem = naming::file_stem(filename).to_lowercase();
    let joined = format!("{category}{SLUG_SEPARATOR}{stem}");
    let slug = naming::slugify(&joined);

    let stem_slug = naming::slugify(&stem);
    if stem_slug.is_empty() {
        let digest = Sha256::digest(joined.as_bytes());
        let short: String = format!("{digest:x}").chars().take(12).collect();
        if slug.is_empty() {
            return short;
        }
        return format!("{slug}{SLUG_SEPARATOR}{short}");
    }
    slug
}

/// Key under which explicit ids are pinned: normalized category plus the
/// lowercased filename, so pins survive case-only renames.
pub fn pin_key(category: &str, filename: &str) -> (String, String) {
    (normalize_category(category), filename.to_lowercase())
}

/// Whether `id` can be used as given: a non-empty `[a-z0-9-]` slug.
///
/// Ids become file names under `images/`, so anything else (a `/`, a `..`,
/// uppercase) is refused rather than repaired.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && naming::slugify(id) == id
}

/// Assigns ids to source files and detects collisions.
#[derive(Debug, Default)]
pub struct IdentityResolver {
    pins: HashMap<(String, String), String>,
    claimed: HashMap<String, PathBuf>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver with explicit ids keyed by [`pin_key`].
    pub fn with_pins(pins: HashMap<(String, String), String>) -> Self {
        Self {
            pins,
            claimed: HashMap::new(),
        }
    }

    /// The id a file would get, without claiming it.
    pub fn id_for(&self, category: &str, filename: &str) -> String {
        self.pins
            .get(&pin_key(category, filename))
            .cloned()
            .unwrap_or_else(|| default_id(category, filename))
    }

    /// Resolve and claim the id for the file at `path`.
    ///
    /// Resolving the same path twice is idempotent. A different path landing
    /// on an already-claimed id is a [`IdentityError::DuplicateIdentity`];
    /// the two paths are reported in sorted order so the message does not
    /// depend on which file was seen first.
    pub fn resolve(
        &mut self,
        category: &str,
        filename: &str,
        path: &Path,
    ) -> Result<String, IdentityError> {
        let id = self.id_for(category, filename);
        match self.claimed.get(&id) {
            Some(existing) if existing != path => {
                let (first, second) = if existing.as_path() <= path {
                    (existing.clone(), path.to_path_buf())
                } else {
                    (path.to_path_buf(), existing.clone())
                };
                Err(IdentityError::DuplicateIdentity { id, first, second })
            }
            Some(_) => Ok(id),
            None => {
                self.claimed.insert(id.clone(), path.to_path_buf());
                Ok(id)
            }
        }
    }
}
