//! Catalog entries held back while their photo fails to render.
//!
//! A photo that cannot be decoded is left out of the catalog for that run.
//! Its previous entry may hold the only copy of hand-written notes, so it is
//! parked in `<output>/images/.held-items.json` and read back as part of the
//! previous catalog on the next run. Once the photo renders again (or its
//! source disappears and the entry is carried forward as missing) the entry
//! is back in the artifact and leaves the held file.

use crate::types::{Artifact, Item};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

const HELD_FILENAME: &str = ".held-items.json";

const HELD_VERSION: u32 = 1;

/// Previous entries keyed by item id.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HeldItems {
    pub version: u32,
    pub items: BTreeMap<String, Item>,
}

impl HeldItems {
    pub fn empty() -> Self {
        Self {
            version: HELD_VERSION,
            items: BTreeMap::new(),
        }
    }

    /// Load from the images directory; absent or unreadable means empty.
    pub fn load(images_dir: &Path) -> Self {
        let path = held_path(images_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(held) if held.version == HELD_VERSION => held,
            Ok(_) => Self::empty(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable held items");
                Self::empty()
            }
        }
    }

    pub fn save(&self, images_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        crate::atomic::write_atomic(&held_path(images_dir), json.as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn hold(&mut self, item: Item) {
        self.items.insert(item.id.clone(), item);
    }

    /// The previous catalog with held entries added back.
    ///
    /// An id present in both keeps the catalog's version.
    pub fn restore_into(&self, prior: Option<&Artifact>) -> Option<Artifact> {
        if self.is_empty() {
            return prior.cloned();
        }
        let mut items = prior.map(|a| a.items.clone()).unwrap_or_default();
        let known: HashSet<String> = items.iter().map(|i| i.id.clone()).collect();
        items.extend(
            self.items
                .values()
                .filter(|held| !known.contains(&held.id))
                .cloned(),
        );
        let generated_at = prior
            .map(|a| a.metadata.generated_at.clone())
            .unwrap_or_default();
        Some(Artifact::new(items, generated_at))
    }
}

pub fn held_path(images_dir: &Path) -> PathBuf {
    images_dir.join(HELD_FILENAME)
}
