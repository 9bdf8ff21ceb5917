//! # Wardrobe Catalog
//!
//! Turns a directory of clothing photos into a browsable catalog: one
//! thumbnail and one full view per photo, plus `wardrobe_data.json`
//! describing every item.
//!
//! # Pipeline
//!
//! ```text
//! 1. Scan        photos/<category>/<file>  →  source photos
//! 2. Identify    source photos             →  stable item ids
//! 3. Render      source photos             →  images/thumbs, images/full
//! 4. Merge       overrides + prior catalog →  title, category, tags, notes
//! 5. Write       items                     →  wardrobe_data.json
//! ```
//!
//! Ids are resolved for every photo before any image is rendered, so a
//! collision stops the run before the output directory is touched. Renders
//! are skipped when the source bytes and render settings are unchanged.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the source root and lists photos in catalog order |
//! | [`identity`] | Derives item ids and detects collisions |
//! | [`imaging`] | Decoding (HEIC via an external converter), resizing, encoding |
//! | [`process`] | Parallel rendering with per-photo failure isolation |
//! | [`cache`] | Content-hash manifest that makes re-runs skip unchanged photos |
//! | [`held`] | Previous entries of photos that failed to render |
//! | [`overrides`] | Authoritative metadata sources with timeout and fallback |
//! | [`metadata`] | Per-field merge of override, prior catalog and defaults |
//! | [`catalog`] | Runs the stages and assembles the artifact |
//! | [`artifact`] | Atomic read/write of `wardrobe_data.json` |
//! | [`config`] | `catalog.toml` loading and validation |
//! | [`types`] | Serialized catalog types (`Item`, `Artifact`) |
//! | [`naming`] | Filename stems, slugs and default titles |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Previous Catalog as Memory
//!
//! The previous `wardrobe_data.json` is read at the start of every run. It
//! keeps explicitly assigned ids attached to their files, supplies values
//! when the spreadsheet is unreachable, and keeps items whose photo was
//! deleted (flagged `missing`) so hand-written notes are never lost. The
//! entry of a photo that fails to render is held aside and comes back once
//! the photo renders again.
//!
//! ## Degraded Mode
//!
//! Override sources are fetched on a helper thread with a timeout. When
//! none answers, the build continues on previous values and defaults and
//! says so in the summary.

pub mod artifact;
mod atomic;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod held;
pub mod identity;
pub mod imaging;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod overrides;
pub mod process;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
