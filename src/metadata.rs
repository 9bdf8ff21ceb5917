//! Metadata resolution for catalog items.
//!
//! Each item's title, category, tags and notes can come from three places:
//!
//! ## Authoritative override
//!
//! A row in the shared spreadsheet (or its local JSON stand-in). This is the
//! primary editing surface and wins whenever it has a value.
//!
//! ## Prior artifact
//!
//! The previously generated catalog. When a row disappears from the
//! spreadsheet, or the spreadsheet cannot be reached at all, the values it
//! last contributed live on here. Controlled by `[merge] prior_fallback`.
//!
//! ## Generated defaults
//!
//! - **Title**: from the filename stem, `IMG_7055.HEIC` → "Img 7055"
//! - **Category**: the source directory
//! - **Tags**, **Notes**: empty
//!
//! ## Resolution priority
//!
//! Each field is resolved independently. The first non-empty value wins:
//!
//! ```text
//! field: override → prior (if enabled) → default
//! ```
//!
//! Tags are the exception: they are unioned rather than replaced. Override
//! tags come first in their own order, then prior tags not already present,
//! compared case-insensitively.

use crate::identity::normalize_category;
use crate::naming::title_from_filename;
use crate::overrides::OverrideRecord;
use crate::types::Item;
use std::collections::HashSet;

/// Resolve a metadata field from multiple sources.
///
/// Takes a list of optional values in priority order and returns the first
/// non-None, non-empty value, trimmed.
///
/// ```text
/// title: resolve(&[override_title, prior_title, default_title])
/// ```
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Values generated from the photo itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub title: String,
    pub category: String,
}

impl Defaults {
    pub fn for_photo(category: &str, filename: &str) -> Self {
        Self {
            title: title_from_filename(filename),
            category: normalize_category(category),
        }
    }
}

/// Which fallback tiers the merge may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    /// Use prior artifact values when the override has none.
    pub prior_fallback: bool,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            prior_fallback: true,
        }
    }
}

/// Final values for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
    pub notes: String,
}

/// Merge the three tiers for one item.
pub fn merge(
    defaults: &Defaults,
    authoritative: Option<&OverrideRecord>,
    prior: Option<&Item>,
    policy: MergePolicy,
) -> ResolvedMetadata {
    let prior = prior.filter(|_| policy.prior_fallback);

    let title = resolve(&[
        authoritative.and_then(|o| o.title.as_deref()),
        prior.map(|p| p.title.as_str()),
    ])
    .unwrap_or_else(|| defaults.title.clone());

    let category = resolve(&[
        authoritative.and_then(|o| o.category.as_deref()),
        prior.map(|p| p.category.as_str()),
    ])
    .map(|c| normalize_category(&c))
    .filter(|c| !c.is_empty())
    .unwrap_or_else(|| defaults.category.clone());

    let notes = resolve(&[
        authoritative.and_then(|o| o.notes.as_deref()),
        prior.map(|p| p.notes.as_str()),
    ])
    .unwrap_or_default();

    let tags = merge_tags(
        authoritative
            .and_then(|o| o.tags.as_deref())
            .unwrap_or_default(),
        prior.map(|p| p.tags.as_slice()).unwrap_or_default(),
    );

    ResolvedMetadata {
        title,
        category,
        tags,
        notes,
    }
}

/// Ordered, case-insensitive union of two tag lists.
///
/// Tags are trimmed and blanks dropped. The first spelling seen wins.
pub fn merge_tags(primary: &[String], secondary: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    primary
        .iter()
        .chain(secondary)
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prior_item() -> Item {
        Item {
            id: "shirts-img-7055".into(),
            category: "shirts".into(),
            filename: "IMG_7055.HEIC".into(),
            title: String::new(),
            tags: vec![],
            notes: "nice".into(),
            source_path: "shirts/IMG_7055.HEIC".into(),
            thumb_path: "images/thumbs/shirts-img-7055.jpg".into(),
            full_path: "images/full/shirts-img-7055.jpg".into(),
            content_hash: "00".into(),
            missing: false,
        }
    }

    fn defaults() -> Defaults {
        Defaults::for_photo("shirts", "IMG_7055.HEIC")
    }

    // =========================================================================
    // resolve() tests
    // =========================================================================

    #[test]
    fn resolve_picks_first_non_none() {
        assert_eq!(
            resolve(&[Some("Override"), Some("Prior")]),
            Some("Override".to_string())
        );
    }

    #[test]
    fn resolve_skips_none_and_empty() {
        assert_eq!(
            resolve(&[None, Some("  \n\t  "), Some("Fallback")]),
            Some("Fallback".to_string())
        );
    }

    #[test]
    fn resolve_returns_none_when_all_none() {
        assert_eq!(resolve(&[None, None]), None);
        assert_eq!(resolve(&[]), None);
    }

    #[test]
    fn resolve_trims_whitespace() {
        assert_eq!(
            resolve(&[Some("  Padded Title  ")]),
            Some("Padded Title".to_string())
        );
    }

    // =========================================================================
    // merge() tests
    // =========================================================================

    #[test]
    fn defaults_from_filename_and_directory() {
        let d = Defaults::for_photo("Shirts/", "IMG_7055.HEIC");
        assert_eq!(d.title, "Img 7055");
        assert_eq!(d.category, "shirts");
    }

    #[test]
    fn override_then_prior_then_default() {
        let authoritative = OverrideRecord {
            title: Some("Blue Shirt".into()),
            tags: Some(vec!["casual".into()]),
            ..OverrideRecord::default()
        };
        let resolved = merge(
            &defaults(),
            Some(&authoritative),
            Some(&prior_item()),
            MergePolicy::default(),
        );
        assert_eq!(
            resolved,
            ResolvedMetadata {
                title: "Blue Shirt".into(),
                category: "shirts".into(),
                tags: vec!["casual".into()],
                notes: "nice".into(),
            }
        );
    }

    #[test]
    fn nothing_but_defaults() {
        let resolved = merge(&defaults(), None, None, MergePolicy::default());
        assert_eq!(resolved.title, "Img 7055");
        assert_eq!(resolved.category, "shirts");
        assert!(resolved.tags.is_empty());
        assert_eq!(resolved.notes, "");
    }

    #[test]
    fn empty_override_field_falls_through() {
        let authoritative = OverrideRecord {
            notes: Some("   ".into()),
            ..OverrideRecord::default()
        };
        let resolved = merge(
            &defaults(),
            Some(&authoritative),
            Some(&prior_item()),
            MergePolicy::default(),
        );
        assert_eq!(resolved.notes, "nice");
    }

    #[test]
    fn prior_keeps_values_when_override_missing() {
        let mut prior = prior_item();
        prior.title = "Blue Shirt".into();
        prior.tags = vec!["casual".into()];
        let resolved = merge(&defaults(), None, Some(&prior), MergePolicy::default());
        assert_eq!(resolved.title, "Blue Shirt");
        assert_eq!(resolved.tags, vec!["casual"]);
        assert_eq!(resolved.notes, "nice");
    }

    #[test]
    fn prior_ignored_when_fallback_disabled() {
        let mut prior = prior_item();
        prior.title = "Blue Shirt".into();
        prior.tags = vec!["casual".into()];
        let resolved = merge(
            &defaults(),
            None,
            Some(&prior),
            MergePolicy {
                prior_fallback: false,
            },
        );
        assert_eq!(resolved.title, "Img 7055");
        assert!(resolved.tags.is_empty());
        assert_eq!(resolved.notes, "");
    }

    #[test]
    fn override_category_is_normalized() {
        let authoritative = OverrideRecord {
            category: Some(" Tops ".into()),
            ..OverrideRecord::default()
        };
        let resolved = merge(&defaults(), Some(&authoritative), None, MergePolicy::default());
        assert_eq!(resolved.category, "tops");
    }

    #[test]
    fn tags_union_authoritative_first() {
        let authoritative = OverrideRecord {
            tags: Some(vec!["Casual".into(), "blue".into()]),
            ..OverrideRecord::default()
        };
        let mut prior = prior_item();
        prior.tags = vec!["casual".into(), "summer".into(), "BLUE".into()];
        let resolved = merge(
            &defaults(),
            Some(&authoritative),
            Some(&prior),
            MergePolicy::default(),
        );
        assert_eq!(resolved.tags, vec!["Casual", "blue", "summer"]);
    }

    // =========================================================================
    // merge_tags() tests
    // =========================================================================

    #[test]
    fn merge_tags_drops_blanks_and_trims() {
        let tags = merge_tags(&[" a ".into(), "".into()], &["  ".into(), "b".into()]);
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn merge_tags_dedups_within_one_list() {
        let tags = merge_tags(&["x".into(), "X".into(), "y".into()], &[]);
        assert_eq!(tags, vec!["x", "y"]);
    }
}
