//! Catalog assembly.
//!
//! Drives one run end to end:
//!
//! ```text
//! prior artifact ─┐
//! overrides ──────┼─→ scan → identities → images → merge → carry forward → artifact
//! source tree ────┘
//! ```
//!
//! Every identity is resolved before any image is touched, so a collision
//! aborts the run without writing anything. Per-photo problems end up in the
//! [`RunReport`]; only fatal errors are returned as `Err`.
//!
//! Items whose source photo disappeared are kept with `missing: true`. Their
//! notes may exist nowhere else. For the same reason the previous entry of a
//! photo that fails to render is parked in the [`held`](crate::held) file
//! until it renders again.

use crate::artifact::{self, ArtifactError};
use crate::cache::CacheStats;
use crate::config::{CatalogConfig, OverridesConfig, effective_threads, resolve_path};
use crate::held::{self, HeldItems};
use crate::identity::{
    IdentityError, IdentityResolver, default_id, is_valid_id, normalize_category, pin_key,
};
use crate::imaging::{ImageBackend, RenderConfig};
use crate::metadata::{Defaults, MergePolicy, merge};
use crate::overrides::{JsonFileSource, OverrideMap, SheetValuesSource, SourceChain};
use crate::process::{
    self, FailedImage, OutputLayout, ProcessError, ProcessEvent, ProcessJob, ProcessOptions,
    ProcessedImage,
};
use crate::scan::{self, ScanError, SourcePhoto};
use crate::types::{Artifact, Item};
use chrono::{SecondsFormat, Utc};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Settings for a build.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub process: ProcessOptions,
    pub merge: MergePolicy,
}

impl BuildOptions {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            process: ProcessOptions {
                render: RenderConfig::from(config),
                use_cache: true,
                threads: effective_threads(&config.processing),
            },
            merge: MergePolicy {
                prior_fallback: config.merge.prior_fallback,
            },
        }
    }
}

/// Diagnostics for one run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Photos left out of the catalog, with the reason.
    pub failures: Vec<FailedImage>,
    pub warnings: Vec<String>,
    /// Ids kept from the previous catalog whose source photo is gone.
    pub missing: Vec<String>,
    pub cache_stats: CacheStats,
    /// Override source that answered, if any.
    pub override_source: Option<String>,
    /// No override source could be reached.
    pub degraded: bool,
}

/// A photo with its resolved id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPhoto {
    pub id: String,
    pub photo: SourcePhoto,
}

/// Explicit ids from the previous catalog and from override rows.
///
/// Override rows that name a `filename` win over the previous catalog. A row
/// whose filename matches several photos is disambiguated by its category;
/// if that does not settle it the row pins nothing and a warning is added.
/// Ids that are not plain slugs are never pinned either.
pub fn collect_pins(
    photos: &[SourcePhoto],
    overrides: &OverrideMap,
    prior: Option<&Artifact>,
    warnings: &mut Vec<String>,
) -> HashMap<(String, String), String> {
    let mut pins = HashMap::new();

    for item in prior.map(|a| a.items.as_slice()).unwrap_or_default() {
        let category = item.source_category();
        if item.id == default_id(&category, &item.filename) {
            continue;
        }
        if !is_valid_id(&item.id) {
            warnings.push(format!(
                "{}: previous id is not a valid slug; id not pinned",
                item.id
            ));
            continue;
        }
        pins.insert(pin_key(&category, &item.filename), item.id.clone());
    }

    for (id, record) in overrides {
        let Some(filename) = record.filename.as_deref() else {
            continue;
        };
        if !is_valid_id(id) {
            warnings.push(format!(
                "override {id}: not a valid id (lowercase letters, digits and '-' only); id not pinned"
            ));
            continue;
        }
        let mut candidates: Vec<&SourcePhoto> = photos
            .iter()
            .filter(|p| p.filename.eq_ignore_ascii_case(filename))
            .collect();
        if candidates.len() > 1 {
            if let Some(category) = record.category.as_deref() {
                let category = normalize_category(category);
                candidates.retain(|p| p.category == category);
            }
        }
        match candidates.as_slice() {
            [] => {}
            [photo] => {
                if *id != default_id(&photo.category, &photo.filename) {
                    pins.insert(pin_key(&photo.category, &photo.filename), id.clone());
                }
            }
            _ => warnings.push(format!(
                "override {id}: filename {filename} matches several photos; id not pinned"
            )),
        }
    }
    pins
}

/// Assign ids to every photo, failing on the first collision.
pub fn resolve_identities(
    photos: Vec<SourcePhoto>,
    overrides: &OverrideMap,
    prior: Option<&Artifact>,
    warnings: &mut Vec<String>,
) -> Result<Vec<PlannedPhoto>, IdentityError> {
    let mut resolver = IdentityResolver::with_pins(collect_pins(&photos, overrides, prior, warnings));
    photos
        .into_iter()
        .map(|photo| -> Result<PlannedPhoto, IdentityError> {
            let id = resolver.resolve(&photo.category, &photo.filename, &photo.path)?;
            Ok(PlannedPhoto { id, photo })
        })
        .collect()
}

/// Scan and resolve identities only. Nothing is written.
pub fn check(
    source_root: &Path,
    overrides: &OverrideMap,
    prior: Option<&Artifact>,
) -> Result<(Vec<PlannedPhoto>, Vec<String>), CatalogError> {
    let photos = scan::scan(source_root)?;
    let mut warnings = Vec::new();
    let planned = resolve_identities(photos, overrides, prior, &mut warnings)?;
    Ok((planned, warnings))
}

/// Build the artifact for the current source tree.
///
/// Writes images under `output_root` but not the artifact itself.
pub fn build(
    backend: &impl ImageBackend,
    source_root: &Path,
    output_root: &Path,
    overrides: &OverrideMap,
    prior: Option<&Artifact>,
    options: &BuildOptions,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<(Artifact, RunReport), CatalogError> {
    let mut report = RunReport::default();
    let layout = OutputLayout::new(output_root);
    let images_dir = layout.images_dir();
    let remembered = HeldItems::load(&images_dir).restore_into(prior);
    let prior = remembered.as_ref();

    let photos = scan::scan(source_root)?;
    tracing::info!(photos = photos.len(), "scanned {}", source_root.display());
    let planned = resolve_identities(photos, overrides, prior, &mut report.warnings)?;

    let jobs: Vec<ProcessJob> = planned
        .iter()
        .map(|p| ProcessJob {
            id: p.id.clone(),
            source: p.photo.path.clone(),
            source_rel: p.photo.rel_path.clone(),
        })
        .collect();
    let processed = process::process_all(backend, &jobs, &layout, &options.process, progress)?;
    report.cache_stats = processed.cache_stats;

    let prior_items: HashMap<&str, &Item> = prior
        .map(|a| a.items.iter().map(|i| (i.id.as_str(), i)).collect())
        .unwrap_or_default();

    let mut still_held = HeldItems::empty();
    for failure in &processed.failures {
        if let Some(item) = prior_items.get(failure.id.as_str()) {
            tracing::info!(id = %failure.id, "holding previous entry until the photo renders");
            still_held.hold((*item).clone());
        }
    }
    still_held
        .save(&images_dir)
        .map_err(|source| ProcessError::OutputWriteFailure {
            path: held::held_path(&images_dir),
            source,
        })?;

    let rendered: HashMap<&str, &ProcessedImage> = processed
        .processed
        .iter()
        .map(|p| (p.id.as_str(), p))
        .collect();

    let mut items = Vec::with_capacity(planned.len());
    for PlannedPhoto { id, photo } in &planned {
        let Some(image) = rendered.get(id.as_str()) else {
            continue;
        };
        let prior_item = prior_items.get(id.as_str()).copied();
        let resolved = merge(
            &Defaults::for_photo(&photo.category, &photo.filename),
            overrides.get(id),
            prior_item,
            options.merge,
        );

        let previous = prior_item.map_or(photo.category.as_str(), |p| p.category.as_str());
        if resolved.category != previous {
            report.warnings.push(format!(
                "{id}: category changed from {previous} to {}",
                resolved.category
            ));
        }

        items.push(Item {
            id: id.clone(),
            category: resolved.category,
            filename: photo.filename.clone(),
            title: resolved.title,
            tags: resolved.tags,
            notes: resolved.notes,
            source_path: photo.rel_path.clone(),
            thumb_path: image.thumb_path.clone(),
            full_path: image.full_path.clone(),
            content_hash: image.content_hash.clone(),
            missing: false,
        });
    }

    let seen: HashSet<&str> = planned.iter().map(|p| p.id.as_str()).collect();
    for item in prior.map(|a| a.items.as_slice()).unwrap_or_default() {
        if seen.contains(item.id.as_str()) {
            continue;
        }
        if !item.missing {
            report.warnings.push(format!(
                "{}: source {} is missing; kept in catalog",
                item.id, item.source_path
            ));
        }
        report.missing.push(item.id.clone());
        items.push(Item {
            missing: true,
            ..item.clone()
        });
    }

    items.sort_by(|a, b| {
        (a.source_category(), &a.filename, &a.id).cmp(&(b.source_category(), &b.filename, &b.id))
    });
    report.failures = processed.failures;

    let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    Ok((Artifact::new(items, generated_at), report))
}

/// Override sources in fallback order: spreadsheet grid, then JSON.
///
/// The stock `wardrobe_data.json` may be absent; a JSON path configured
/// anywhere else must exist.
pub fn source_chain(source_root: &Path, config: &OverridesConfig) -> SourceChain {
    let mut chain = SourceChain::new(Duration::from_secs(config.timeout_secs));
    if let Some(sheet) = &config.sheet {
        chain = chain.with_source(Arc::new(SheetValuesSource::new(resolve_path(
            source_root,
            sheet,
        ))));
    }
    if let Some(json) = &config.json {
        let mut source = JsonFileSource::new(resolve_path(source_root, json));
        // A collection without the stock overrides file simply has none.
        if config.json == OverridesConfig::default().json {
            source = source.optional();
        }
        chain = chain.with_source(Arc::new(source));
    }
    chain
}

/// One full run: read the prior artifact, fetch overrides, build, write.
///
/// The artifact is replaced only when the build succeeds.
pub fn generate(
    backend: &impl ImageBackend,
    source_root: &Path,
    output_root: &Path,
    chain: &SourceChain,
    options: &BuildOptions,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<(Artifact, RunReport), CatalogError> {
    let artifact_path = artifact::artifact_path(output_root);
    let prior = artifact::read_prior(&artifact_path);
    let fetched = chain.fetch();

    let (artifact, mut report) = build(
        backend,
        source_root,
        output_root,
        &fetched.overrides,
        prior.as_ref(),
        options,
        progress,
    )?;

    let mut warnings = fetched.warnings;
    warnings.append(&mut report.warnings);
    report.warnings = warnings;
    report.degraded = fetched.degraded;
    report.override_source = fetched.source;

    artifact::write(&artifact, &artifact_path)?;
    Ok((artifact, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::*;
    use crate::overrides::OverrideRecord;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn photo_tree(files: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for rel in files {
            let path = tmp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, format!("bytes of {rel}")).unwrap();
        }
        tmp
    }

    fn photo(category: &str, filename: &str) -> SourcePhoto {
        SourcePhoto {
            category: category.into(),
            filename: filename.into(),
            path: PathBuf::from(format!("/p/{category}/{filename}")),
            rel_path: format!("{category}/{filename}"),
        }
    }

    fn run(
        src: &Path,
        out: &Path,
        overrides: &OverrideMap,
        prior: Option<&Artifact>,
    ) -> (Artifact, RunReport) {
        build(
            &MockBackend::new(),
            src,
            out,
            overrides,
            prior,
            &BuildOptions::default(),
            None,
        )
        .unwrap()
    }

    fn ids(artifact: &Artifact) -> Vec<&str> {
        artifact.items.iter().map(|i| i.id.as_str()).collect()
    }

    // =========================================================================
    // Identities
    // =========================================================================

    #[test]
    fn default_ids_without_pins() {
        let mut warnings = vec![];
        let planned = resolve_identities(
            vec![photo("shirts", "IMG_7053.HEIC")],
            &OverrideMap::new(),
            None,
            &mut warnings,
        )
        .unwrap();
        assert_eq!(planned[0].id, "shirts-img-7053");
    }

    #[test]
    fn override_row_pins_explicit_id() {
        let overrides = OverrideMap::from([(
            "favorite-blue-shirt".to_string(),
            OverrideRecord {
                filename: Some("img_7053.heic".into()),
                ..OverrideRecord::default()
            },
        )]);
        let mut warnings = vec![];
        let planned = resolve_identities(
            vec![photo("shirts", "IMG_7053.HEIC")],
            &overrides,
            None,
            &mut warnings,
        )
        .unwrap();
        assert_eq!(planned[0].id, "favorite-blue-shirt");
    }

    #[test]
    fn prior_artifact_keeps_explicit_id() {
        let tmp = photo_tree(&["shirts/IMG_7053.HEIC"]);
        let out = TempDir::new().unwrap();
        let mut prior = run(tmp.path(), out.path(), &OverrideMap::new(), None).0;
        prior.items[0].id = "favorite-blue-shirt".into();

        let (artifact, _) = run(tmp.path(), out.path(), &OverrideMap::new(), Some(&prior));
        assert_eq!(ids(&artifact), vec!["favorite-blue-shirt"]);
    }

    #[test]
    fn ambiguous_filename_pin_warns() {
        let overrides = OverrideMap::from([(
            "x".to_string(),
            OverrideRecord {
                filename: Some("a.jpg".into()),
                ..OverrideRecord::default()
            },
        )]);
        let mut warnings = vec![];
        let pins = collect_pins(
            &[photo("shirts", "a.jpg"), photo("shoes", "a.jpg")],
            &overrides,
            None,
            &mut warnings,
        );
        assert!(pins.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn category_disambiguates_filename_pin() {
        let overrides = OverrideMap::from([(
            "x".to_string(),
            OverrideRecord {
                filename: Some("a.jpg".into()),
                category: Some("Shoes".into()),
                ..OverrideRecord::default()
            },
        )]);
        let mut warnings = vec![];
        let pins = collect_pins(
            &[photo("shirts", "a.jpg"), photo("shoes", "a.jpg")],
            &overrides,
            None,
            &mut warnings,
        );
        assert_eq!(pins.get(&pin_key("shoes", "a.jpg")).map(String::as_str), Some("x"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn ids_that_are_not_slugs_are_not_pinned() {
        let overrides = OverrideMap::from([
            (
                "tops/blue shirt".to_string(),
                OverrideRecord {
                    filename: Some("a.jpg".into()),
                    ..OverrideRecord::default()
                },
            ),
            (
                "../../../escaped".to_string(),
                OverrideRecord {
                    filename: Some("b.jpg".into()),
                    ..OverrideRecord::default()
                },
            ),
        ]);
        let mut warnings = vec![];
        let planned = resolve_identities(
            vec![photo("shirts", "a.jpg"), photo("shirts", "b.jpg")],
            &overrides,
            None,
            &mut warnings,
        )
        .unwrap();

        let ids: Vec<&str> = planned.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["shirts-a", "shirts-b"]);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.contains("not a valid id")));
    }

    #[test]
    fn prior_id_that_is_not_a_slug_is_not_pinned() {
        let tmp = photo_tree(&["shirts/a.jpg"]);
        let out = TempDir::new().unwrap();
        let mut prior = run(tmp.path(), out.path(), &OverrideMap::new(), None).0;
        prior.items[0].id = "../outside".into();

        let mut warnings = vec![];
        let pins = collect_pins(
            &[photo("shirts", "a.jpg")],
            &OverrideMap::new(),
            Some(&prior),
            &mut warnings,
        );
        assert!(pins.is_empty());
        assert_eq!(
            warnings,
            vec!["../outside: previous id is not a valid slug; id not pinned"]
        );
    }

    #[test]
    fn unsafe_override_ids_do_not_escape_the_output_root() {
        let tmp = photo_tree(&["shirts/a.jpg", "shirts/b.jpg"]);
        let parent = TempDir::new().unwrap();
        let out = parent.path().join("site");
        let overrides = OverrideMap::from([
            (
                "tops/blue shirt".to_string(),
                OverrideRecord {
                    filename: Some("a.jpg".into()),
                    ..OverrideRecord::default()
                },
            ),
            (
                "../../../escaped".to_string(),
                OverrideRecord {
                    filename: Some("b.jpg".into()),
                    ..OverrideRecord::default()
                },
            ),
        ]);

        let (artifact, report) = run(tmp.path(), &out, &overrides, None);

        assert_eq!(ids(&artifact), vec!["shirts-a", "shirts-b"]);
        assert!(report.failures.is_empty());
        assert_eq!(report.warnings.len(), 2);
        assert!(out.join("images/thumbs/shirts-a.jpg").exists());
        assert!(out.join("images/full/shirts-b.jpg").exists());
        let top: Vec<_> = fs::read_dir(parent.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(top, vec![std::ffi::OsString::from("site")]);
    }

    #[test]
    fn duplicate_identity_aborts_before_rendering() {
        let tmp = photo_tree(&["Shirts/a.jpg", "shirts/a.jpg"]);
        let out = TempDir::new().unwrap();
        let backend = MockBackend::new();

        let err = build(
            &backend,
            tmp.path(),
            out.path(),
            &OverrideMap::new(),
            None,
            &BuildOptions::default(),
            None,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::Identity(IdentityError::DuplicateIdentity { ref id, .. }) if id == "shirts-a"
        ));
        assert!(backend.get_operations().is_empty());
        assert!(!out.path().join("images").exists());
    }

    // =========================================================================
    // Build
    // =========================================================================

    #[test]
    fn builds_items_in_category_then_filename_order() {
        let tmp = photo_tree(&["shoes/b.jpg", "Shirts/z.jpg", "shoes/a.jpg"]);
        let out = TempDir::new().unwrap();
        let (artifact, report) = run(tmp.path(), out.path(), &OverrideMap::new(), None);

        assert_eq!(ids(&artifact), vec!["shirts-z", "shoes-a", "shoes-b"]);
        assert_eq!(artifact.categories, vec!["shirts", "shoes"]);
        assert_eq!(artifact.metadata.total_items, 3);
        assert!(report.failures.is_empty());

        let z = &artifact.items[0];
        assert_eq!(z.title, "Z");
        assert_eq!(z.source_path, "Shirts/z.jpg");
        assert_eq!(z.thumb_path, "images/thumbs/shirts-z.jpg");
        assert_eq!(z.full_path, "images/full/shirts-z.jpg");
        assert_eq!(z.content_hash.len(), 64);
    }

    #[test]
    fn overrides_and_prior_are_merged() {
        let tmp = photo_tree(&["shirts/IMG_7055.jpg"]);
        let out = TempDir::new().unwrap();
        let mut prior = run(tmp.path(), out.path(), &OverrideMap::new(), None).0;
        prior.items[0].notes = "nice".into();

        let overrides = OverrideMap::from([(
            "shirts-img-7055".to_string(),
            OverrideRecord {
                title: Some("Blue Shirt".into()),
                tags: Some(vec!["casual".into()]),
                ..OverrideRecord::default()
            },
        )]);
        let (artifact, _) = run(tmp.path(), out.path(), &overrides, Some(&prior));

        let item = &artifact.items[0];
        assert_eq!(item.title, "Blue Shirt");
        assert_eq!(item.tags, vec!["casual"]);
        assert_eq!(item.notes, "nice");
    }

    #[test]
    fn category_override_warns_but_keeps_position() {
        let tmp = photo_tree(&["shirts/a.jpg", "shirts/b.jpg"]);
        let out = TempDir::new().unwrap();
        let overrides = OverrideMap::from([(
            "shirts-a".to_string(),
            OverrideRecord {
                category: Some("Zebra".into()),
                ..OverrideRecord::default()
            },
        )]);
        let (artifact, report) = run(tmp.path(), out.path(), &overrides, None);

        assert_eq!(ids(&artifact), vec!["shirts-a", "shirts-b"]);
        assert_eq!(artifact.items[0].category, "zebra");
        assert_eq!(artifact.categories, vec!["shirts", "zebra"]);
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.contains("shirts-a: category changed from shirts to zebra"))
        );
    }

    #[test]
    fn missing_photo_is_flagged_not_dropped() {
        let tmp = photo_tree(&["shirts/a.jpg", "shirts/b.jpg", "shoes/c.jpg"]);
        let out = TempDir::new().unwrap();
        let mut prior = run(tmp.path(), out.path(), &OverrideMap::new(), None).0;
        prior.items[1].notes = "hand-written".into();

        fs::remove_file(tmp.path().join("shirts/b.jpg")).unwrap();
        let (artifact, report) = run(tmp.path(), out.path(), &OverrideMap::new(), Some(&prior));

        assert_eq!(ids(&artifact), vec!["shirts-a", "shirts-b", "shoes-c"]);
        let b = artifact.find("shirts-b").unwrap();
        assert!(b.missing);
        assert_eq!(b.notes, "hand-written");
        assert_eq!(report.missing, vec!["shirts-b"]);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn returning_photo_clears_missing_flag() {
        let tmp = photo_tree(&["shirts/a.jpg"]);
        let out = TempDir::new().unwrap();
        let mut prior = run(tmp.path(), out.path(), &OverrideMap::new(), None).0;
        prior.items[0].missing = true;

        let (artifact, report) = run(tmp.path(), out.path(), &OverrideMap::new(), Some(&prior));
        assert!(!artifact.items[0].missing);
        assert!(report.missing.is_empty());
    }

    #[test]
    fn undecodable_photo_is_excluded_and_reported() {
        let tmp = photo_tree(&["shirts/a.jpg", "shirts/bad.jpg"]);
        let out = TempDir::new().unwrap();
        let (artifact, report) = build(
            &MockBackend::new().failing_on("bad.jpg"),
            tmp.path(),
            out.path(),
            &OverrideMap::new(),
            None,
            &BuildOptions::default(),
            None,
        )
        .unwrap();

        assert_eq!(ids(&artifact), vec!["shirts-a"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source_rel, "shirts/bad.jpg");
    }

    #[test]
    fn failed_photo_with_prior_entry_is_not_marked_missing() {
        let tmp = photo_tree(&["shirts/a.jpg"]);
        let out = TempDir::new().unwrap();
        let prior = run(tmp.path(), out.path(), &OverrideMap::new(), None).0;
        let uncached = BuildOptions {
            process: ProcessOptions {
                use_cache: false,
                ..ProcessOptions::default()
            },
            ..BuildOptions::default()
        };

        let (artifact, report) = build(
            &MockBackend::new().failing_on("a.jpg"),
            tmp.path(),
            out.path(),
            &OverrideMap::new(),
            Some(&prior),
            &uncached,
            None,
        )
        .unwrap();
        assert!(artifact.items.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(report.missing.is_empty());
    }

    #[test]
    fn failed_photo_gets_its_notes_back_once_it_renders() {
        let tmp = photo_tree(&["shirts/a.jpg", "shirts/b.jpg"]);
        let out = TempDir::new().unwrap();
        let notes = OverrideMap::from([(
            "shirts-a".to_string(),
            OverrideRecord {
                notes: Some("hand wash".into()),
                ..OverrideRecord::default()
            },
        )]);
        let first = run(tmp.path(), out.path(), &notes, None).0;

        let uncached = BuildOptions {
            process: ProcessOptions {
                use_cache: false,
                ..ProcessOptions::default()
            },
            ..BuildOptions::default()
        };
        let (second, _) = build(
            &MockBackend::new().failing_on("a.jpg"),
            tmp.path(),
            out.path(),
            &OverrideMap::new(),
            Some(&first),
            &uncached,
            None,
        )
        .unwrap();
        assert_eq!(ids(&second), vec!["shirts-b"]);
        let parked = HeldItems::load(&out.path().join("images"));
        assert_eq!(parked.items["shirts-a"].notes, "hand wash");

        let (third, report) = run(tmp.path(), out.path(), &OverrideMap::new(), Some(&second));

        assert_eq!(ids(&third), vec!["shirts-a", "shirts-b"]);
        let a = third.find("shirts-a").unwrap();
        assert_eq!(a.notes, "hand wash");
        assert!(!a.missing);
        assert!(report.missing.is_empty());
        assert!(HeldItems::load(&out.path().join("images")).is_empty());
    }

    #[test]
    fn held_entry_of_deleted_photo_is_carried_as_missing() {
        let tmp = photo_tree(&["shirts/a.jpg"]);
        let out = TempDir::new().unwrap();
        let mut first = run(tmp.path(), out.path(), &OverrideMap::new(), None).0;
        first.items[0].notes = "only copy".into();
        let uncached = BuildOptions {
            process: ProcessOptions {
                use_cache: false,
                ..ProcessOptions::default()
            },
            ..BuildOptions::default()
        };
        let (second, _) = build(
            &MockBackend::new().failing_on("a.jpg"),
            tmp.path(),
            out.path(),
            &OverrideMap::new(),
            Some(&first),
            &uncached,
            None,
        )
        .unwrap();

        fs::remove_file(tmp.path().join("shirts/a.jpg")).unwrap();
        let (third, report) = run(tmp.path(), out.path(), &OverrideMap::new(), Some(&second));

        let a = third.find("shirts-a").unwrap();
        assert!(a.missing);
        assert_eq!(a.notes, "only copy");
        assert_eq!(report.missing, vec!["shirts-a"]);
    }

    // =========================================================================
    // Generate
    // =========================================================================

    #[test]
    fn generate_writes_artifact_and_reports_degraded_mode() {
        let tmp = photo_tree(&["shirts/a.jpg"]);
        let out = TempDir::new().unwrap();
        let config = OverridesConfig {
            json: Some("overrides.json".into()),
            ..OverridesConfig::default()
        };
        let chain = source_chain(tmp.path(), &config);

        let (artifact, report) = generate(
            &MockBackend::new(),
            tmp.path(),
            out.path(),
            &chain,
            &BuildOptions::default(),
            None,
        )
        .unwrap();

        // overrides.json is configured but absent.
        assert!(report.degraded);
        assert_eq!(report.warnings.len(), 1);
        let written = artifact::read_prior(&artifact::artifact_path(out.path())).unwrap();
        assert_eq!(written, artifact);
    }

    #[test]
    fn absent_stock_overrides_file_is_not_degraded() {
        let tmp = photo_tree(&["shirts/a.jpg"]);
        let out = TempDir::new().unwrap();
        let chain = source_chain(tmp.path(), &OverridesConfig::default());

        let (artifact, report) = generate(
            &MockBackend::new(),
            tmp.path(),
            out.path(),
            &chain,
            &BuildOptions::default(),
            None,
        )
        .unwrap();

        assert!(!report.degraded);
        assert!(report.warnings.is_empty());
        assert_eq!(ids(&artifact), vec!["shirts-a"]);
    }

    #[test]
    fn generate_uses_local_json_overrides() {
        let tmp = photo_tree(&["shirts/a.jpg"]);
        fs::write(
            tmp.path().join("wardrobe_data.json"),
            r#"{"items": [{"id": "shirts-a", "title": "Oxford"}]}"#,
        )
        .unwrap();
        let out = TempDir::new().unwrap();
        let chain = source_chain(tmp.path(), &OverridesConfig::default());

        let (artifact, report) = generate(
            &MockBackend::new(),
            tmp.path(),
            out.path(),
            &chain,
            &BuildOptions::default(),
            None,
        )
        .unwrap();

        assert!(!report.degraded);
        assert_eq!(artifact.items[0].title, "Oxford");
    }

    #[test]
    fn build_options_follow_config() {
        let mut config = CatalogConfig::default();
        config.merge.prior_fallback = false;
        config.processing.max_processes = Some(1);
        let options = BuildOptions::from_config(&config);
        assert!(!options.merge.prior_fallback);
        assert_eq!(options.process.threads, 1);
        assert!(options.process.use_cache);
    }

    #[test]
    fn no_configured_sources_gives_empty_chain() {
        let config = OverridesConfig {
            json: None,
            sheet: None,
            timeout_secs: 1,
        };
        assert!(source_chain(Path::new("/p"), &config).is_empty());
    }
}
