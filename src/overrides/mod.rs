//! Authoritative metadata sources.
//!
//! An override source supplies per-item title, category, tags and notes that
//! win over anything derived from the photo itself. Two file-based sources
//! exist:
//!
//! - [`JsonFileSource`]: the hand-maintained `wardrobe_data.json` shape.
//! - [`SheetValuesSource`]: an exported spreadsheet values grid with a
//!   two-row header.
//!
//! Sources are tried in order by a [`SourceChain`]. Each fetch runs on a
//! helper thread bounded by a timeout; a source that errors or stalls is
//! skipped. When every source fails the build continues in degraded mode
//! with no overrides.
//!
//! Rows are validated at the boundary. A malformed row becomes a warning in
//! [`Fetched::warnings`] and never aborts the fetch.

mod json_file;
mod sheet;

pub use json_file::JsonFileSource;
pub use sheet::{SheetValuesSource, artifact_to_grid};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;
use thiserror::Error;

/// Authoritative values for one item. `None` means "no opinion".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideRecord {
    pub title: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    /// Source filename this row describes. Lets a row pin its id to a file.
    pub filename: Option<String>,
}

/// Override records keyed by item id.
pub type OverrideMap = BTreeMap<String, OverrideRecord>;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("{name} did not answer within {}s", timeout.as_secs())]
    Timeout { name: String, timeout: Duration },
    #[error("{0} stopped before returning a result")]
    Disconnected(String),
}

/// Records plus the rows that were rejected on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fetched {
    pub overrides: OverrideMap,
    pub warnings: Vec<String>,
}

impl Fetched {
    /// Add a record, warning when an earlier row already used the id.
    pub(crate) fn insert(&mut self, id: String, record: OverrideRecord) {
        if self.overrides.insert(id.clone(), record).is_some() {
            self.warnings
                .push(format!("duplicate override row for {id}; later row wins"));
        }
    }
}

/// A place authoritative metadata can be fetched from.
pub trait OverrideSource: Send + Sync {
    /// Short label for logs and warnings.
    fn name(&self) -> String;

    fn fetch_overrides(&self) -> Result<Fetched, SourceError>;
}

/// Run one fetch on a helper thread, giving up after `timeout`.
///
/// A timed-out fetch is abandoned, not killed; its thread finishes on its
/// own and the result is dropped.
pub fn fetch_with_timeout(
    source: Arc<dyn OverrideSource>,
    timeout: Duration,
) -> Result<Fetched, SourceError> {
    let name = source.name();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(source.fetch_overrides());
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(SourceError::Timeout { name, timeout }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(SourceError::Disconnected(name)),
    }
}

/// What the chain settled on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub overrides: OverrideMap,
    pub warnings: Vec<String>,
    /// Name of the source that answered, if any.
    pub source: Option<String>,
    /// Every configured source failed; the build runs without overrides.
    pub degraded: bool,
}

/// Ordered fallback over several sources.
pub struct SourceChain {
    sources: Vec<Arc<dyn OverrideSource>>,
    timeout: Duration,
}

impl SourceChain {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sources: Vec::new(),
            timeout,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn OverrideSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Try each source in order and keep the first that answers.
    ///
    /// An empty chain is not degraded: nothing was expected.
    pub fn fetch(&self) -> FetchOutcome {
        let mut failures = Vec::new();
        for source in &self.sources {
            let name = source.name();
            match fetch_with_timeout(Arc::clone(source), self.timeout) {
                Ok(fetched) => {
                    tracing::info!(source = %name, records = fetched.overrides.len(), "fetched overrides");
                    let mut warnings: Vec<String> = failures
                        .iter()
                        .map(|f| format!("{f}; fell back to {name}"))
                        .collect();
                    warnings.extend(fetched.warnings);
                    return FetchOutcome {
                        overrides: fetched.overrides,
                        warnings,
                        source: Some(name),
                        degraded: false,
                    };
                }
                Err(e) => {
                    tracing::warn!(source = %name, error = %e, "override source failed");
                    failures.push(e.to_string());
                }
            }
        }

        if failures.is_empty() {
            return FetchOutcome::default();
        }
        FetchOutcome {
            overrides: OverrideMap::new(),
            warnings: vec![format!(
                "no authoritative metadata source available ({}); using previous values and defaults",
                failures.join("; ")
            )],
            source: None,
            degraded: true,
        }
    }
}

// =============================================================================
// Row normalization shared by the sources
// =============================================================================

/// Trimmed text, `None` when empty.
pub(crate) fn clean_text(value: Option<&str>) -> Option<String> {
    let v = value?.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Trimmed tags without blanks, `None` when nothing is left.
pub(crate) fn clean_tags<I, S>(tags: I) -> Option<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    (!tags.is_empty()).then_some(tags)
}

/// Tags as they appear in JSON: a list, or one comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TagsField {
    List(Vec<String>),
    Text(String),
}

impl TagsField {
    pub(crate) fn into_tags(self) -> Option<Vec<String>> {
        match self {
            TagsField::List(list) => clean_tags(list),
            TagsField::Text(text) => clean_tags(text.split(',')),
        }
    }
}
