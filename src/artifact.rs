//! Reading and writing the catalog artifact.
//!
//! The artifact is written atomically: a reader (or a crash) never sees a
//! half-written file. A previous artifact that cannot be parsed is treated
//! as absent rather than fatal; it is only replaced once a run succeeds.

use crate::types::Artifact;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Artifact filename inside the output root.
pub const ARTIFACT_FILENAME: &str = "wardrobe_data.json";

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Cannot serialize catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Path of the artifact for an output root.
pub fn artifact_path(output_root: &Path) -> PathBuf {
    output_root.join(ARTIFACT_FILENAME)
}

/// Serialize for disk: pretty JSON with a trailing newline.
pub fn to_json(artifact: &Artifact) -> Result<String, ArtifactError> {
    let mut json = serde_json::to_string_pretty(artifact)?;
    json.push('\n');
    Ok(json)
}

/// Atomically replace `path` with the artifact.
///
/// Items are written in the order given.
pub fn write(artifact: &Artifact, path: &Path) -> Result<(), ArtifactError> {
    let json = to_json(artifact)?;
    crate::atomic::write_atomic(path, json.as_bytes()).map_err(|source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), items = artifact.items.len(), "wrote catalog");
    Ok(())
}

/// Atomically write the catalog as a spreadsheet values grid,
/// `{"values": [[...], ...]}`, the shape [`SheetValuesSource`] reads.
///
/// [`SheetValuesSource`]: crate::overrides::SheetValuesSource
pub fn write_sheet_values(artifact: &Artifact, path: &Path) -> Result<(), ArtifactError> {
    let grid = crate::overrides::artifact_to_grid(artifact);
    let rows = grid.len();
    let mut json = serde_json::to_string_pretty(&serde_json::json!({ "values": grid }))?;
    json.push('\n');
    crate::atomic::write_atomic(path, json.as_bytes()).map_err(|source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), rows, "wrote sheet values");
    Ok(())
}

/// Read the previous artifact, if there is a usable one.
pub fn read_prior(path: &Path) -> Option<Artifact> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read previous catalog; starting fresh");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(artifact) => Some(artifact),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot parse previous catalog; starting fresh");
            None
        }
    }
}
