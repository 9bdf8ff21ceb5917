//! Spreadsheet values grid.
//!
//! The grid is the export of the inventory spreadsheet, one JSON array per
//! row. Two header rows precede the data:
//!
//! ```text
//! row 1: ID | Title | Category | Filename | ... | Notes | Created (UTC ISO8601) | Tags |        |
//! row 2:    |       |          |          | ... |       |                       | color  | ----   |
//! ```
//!
//! Row 1 names the base columns and marks the first tag column with `Tags`.
//! Row 2 names a tag type for every column of the tag block. A tag cell is
//! split on commas; type `----` contributes bare tags, any other type
//! contributes `type:value`.
//!
//! [`artifact_to_grid`] goes the other way and lays a catalog out in the
//! same shape, so an export can seed the spreadsheet it is later read from.

use super::{Fetched, OverrideRecord, OverrideSource, SourceError, clean_tags, clean_text};
use crate::types::{Artifact, Item};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Tag type whose values are used without a prefix.
const UNTYPED_TAG: &str = "----";

/// Marker in row 1 above the first tag column.
const TAGS_MARKER: &str = "tags";

const BASE_HEADERS: &[&str] = &[
    "ID",
    "Title",
    "Category",
    "Filename",
    "Slug",
    "Thumbnail",
    "Image",
    "Notes",
    "Created (UTC ISO8601)",
];

/// Overrides from an exported spreadsheet values grid.
///
/// The file holds either `{"values": [[...], ...]}` or the bare 2D array.
pub struct SheetValuesSource {
    path: PathBuf,
}

impl SheetValuesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OverrideSource for SheetValuesSource {
    fn name(&self) -> String {
        format!("sheet:{}", self.path.display())
    }

    fn fetch_overrides(&self) -> Result<Fetched, SourceError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let parse_error = |reason: String| SourceError::Parse {
            path: self.path.clone(),
            reason,
        };
        let value: Value = serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?;
        let grid = values_grid(value).map_err(parse_error)?;
        Ok(parse_grid(&grid))
    }
}

/// Extract the rows as strings. Numbers and booleans are stringified,
/// null becomes an empty cell.
fn values_grid(value: Value) -> Result<Vec<Vec<String>>, String> {
    let rows = match value {
        Value::Object(mut obj) => match obj.remove("values") {
            Some(Value::Array(rows)) => rows,
            Some(_) => return Err("\"values\" is not an array".into()),
            None => return Err("missing \"values\"".into()),
        },
        Value::Array(rows) => rows,
        _ => return Err("expected a values grid".into()),
    };
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Array(cells) => Ok(cells.into_iter().map(cell_text).collect()),
            _ => Err(format!("row {} is not an array", i + 1)),
        })
        .collect()
}

fn cell_text(cell: Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Column layout read from the two header rows.
struct Layout {
    base: HashMap<&'static str, usize>,
    tag_start: usize,
    tag_types: Vec<String>,
}

impl Layout {
    fn from_headers(row1: &[String], row2: &[String]) -> Self {
        let base = BASE_HEADERS
            .iter()
            .filter_map(|&name| {
                row1.iter()
                    .position(|cell| cell.trim() == name)
                    .map(|idx| (name, idx))
            })
            .collect();
        // Without a marker there is no tag block.
        let tag_start = row1
            .iter()
            .position(|cell| cell.trim().eq_ignore_ascii_case(TAGS_MARKER))
            .unwrap_or(row2.len());
        let tag_types = row2
            .get(tag_start..)
            .unwrap_or_default()
            .iter()
            .map(|t| t.trim().to_string())
            .collect();
        Self {
            base,
            tag_start,
            tag_types,
        }
    }

    fn get<'r>(&self, row: &'r [String], name: &str) -> Option<&'r str> {
        let idx = *self.base.get(name)?;
        row.get(idx).map(String::as_str)
    }

    fn tags(&self, row: &[String]) -> Vec<String> {
        let mut tags = Vec::new();
        for (offset, tag_type) in self.tag_types.iter().enumerate() {
            let Some(cell) = row.get(self.tag_start + offset) else {
                continue;
            };
            for part in cell.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                if tag_type == UNTYPED_TAG || tag_type.is_empty() {
                    tags.push(part.to_string());
                } else {
                    tags.push(format!("{tag_type}:{part}"));
                }
            }
        }
        tags
    }
}

fn parse_grid(grid: &[Vec<String>]) -> Fetched {
    let mut fetched = Fetched::default();
    let [row1, row2, data @ ..] = grid else {
        return fetched;
    };
    let layout = Layout::from_headers(row1, row2);

    for (offset, row) in data.iter().enumerate() {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        // Spreadsheet row numbers are 1-based and include both headers.
        let line = offset + 3;
        let Some(id) = clean_text(layout.get(row, "ID")) else {
            fetched.warnings.push(format!("sheet row {line}: missing ID"));
            continue;
        };
        let record = OverrideRecord {
            title: clean_text(layout.get(row, "Title")),
            category: clean_text(layout.get(row, "Category")),
            tags: clean_tags(layout.tags(row)),
            notes: clean_text(layout.get(row, "Notes")),
            filename: clean_text(layout.get(row, "Filename")),
        };
        fetched.insert(id, record);
    }
    fetched
}

/// Tag columns for an export: typed prefixes in first-seen order (case
/// folded, first spelling kept), then `----` if any item has a bare tag.
fn discover_tag_types(items: &[Item]) -> Vec<(String, String)> {
    let mut types: Vec<(String, String)> = Vec::new();
    let mut untyped = false;
    for tag in items.iter().flat_map(|item| &item.tags) {
        match tag.split_once(':') {
            Some((tag_type, _)) => {
                let key = tag_type.trim().to_lowercase();
                if !types.iter().any(|(k, _)| *k == key) {
                    types.push((key, tag_type.trim().to_string()));
                }
            }
            None => untyped = true,
        }
    }
    if untyped && !types.iter().any(|(k, _)| k == UNTYPED_TAG) {
        types.push((UNTYPED_TAG.to_string(), UNTYPED_TAG.to_string()));
    }
    types
}

/// One cell per tag column, values joined with `", "`.
fn tag_cells(item: &Item, types: &[(String, String)]) -> Vec<String> {
    let mut cells = vec![Vec::new(); types.len()];
    for tag in &item.tags {
        let (key, value) = match tag.split_once(':') {
            Some((tag_type, value)) => (tag_type.trim().to_lowercase(), value.trim()),
            None => (UNTYPED_TAG.to_string(), tag.trim()),
        };
        if value.is_empty() {
            continue;
        }
        if let Some(col) = types.iter().position(|(k, _)| *k == key) {
            cells[col].push(value);
        }
    }
    cells.into_iter().map(|values| values.join(", ")).collect()
}

/// Lay the catalog out as a values grid with the two-row header.
///
/// Items keep artifact order, missing ones included. The `Slug` column
/// carries the id and `Created` is left blank: items have no creation date.
pub fn artifact_to_grid(artifact: &Artifact) -> Vec<Vec<String>> {
    let types = discover_tag_types(&artifact.items);

    let mut row1: Vec<String> = BASE_HEADERS.iter().map(|h| h.to_string()).collect();
    let mut row2 = vec![String::new(); BASE_HEADERS.len()];
    for (i, (_, display)) in types.iter().enumerate() {
        row1.push(if i == 0 { "Tags".to_string() } else { String::new() });
        row2.push(display.clone());
    }

    let mut grid = vec![row1, row2];
    for item in &artifact.items {
        let mut row = vec![
            item.id.clone(),
            item.title.clone(),
            item.category.clone(),
            item.filename.clone(),
            item.id.clone(),
            item.thumb_path.clone(),
            item.full_path.clone(),
            item.notes.clone(),
            String::new(),
        ];
        row.extend(tag_cells(item, &types));
        grid.push(row);
    }
    grid
}
