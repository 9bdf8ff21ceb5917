use super::{Fetched, OverrideRecord, OverrideSource, SourceError, TagsField, clean_text};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Overrides from a local JSON file.
///
/// Accepted shapes:
///
/// ```json
/// {"items": [{"id": "shirts-img-7053", "title": "Blue Shirt", "tags": ["casual"]}]}
/// [{"id": "shirts-img-7053", "title": "Blue Shirt"}]
/// {"shirts-img-7053": {"title": "Blue Shirt"}}
/// ```
///
/// Unknown fields (`slug`, `thumbnail`, `created_date`, ...) are ignored.
pub struct JsonFileSource {
    path: PathBuf,
    optional: bool,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            optional: false,
        }
    }

    /// A file that does not exist answers with no overrides instead of
    /// failing. Any other read or parse error still fails.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Option<TagsField>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

impl Row {
    fn into_record(self) -> OverrideRecord {
        OverrideRecord {
            title: clean_text(self.title.as_deref()),
            category: clean_text(self.category.as_deref()),
            tags: self.tags.and_then(TagsField::into_tags),
            notes: clean_text(self.notes.as_deref()),
            filename: clean_text(self.filename.as_deref()),
        }
    }
}

impl OverrideSource for JsonFileSource {
    fn name(&self) -> String {
        format!("json:{}", self.path.display())
    }

    fn fetch_overrides(&self) -> Result<Fetched, SourceError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if self.optional && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no overrides file");
                return Ok(Fetched::default());
            }
            Err(source) => {
                return Err(SourceError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let value: Value = serde_json::from_str(&content).map_err(|e| SourceError::Parse {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        parse_document(value).map_err(|reason| SourceError::Parse {
            path: self.path.clone(),
            reason,
        })
    }
}

/// Interpret a whole document. Only a wrong top-level shape is an error;
/// bad rows become warnings.
fn parse_document(value: Value) -> Result<Fetched, String> {
    let mut fetched = Fetched::default();
    match value {
        Value::Object(mut obj) if obj.get("items").is_some_and(Value::is_array) => {
            if let Some(Value::Array(rows)) = obj.remove("items") {
                parse_rows(rows, &mut fetched);
            }
        }
        Value::Array(rows) => parse_rows(rows, &mut fetched),
        Value::Object(obj) => {
            for (id, row) in obj {
                match parse_row(row, Some(id.clone())) {
                    Ok((id, record)) => fetched.insert(id, record),
                    Err(reason) => fetched.warnings.push(format!("override {id}: {reason}")),
                }
            }
        }
        other => {
            return Err(format!(
                "expected an object or an array at the top level, found {}",
                kind(&other)
            ));
        }
    }
    Ok(fetched)
}

fn parse_rows(rows: Vec<Value>, fetched: &mut Fetched) {
    for (index, row) in rows.into_iter().enumerate() {
        match parse_row(row, None) {
            Ok((id, record)) => fetched.insert(id, record),
            Err(reason) => fetched
                .warnings
                .push(format!("override row {}: {reason}", index + 1)),
        }
    }
}

/// Validate one row. `key` is the id when the document is keyed by id.
fn parse_row(row: Value, key: Option<String>) -> Result<(String, OverrideRecord), String> {
    if !row.is_object() {
        return Err(format!("expected an object, found {}", kind(&row)));
    }
    let row: Row = serde_json::from_value(row).map_err(|e| e.to_string())?;
    let id = clean_text(row.id.as_deref())
        .or_else(|| clean_text(key.as_deref()))
        .ok_or_else(|| "missing id".to_string())?;
    Ok((id, row.into_record()))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
