//! Item manifests: one item per line.
//!
//! A line holding a JSON object exposes its fields to path templates
//! (strings verbatim, numbers and booleans in their JSON spelling, nested
//! values as compact JSON, `null` omitted). Any other non-blank line binds
//! its trimmed text to `{item}`. Blank lines and lines starting with `#` are
//! skipped.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Field a plain-text manifest line is bound to.
pub(crate) const PLAIN_LINE_FIELD: &str = "item";

#[derive(Debug, Error)]
pub(crate) enum ManifestError {
    #[error("failed to read manifest")]
    Io { path: PathBuf, source: io::Error },
    #[error("manifest line is not a valid JSON object")]
    InvalidJson {
        line: usize,
        source: serde_json::Error,
    },
}

/// One migration item read from a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ManifestItem {
    /// 1-based line number in the manifest.
    pub(crate) line: usize,
    fields: BTreeMap<String, String>,
}

impl ManifestItem {
    pub(crate) fn from_fields(
        line: usize,
        fields: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            line,
            fields: fields.into_iter().collect(),
        }
    }

    pub(crate) fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl fmt::Display for ManifestItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(value) = self.field(PLAIN_LINE_FIELD) {
            return write!(f, "{value}");
        }
        write!(f, "line {}", self.line)
    }
}

pub(crate) fn load_manifest(path: &Path) -> Result<Vec<ManifestItem>, ManifestError> {
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&text)
}

pub(crate) fn parse_manifest(text: &str) -> Result<Vec<ManifestItem>, ManifestError> {
    let mut items = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let item = if trimmed.starts_with('{') {
            let object: serde_json::Map<String, Value> = serde_json::from_str(trimmed)
                .map_err(|source| ManifestError::InvalidJson { line, source })?;
            ManifestItem::from_fields(
                line,
                object
                    .into_iter()
                    .filter_map(|(key, value)| field_text(value).map(|text| (key, text))),
            )
        } else {
            ManifestItem::from_fields(
                line,
                [(PLAIN_LINE_FIELD.to_string(), trimmed.to_string())],
            )
        };
        items.push(item);
    }
    Ok(items)
}

fn field_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        nested @ (Value::Array(_) | Value::Object(_)) => Some(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_json_lines_are_parsed() -> Result<(), ManifestError> {
        let manifest = "\
# attachments exported on 2024-01-01
photos/cat.jpg

{\"id\": 42, \"file_name\": \"report.pdf\", \"draft\": false, \"owner\": null, \"tags\": [\"a\"]}
";
        let items = parse_manifest(manifest)?;
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].line, 2);
        assert_eq!(items[0].field("item"), Some("photos/cat.jpg"));
        assert_eq!(items[0].to_string(), "photos/cat.jpg");

        let record = &items[1];
        assert_eq!(record.line, 4);
        assert_eq!(record.field("id"), Some("42"));
        assert_eq!(record.field("file_name"), Some("report.pdf"));
        assert_eq!(record.field("draft"), Some("false"));
        assert_eq!(record.field("tags"), Some("[\"a\"]"));
        assert!(record.field("owner").is_none());
        assert_eq!(record.to_string(), "line 4");
        Ok(())
    }

    #[test]
    fn malformed_json_reports_line() {
        let err = parse_manifest("ok.txt\n{\"id\": }\n").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidJson { line: 2, .. }));
        assert_eq!(err.to_string(), "manifest line is not a valid JSON object");
    }

    #[test]
    fn missing_manifest_is_an_io_error() {
        let err = load_manifest(Path::new("/definitely/missing/manifest.txt")).unwrap_err();
        assert_eq!(err.to_string(), "failed to read manifest");
        assert!(matches!(
            err,
            ManifestError::Io { ref path, .. } if path == Path::new("/definitely/missing/manifest.txt")
        ));
    }
}
