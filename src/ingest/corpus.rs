use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::{Map, Value};

use crate::core::errors::ApiError;
use crate::store::Page;

/// A passage before embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct PassageRecord {
    pub body: String,
    pub metadata: Option<Value>,
}

/// Read full pages from a JSON Lines file (`title` and `body` required).
pub fn load_pages(path: &Path) -> Result<Vec<Page>, ApiError> {
    read_records(path, |mut record, line| {
        let title = take_string(&mut record, "title", line)?;
        let body = take_string(&mut record, "body", line)?;
        Ok(Page {
            title,
            body,
            metadata: remaining(record),
        })
    })
}

/// Read passages from a JSON Lines file (`body` required). Precomputed
/// `embedding` fields are dropped; passages are always re-embedded.
pub fn load_passages(path: &Path) -> Result<Vec<PassageRecord>, ApiError> {
    read_records(path, |mut record, line| {
        let body = take_string(&mut record, "body", line)?;
        record.remove("embedding");
        Ok(PassageRecord {
            body,
            metadata: remaining(record),
        })
    })
}

fn read_records<T>(
    path: &Path,
    mut parse: impl FnMut(Map<String, Value>, usize) -> Result<T, ApiError>,
) -> Result<Vec<T>, ApiError> {
    let file = File::open(path).map_err(|err| {
        ApiError::BadRequest(format!("Cannot open {}: {}", path.display(), err))
    })?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line_number = index + 1;
        let line = line.map_err(ApiError::internal)?;
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(&line).map_err(|err| {
            ApiError::BadRequest(format!(
                "{} line {}: invalid JSON: {}",
                path.display(),
                line_number,
                err
            ))
        })?;
        let Value::Object(record) = value else {
            return Err(ApiError::BadRequest(format!(
                "{} line {}: expected a JSON object",
                path.display(),
                line_number
            )));
        };

        records.push(parse(record, line_number).map_err(|err| match err {
            ApiError::BadRequest(msg) => {
                ApiError::BadRequest(format!("{} {}", path.display(), msg))
            }
            other => other,
        })?);
    }

    tracing::info!("Loaded {} record(s) from {}", records.len(), path.display());
    Ok(records)
}

fn take_string(record: &mut Map<String, Value>, field: &str, line: usize) -> Result<String, ApiError> {
    match record.remove(field) {
        Some(Value::String(text)) => Ok(text),
        Some(_) => Err(ApiError::BadRequest(format!(
            "line {}: field '{}' must be a string",
            line, field
        ))),
        None => Err(ApiError::BadRequest(format!(
            "line {}: missing field '{}'",
            line, field
        ))),
    }
}

fn remaining(record: Map<String, Value>) -> Option<Value> {
    if record.is_empty() {
        None
    } else {
        Some(Value::Object(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn jsonl(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn pages_keep_extra_fields_as_metadata() {
        let file = jsonl(&[
            r#"{"title": "Create a MongoDB Deployment", "body": "Deploy.", "url": "https://example.com"}"#,
            "",
            r#"{"title": "Backups", "body": "Back up."}"#,
        ]);

        let pages = load_pages(file.path()).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].title, "Create a MongoDB Deployment");
        assert_eq!(
            pages[0].metadata,
            Some(serde_json::json!({ "url": "https://example.com" }))
        );
        assert_eq!(pages[1].metadata, None);
    }

    #[test]
    fn passages_drop_precomputed_embeddings() {
        let file = jsonl(&[r#"{"body": "Chunk.", "embedding": [0.1, 0.2], "title": "Backups"}"#]);
        let passages = load_passages(file.path()).unwrap();
        assert_eq!(passages[0].body, "Chunk.");
        assert_eq!(passages[0].metadata, Some(serde_json::json!({ "title": "Backups" })));
    }

    #[test]
    fn malformed_lines_report_their_number() {
        let file = jsonl(&[r#"{"title": "A", "body": "a"}"#, "{not json"]);
        let err = load_pages(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let file = jsonl(&[r#"{"body": "no title"}"#]);
        let err = load_pages(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 1: missing field 'title'"));

        let file = jsonl(&["[1, 2]"]);
        assert!(load_passages(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_pages(Path::new("/nonexistent/pages.jsonl")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
