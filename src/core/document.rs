//! Typed path extraction over upstream JSON documents.
//!
//! Connectors never walk a raw [`serde_json::Value`] themselves. They ask an
//! [`UpstreamDocument`] for a string, a list of strings or a list of
//! sub-documents at a path such as `$.fields.components[*].name`.
//!
//! The supported path grammar is deliberately small:
//! - `$` the document root (mandatory prefix)
//! - `.name` or `['name']` an object member
//! - `[3]` an array element
//! - `[*]` every element of an array (or every value of an object)

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("invalid document path '{0}'")]
    InvalidPath(String),

    #[error("required field '{0}' is missing")]
    Missing(String),

    #[error("field '{0}' is not a scalar")]
    NotAString(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Member(String),
    Index(usize),
    Wildcard,
}

fn parse_path(path: &str) -> Result<Vec<Segment>, DocumentError> {
    let invalid = || DocumentError::InvalidPath(path.to_string());
    let rest = path.strip_prefix('$').ok_or_else(invalid)?;
    let mut segments = Vec::new();
    let mut chars = rest.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '.' || next == '[' {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }
                if name.is_empty() {
                    return Err(invalid());
                }
                segments.push(Segment::Member(name));
            }
            '[' => {
                let mut inner = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(ch) => inner.push(ch),
                        None => return Err(invalid()),
                    }
                }
                let inner = inner.trim();
                let segment = if inner == "*" {
                    Segment::Wildcard
                } else if let Some(quoted) = inner
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                {
                    Segment::Member(quoted.to_string())
                } else {
                    Segment::Index(inner.parse().map_err(|_| invalid())?)
                };
                segments.push(segment);
            }
            _ => return Err(invalid()),
        }
    }
    Ok(segments)
}

fn select<'a>(root: &'a Value, segments: &[Segment]) -> Vec<&'a Value> {
    let mut current = vec![root];
    for segment in segments {
        let mut next = Vec::new();
        for value in current {
            match (segment, value) {
                (Segment::Member(name), Value::Object(map)) => {
                    if let Some(v) = map.get(name) {
                        next.push(v);
                    }
                }
                (Segment::Index(i), Value::Array(items)) => {
                    if let Some(v) = items.get(*i) {
                        next.push(v);
                    }
                }
                (Segment::Wildcard, Value::Array(items)) => next.extend(items.iter()),
                (Segment::Wildcard, Value::Object(map)) => next.extend(map.values()),
                _ => {}
            }
        }
        current = next;
    }
    current
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// An immutable upstream response body.
///
/// Owned by the call that produced it. Sub-documents returned by
/// [`get_object_list`](UpstreamDocument::get_object_list) are independent copies.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpstreamDocument {
    root: Value,
}

impl UpstreamDocument {
    pub fn new(root: Value) -> Self {
        UpstreamDocument { root }
    }

    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        Ok(UpstreamDocument::new(serde_json::from_str(body)?))
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Reads a required scalar. Numbers and booleans are rendered as strings.
    pub fn get_string(&self, path: &str) -> Result<String, DocumentError> {
        match self.find_string(path)? {
            Some(s) => Ok(s),
            None => {
                let segments = parse_path(path)?;
                match select(&self.root, &segments).first() {
                    Some(v) if !v.is_null() => Err(DocumentError::NotAString(path.to_string())),
                    _ => Err(DocumentError::Missing(path.to_string())),
                }
            }
        }
    }

    /// Reads an optional scalar; absent, `null` and non-scalar values yield `None`.
    pub fn find_string(&self, path: &str) -> Result<Option<String>, DocumentError> {
        let segments = parse_path(path)?;
        Ok(select(&self.root, &segments)
            .first()
            .and_then(|v| scalar_to_string(v)))
    }

    /// Collects every scalar the path selects, in document order. Non-scalars are skipped.
    pub fn get_string_list(&self, path: &str) -> Result<Vec<String>, DocumentError> {
        let segments = parse_path(path)?;
        Ok(select(&self.root, &segments)
            .into_iter()
            .filter_map(scalar_to_string)
            .collect())
    }

    /// Collects every object the path selects as its own document.
    pub fn get_object_list(&self, path: &str) -> Result<Vec<UpstreamDocument>, DocumentError> {
        let segments = parse_path(path)?;
        Ok(select(&self.root, &segments)
            .into_iter()
            .filter(|v| v.is_object())
            .map(|v| UpstreamDocument::new(v.clone()))
            .collect())
    }
}

impl From<Value> for UpstreamDocument {
    fn from(root: Value) -> Self {
        UpstreamDocument::new(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue() -> UpstreamDocument {
        json!({
            "id": 10001,
            "key": "ABC-1",
            "fields": {
                "summary": "Fix the build",
                "resolution": null,
                "components": [{"name": "core"}, {"name": "ui"}, {"id": "3"}],
                "comment": {"comments": [{"body": "first"}, {"body": "second"}]}
            }
        })
        .into()
    }

    #[test]
    fn test_get_string_reads_nested_members() {
        let doc = issue();
        assert_eq!(doc.get_string("$.key").unwrap(), "ABC-1");
        assert_eq!(doc.get_string("$.fields.summary").unwrap(), "Fix the build");
        assert_eq!(doc.get_string("$['fields']['summary']").unwrap(), "Fix the build");
    }

    #[test]
    fn test_numbers_render_as_strings() {
        assert_eq!(issue().get_string("$.id").unwrap(), "10001");
    }

    #[test]
    fn test_missing_and_null_are_reported_as_missing() {
        let doc = issue();
        assert_eq!(
            doc.get_string("$.fields.priority.name"),
            Err(DocumentError::Missing("$.fields.priority.name".into()))
        );
        assert_eq!(
            doc.get_string("$.fields.resolution"),
            Err(DocumentError::Missing("$.fields.resolution".into()))
        );
        assert_eq!(doc.find_string("$.fields.resolution.name").unwrap(), None);
    }

    #[test]
    fn test_object_is_not_a_string() {
        assert_eq!(
            issue().get_string("$.fields"),
            Err(DocumentError::NotAString("$.fields".into()))
        );
    }

    #[test]
    fn test_wildcard_list_extraction() {
        let doc = issue();
        assert_eq!(
            doc.get_string_list("$.fields.components[*].name").unwrap(),
            vec!["core", "ui"]
        );
        assert!(doc.get_string_list("$.fields.fixVersions[*].name").unwrap().is_empty());
        assert_eq!(doc.get_string("$.fields.components[1].name").unwrap(), "ui");
    }

    #[test]
    fn test_object_list_extraction() {
        let comments = issue().get_object_list("$.fields.comment.comments[*]").unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[1].get_string("$.body").unwrap(), "second");
    }

    #[test]
    fn test_invalid_paths() {
        let doc = issue();
        assert!(matches!(doc.get_string("fields"), Err(DocumentError::InvalidPath(_))));
        assert!(matches!(doc.get_string("$..x"), Err(DocumentError::InvalidPath(_))));
        assert!(matches!(doc.get_string("$.a[x]"), Err(DocumentError::InvalidPath(_))));
        assert!(matches!(doc.get_string("$.a[1"), Err(DocumentError::InvalidPath(_))));
    }
}
