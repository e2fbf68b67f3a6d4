//! Record documents: a TOML description of a structural record tree.
//!
//! ```toml
//! [[record]]
//! tag = "group"
//! label = "dashboard"
//!
//!   [[record.children]]
//!   tag = "series"
//!   label = "latency"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{RecordId, RecordStore, StructuralRecord};

/// One record and its nested children.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RecordSpec {
    pub tag: Option<String>,
    pub label: Option<String>,
    #[serde(default)]
    pub children: Vec<RecordSpec>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RecordDocument {
    #[serde(default, rename = "record")]
    pub records: Vec<RecordSpec>,
    #[serde(skip)]
    pub path: PathBuf,
}

impl RecordDocument {
    /// Parses a document from TOML text. `path` is used for error messages only.
    pub fn parse(content: &str, path: &Path) -> ApplicationResult<Self> {
        let mut document: RecordDocument =
            toml::from_str(content).map_err(|e| ApplicationError::Document {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if document.records.is_empty() {
            return Err(ApplicationError::Document {
                path: path.to_path_buf(),
                message: "no [[record]] table".to_string(),
            });
        }
        document.path = path.to_path_buf();
        Ok(document)
    }

    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> ApplicationResult<Self> {
        let content = std::fs::read_to_string(path).with_path_context("read document", path)?;
        Self::parse(&content, path)
    }

    /// Directory holding the document, where a local config may live.
    pub fn dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// Materializes the records. Untagged records receive `default_kind`.
    ///
    /// Returns the store and the top-level records in document order.
    pub fn into_store(
        &self,
        default_kind: Option<&str>,
    ) -> ApplicationResult<(RecordStore, Vec<RecordId>)> {
        let mut store = RecordStore::new();
        let mut roots = Vec::with_capacity(self.records.len());
        for spec in &self.records {
            roots.push(insert_spec(&mut store, spec, None, default_kind)?);
        }
        debug!(records = store.len(), roots = roots.len(), "materialized document");
        Ok((store, roots))
    }
}

fn insert_spec(
    store: &mut RecordStore,
    spec: &RecordSpec,
    parent: Option<RecordId>,
    default_kind: Option<&str>,
) -> ApplicationResult<RecordId> {
    let record = StructuralRecord {
        tag: spec.tag.clone().or_else(|| default_kind.map(str::to_string)),
        label: spec.label.clone(),
        ..StructuralRecord::default()
    };
    let id = store.insert(record, parent)?;
    for child in &spec.children {
        insert_spec(store, child, Some(id), default_kind)?;
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
[[record]]
tag = "group"
label = "root"

  [[record.children]]
  tag = "series"
  label = "a"

    [[record.children.children]]
    label = "c"

  [[record.children]]
  tag = "series"
  label = "b"
"#;

    #[test]
    fn given_nested_document_when_materializing_then_preserves_order() {
        let doc = RecordDocument::parse(DOC, Path::new("doc.toml")).unwrap();

        let (store, roots) = doc.into_store(Some("axis")).unwrap();

        assert_eq!(roots.len(), 1);
        let labels: Vec<_> = store
            .iter_from(roots[0])
            .map(|(_, r)| r.label.clone().unwrap_or_default())
            .collect();
        assert_eq!(labels, vec!["root", "a", "c", "b"]);
    }

    #[test]
    fn given_untagged_record_when_materializing_then_default_kind_applies() {
        let doc = RecordDocument::parse(DOC, Path::new("doc.toml")).unwrap();

        let (store, roots) = doc.into_store(Some("axis")).unwrap();

        let a = store.children_of(roots[0]).unwrap()[0];
        let c = store.children_of(a).unwrap()[0];
        assert_eq!(store.get(c).unwrap().tag(), Some("axis"));
    }

    #[test]
    fn given_empty_document_when_parsing_then_document_error() {
        let result = RecordDocument::parse("", Path::new("empty.toml"));

        assert!(matches!(result, Err(ApplicationError::Document { .. })));
    }

    #[test]
    fn given_unknown_field_when_parsing_then_document_error() {
        let result = RecordDocument::parse("[[record]]\ncolour = 1\n", Path::new("x.toml"));

        assert!(matches!(result, Err(ApplicationError::Document { .. })));
    }
}
