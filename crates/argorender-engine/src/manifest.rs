//! Splitting tool output into documents and parsing them into objects

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;

use argorender_core::ResourceObject;

use crate::warning::Warning;

/// One YAML/JSON document produced by a strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawManifest {
    pub content: String,
    /// 0-based source position
    pub source: usize,
    /// 0-based document position within the source
    pub document: usize,
}

impl RawManifest {
    pub fn new(content: impl Into<String>, source: usize, document: usize) -> Self {
        Self {
            content: content.into(),
            source,
            document,
        }
    }
}

static DOCUMENT_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^---[ \t]*(?:#.*)?\r?$").expect("separator regex is valid"));

/// Split a YAML stream into documents, dropping empty and comment-only ones
pub fn split_documents(text: &str) -> Vec<&str> {
    DOCUMENT_SEPARATOR
        .split(text)
        .map(|doc| doc.trim_matches(['\n', '\r']))
        .filter(|doc| !is_blank(doc))
        .collect()
}

/// Split tool output into raw manifests numbered from `first_document`
pub fn split_raw(text: &str, source: usize, first_document: usize) -> Vec<RawManifest> {
    split_documents(text)
        .into_iter()
        .enumerate()
        .map(|(i, doc)| RawManifest::new(doc, source, first_document + i))
        .collect()
}

fn is_blank(doc: &str) -> bool {
    doc.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

/// Parse raw manifests into resource objects
///
/// Documents that fail to parse, or that are not Kubernetes objects, become
/// warnings. `*List` documents are expanded into their items.
pub fn parse_manifests(raw: &[RawManifest]) -> (Vec<ResourceObject>, Vec<Warning>) {
    let mut objects = Vec::new();
    let mut warnings = Vec::new();

    for manifest in raw {
        tracing::trace!(
            source = manifest.source,
            document = manifest.document,
            "parsing manifest"
        );

        let unparsed = |message: String| Warning::UnparsedManifest {
            source: manifest.source,
            document: manifest.document,
            message,
        };

        let value: Value = match serde_yaml::from_str(&manifest.content) {
            Ok(value) => value,
            Err(e) => {
                warnings.push(unparsed(e.to_string()));
                continue;
            }
        };

        if value.is_null() {
            continue;
        }

        match list_items(&value) {
            Some(items) => {
                for item in items {
                    match ResourceObject::from_value(item.clone(), manifest.source) {
                        Ok(obj) => objects.push(obj),
                        Err(e) => warnings.push(unparsed(format!("list item: {}", e))),
                    }
                }
            }
            None => match ResourceObject::from_value(value, manifest.source) {
                Ok(obj) => objects.push(obj),
                Err(e) => warnings.push(unparsed(e.to_string())),
            },
        }
    }

    (objects, warnings)
}

fn list_items(value: &Value) -> Option<&Vec<Value>> {
    let kind = value.get("kind")?.as_str()?;
    if !kind.ends_with("List") {
        return None;
    }
    value.get("items")?.as_sequence()
}
