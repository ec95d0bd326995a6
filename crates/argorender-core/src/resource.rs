//! Parsed Kubernetes resources and their identity keys

use serde_yaml::{Mapping, Value};

use crate::error::{CoreError, Result};

/// Kind of the CustomResourceDefinition resource
pub const CRD_KIND: &str = "CustomResourceDefinition";

/// Identity of a resource for deduplication: (group, kind, namespace, name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub group: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(
        group: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.group, self.kind, self.namespace, self.name
        )
    }
}

/// A manifest parsed into structured form
///
/// Always a mapping with string `apiVersion` and `kind`. `source` is the
/// 0-based position of the Application source that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceObject {
    manifest: Mapping,
    source: usize,
}

impl ResourceObject {
    /// Build from an already parsed YAML value
    pub fn from_value(value: Value, source: usize) -> Result<Self> {
        let Value::Mapping(manifest) = value else {
            return Err(CoreError::InvalidManifest {
                message: "document is not a YAML mapping".to_string(),
            });
        };

        for field in ["apiVersion", "kind"] {
            let present = manifest
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty());
            if !present {
                return Err(CoreError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        Ok(Self { manifest, source })
    }

    /// Parse a single YAML (or JSON) document
    pub fn from_yaml(doc: &str, source: usize) -> Result<Self> {
        let value: Value = serde_yaml::from_str(doc)?;
        Self::from_value(value, source)
    }

    pub fn source(&self) -> usize {
        self.source
    }

    pub fn api_version(&self) -> &str {
        self.str_field("apiVersion")
    }

    pub fn kind(&self) -> &str {
        self.str_field("kind")
    }

    /// API group, empty for the core group (`v1`)
    pub fn group(&self) -> &str {
        match self.api_version().split_once('/') {
            Some((group, _)) => group,
            None => "",
        }
    }

    pub fn name(&self) -> &str {
        self.metadata_str("name").unwrap_or("")
    }

    pub fn generate_name(&self) -> Option<&str> {
        self.metadata_str("generateName").filter(|s| !s.is_empty())
    }

    /// Namespace, `None` when unset or empty
    pub fn namespace(&self) -> Option<&str> {
        self.metadata_str("namespace").filter(|s| !s.is_empty())
    }

    /// Set or clear `metadata.namespace`
    pub fn set_namespace(&mut self, namespace: Option<&str>) {
        match namespace {
            Some(ns) if !ns.is_empty() => {
                self.metadata_mut()
                    .insert(Value::from("namespace"), Value::from(ns));
            }
            _ => {
                if let Some(Value::Mapping(metadata)) = self.manifest.get_mut("metadata") {
                    metadata.remove("namespace");
                }
            }
        }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.manifest
            .get("metadata")
            .and_then(|m| m.get("labels"))
            .and_then(|l| l.get(key))
            .and_then(Value::as_str)
    }

    /// Set `metadata.labels[key]`, creating the labels map when needed
    pub fn set_label(&mut self, key: &str, value: &str) {
        let metadata = self.metadata_mut();
        if !matches!(metadata.get("labels"), Some(Value::Mapping(_))) {
            metadata.insert(Value::from("labels"), Value::Mapping(Mapping::new()));
        }
        if let Some(Value::Mapping(labels)) = metadata.get_mut("labels") {
            labels.insert(Value::from(key), Value::from(value));
        }
    }

    /// Whether this object is a CustomResourceDefinition
    pub fn is_crd(&self) -> bool {
        self.kind() == CRD_KIND && self.group() == "apiextensions.k8s.io"
    }

    /// Identity key built from the current field values
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(
            self.group(),
            self.kind(),
            self.namespace().unwrap_or(""),
            self.name(),
        )
    }

    /// Raw access to the manifest
    pub fn manifest(&self) -> &Mapping {
        &self.manifest
    }

    pub fn into_manifest(self) -> Mapping {
        self.manifest
    }

    /// Serialize back to a YAML document (without separator)
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.manifest)?)
    }

    fn str_field(&self, field: &str) -> &str {
        self.manifest
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    fn metadata_str(&self, field: &str) -> Option<&str> {
        self.manifest
            .get("metadata")
            .and_then(|m| m.get(field))
            .and_then(Value::as_str)
    }

    fn metadata_mut(&mut self) -> &mut Mapping {
        if !matches!(self.manifest.get("metadata"), Some(Value::Mapping(_))) {
            self.manifest
                .insert(Value::from("metadata"), Value::Mapping(Mapping::new()));
        }
        match self.manifest.get_mut("metadata") {
            Some(Value::Mapping(metadata)) => metadata,
            _ => unreachable!("metadata mapping was inserted above"),
        }
    }
}
