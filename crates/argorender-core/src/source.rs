//! Application sources and their kind-specific option bundles
//!
//! A source is one unit of manifest material inside an Application: a Helm
//! chart, a Kustomize overlay or a plain directory of manifests. At most one
//! option bundle is expected per source; when none is set the kind is
//! inferred from the files on disk.
//!
//! Every option is modelled as present/absent so that a legitimate zero
//! value (`replicas: 0`, `recurse: false`) is never confused with "unset".

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// How a source gets rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    Helm,
    Kustomize,
    Directory,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Helm => write!(f, "Helm"),
            SourceType::Kustomize => write!(f, "Kustomize"),
            SourceType::Directory => write!(f, "Directory"),
        }
    }
}

/// A resolved source kind together with the options that drive its renderer
///
/// Inferred kinds carry a default (empty) bundle.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Helm(HelmSource),
    Kustomize(KustomizeSource),
    Directory(DirectorySource),
}

impl SourceKind {
    /// The plain type tag for this kind
    pub fn source_type(&self) -> SourceType {
        match self {
            SourceKind::Helm(_) => SourceType::Helm,
            SourceKind::Kustomize(_) => SourceType::Kustomize,
            SourceKind::Directory(_) => SourceType::Directory,
        }
    }
}

/// One `spec.source` / `spec.sources[]` entry of an Application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSource {
    /// Repository the source lives in
    #[serde(rename = "repoURL", default)]
    pub repo_url: String,

    /// Path relative to the repository root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_revision: Option<String>,

    /// Remote Helm chart name (for Helm repository sources)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,

    /// Name other sources use to reference this one (`$name/values.yaml`)
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kustomize: Option<KustomizeSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<DirectorySource>,

    /// Config management plugin settings (not renderable locally)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<serde_yaml::Value>,
}

impl ApplicationSource {
    /// The source path, or an empty string when unset
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or("")
    }

    /// Number of kind-specific option bundles that are set
    pub fn explicit_bundle_count(&self) -> usize {
        [
            self.helm.is_some(),
            self.kustomize.is_some(),
            self.directory.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// Whether this source only exists to be referenced by other sources
    ///
    /// Such sources have a `ref` but neither a path nor a chart and
    /// contribute no manifests of their own.
    pub fn is_reference_only(&self) -> bool {
        self.reference.is_some() && self.path().is_empty() && self.chart.is_none()
    }
}

/// Helm options of a source (`spec.source.helm`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmSource {
    /// Release name, defaults to the Application name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_name: Option<String>,

    /// Values files, relative to the source path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value_files: Vec<String>,

    /// Inline values as a YAML string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,

    /// Inline values as a structured object (wins over `values`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_object: Option<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<HelmParameter>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_parameters: Vec<HelmFileParameter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_missing_value_files: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_crds: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_tests: Option<bool>,

    /// Namespace override for `helm template`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Kubernetes version override for `helm template`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_version: Option<String>,
}

impl HelmSource {
    /// Inline values serialized as YAML, if any were given
    ///
    /// `valuesObject` takes precedence over the `values` string.
    pub fn inline_values(&self) -> Result<Option<String>> {
        if let Some(object) = &self.values_object {
            if !object.is_null() {
                return Ok(Some(serde_yaml::to_string(object)?));
            }
        }

        Ok(self
            .values
            .as_ref()
            .filter(|values| !values.trim().is_empty())
            .cloned())
    }

    pub fn ignores_missing_value_files(&self) -> bool {
        self.ignore_missing_value_files.unwrap_or(false)
    }
}

/// A `--set` / `--set-string` parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmParameter {
    pub name: String,

    #[serde(default)]
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_string: Option<bool>,
}

/// A `--set-file` parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmFileParameter {
    pub name: String,
    pub path: String,
}

/// Kustomize options of a source (`spec.source.kustomize`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KustomizeSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_suffix: Option<String>,

    /// Image overrides in `[old=]new[:tag|@digest]` form
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub common_labels: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub common_annotations: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_common_labels: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_common_annotations: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replicas: Vec<KustomizeReplica>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<KustomizePatch>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
}

impl KustomizeSource {
    /// Whether any option requires a synthesized overlay
    pub fn has_overlay_options(&self) -> bool {
        !self.images.is_empty()
            || !self.common_labels.is_empty()
            || !self.common_annotations.is_empty()
            || self.name_prefix.as_deref().is_some_and(|p| !p.is_empty())
            || self.name_suffix.as_deref().is_some_and(|s| !s.is_empty())
            || self.namespace.as_deref().is_some_and(|n| !n.is_empty())
            || !self.replicas.is_empty()
            || !self.patches.is_empty()
            || !self.components.is_empty()
            || self.force_common_labels.unwrap_or(false)
            || self.force_common_annotations.unwrap_or(false)
    }
}

/// Replica override for a named workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KustomizeReplica {
    pub name: String,
    pub count: ReplicaCount,
}

/// Replica count as written in the Application (int or string)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplicaCount {
    Int(i64),
    Str(String),
}

impl ReplicaCount {
    /// Parse the count into a non-negative integer
    pub fn value(&self) -> Result<i64> {
        let count = match self {
            ReplicaCount::Int(n) => *n,
            ReplicaCount::Str(s) => s.trim().parse::<i64>().map_err(|e| {
                CoreError::InvalidApplication {
                    message: format!("replica count '{}' is not an integer: {}", s, e),
                }
            })?,
        };

        if count < 0 {
            return Err(CoreError::InvalidApplication {
                message: format!("replica count {} must not be negative", count),
            });
        }

        Ok(count)
    }
}

/// A Kustomize patch (inline or by path)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KustomizePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<KustomizeSelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<IndexMap<String, bool>>,
}

/// Patch target selector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KustomizeSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_selector: Option<String>,
}

/// Plain directory options (`spec.source.directory`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurse: Option<bool>,

    /// Glob of files to include, relative to the source path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,

    /// Glob of files to exclude, relative to the source path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
}
