//! Kustomize directories via `kustomize build`
//!
//! Imperative options from the Application (images, labels, prefix, ...) are
//! applied by generating a throwaway overlay that wraps the checked-in
//! directory as its base. The repository itself is never touched.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Component, Path};

use argorender_core::{KustomizePatch, KustomizeSource};
use tempfile::TempDir;

use super::{RenderContext, Strategy};
use crate::error::{RenderError, Result};
use crate::manifest::{split_raw, RawManifest};
use crate::process::ToolCommand;

const KUSTOMIZATION_API_VERSION: &str = "kustomize.config.k8s.io/v1beta1";

/// Renders Kustomize sources
#[derive(Debug, Clone, Copy, Default)]
pub struct KustomizeStrategy;

#[async_trait]
impl Strategy<KustomizeSource> for KustomizeStrategy {
    async fn render(
        &self,
        ctx: &RenderContext<'_>,
        bundle: &KustomizeSource,
    ) -> Result<Vec<RawManifest>> {
        let overlay = if bundle.has_overlay_options() {
            Some(write_overlay(&ctx.source_dir, bundle)?)
        } else {
            None
        };
        let build_dir = overlay
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
            .unwrap_or_else(|| ctx.source_dir.clone());

        let stdout = ToolCommand::new("kustomize", &ctx.options.kustomize.binary)
            .arg("build")
            .arg(build_dir.into_os_string())
            .args(ctx.options.kustomize.build_flags())
            .current_dir(ctx.repo_root)
            .output()
            .await?;

        drop(overlay);
        Ok(split_raw(&stdout, ctx.index, 0))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Kustomization {
    api_version: &'static str,
    kind: &'static str,
    resources: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<ImageOverride>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    common_labels: IndexMap<String, String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    common_annotations: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name_suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    replicas: Vec<ReplicaOverride>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    patches: Vec<KustomizePatch>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generator_options: Option<GeneratorOptions>,
}

/// One `images:` entry of a kustomization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOverride {
    pub name: String,
    pub new_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReplicaOverride {
    name: String,
    count: i64,
}

#[derive(Debug, Default, Serialize)]
struct GeneratorOptions {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    labels: IndexMap<String, String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    annotations: IndexMap<String, String>,
}

/// Parse `[old=]new[:tag|@digest]`
pub fn parse_image(image: &str) -> ImageOverride {
    let (old, new) = match image.split_once('=') {
        Some((old, new)) => (Some(old), new),
        None => (None, image),
    };

    let (new_name, new_tag, digest) = if let Some((name, digest)) = new.split_once('@') {
        (name, None, Some(digest.to_string()))
    } else {
        // A ':' before the last '/' belongs to a registry port
        let name_start = new.rfind('/').map_or(0, |i| i + 1);
        match new[name_start..].rfind(':') {
            Some(i) => (
                &new[..name_start + i],
                Some(new[name_start + i + 1..].to_string()),
                None,
            ),
            None => (new, None, None),
        }
    };

    ImageOverride {
        name: old.filter(|o| !o.is_empty()).unwrap_or(new_name).to_string(),
        new_name: new_name.to_string(),
        new_tag,
        digest,
    }
}

/// Write the overlay directory for `bundle` around `source_dir`
///
/// The directory is deleted when the returned guard is dropped.
pub fn write_overlay(source_dir: &Path, bundle: &KustomizeSource) -> Result<TempDir> {
    let overlay = tempfile::Builder::new()
        .prefix("kustomize-overlay-")
        .tempdir()
        .map_err(|e| RenderError::io(std::env::temp_dir(), e))?;

    let base_dir = std::fs::canonicalize(source_dir).map_err(|e| RenderError::io(source_dir, e))?;
    let base = link_base(overlay.path(), &base_dir)?;

    let kustomization = build_kustomization(&base, &base_dir, bundle)?;
    let yaml = serde_yaml::to_string(&kustomization)
        .map_err(|e| RenderError::invalid_option("kustomize", e.to_string()))?;

    let path = overlay.path().join("kustomization.yaml");
    std::fs::write(&path, yaml).map_err(|e| RenderError::io(&path, e))?;

    tracing::debug!(overlay = %overlay.path().display(), base = %base_dir.display(), "wrote kustomize overlay");
    Ok(overlay)
}

#[cfg(unix)]
fn link_base(overlay: &Path, base_dir: &Path) -> Result<String> {
    let link = overlay.join("base");
    std::os::unix::fs::symlink(base_dir, &link).map_err(|e| RenderError::io(&link, e))?;
    Ok("base".to_string())
}

#[cfg(not(unix))]
fn link_base(_overlay: &Path, base_dir: &Path) -> Result<String> {
    Ok(base_dir.display().to_string())
}

fn build_kustomization(
    base: &str,
    base_dir: &Path,
    bundle: &KustomizeSource,
) -> Result<Kustomization> {
    let replicas = bundle
        .replicas
        .iter()
        .map(|replica| {
            replica
                .count
                .value()
                .map(|count| ReplicaOverride {
                    name: replica.name.clone(),
                    count,
                })
                .map_err(|e| {
                    RenderError::invalid_option(format!("kustomize.replicas[{}]", replica.name), e.to_string())
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let patches = bundle
        .patches
        .iter()
        .enumerate()
        .map(|(i, patch)| inline_patch(base_dir, i, patch))
        .collect::<Result<Vec<_>>>()?;

    let mut generator_options = GeneratorOptions::default();
    if bundle.force_common_labels.unwrap_or(false) {
        generator_options.labels = bundle.common_labels.clone();
    }
    if bundle.force_common_annotations.unwrap_or(false) {
        generator_options.annotations = bundle.common_annotations.clone();
    }
    let force = bundle.force_common_labels.unwrap_or(false)
        || bundle.force_common_annotations.unwrap_or(false);

    Ok(Kustomization {
        api_version: KUSTOMIZATION_API_VERSION,
        kind: "Kustomization",
        resources: vec![base.to_string()],
        images: bundle.images.iter().map(|i| parse_image(i)).collect(),
        common_labels: bundle.common_labels.clone(),
        common_annotations: bundle.common_annotations.clone(),
        name_prefix: non_empty(&bundle.name_prefix),
        name_suffix: non_empty(&bundle.name_suffix),
        namespace: non_empty(&bundle.namespace),
        replicas,
        patches,
        components: bundle.components.iter().map(|c| rebase(base_dir, c)).collect(),
        generator_options: force.then_some(generator_options),
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Patch files are inlined
///
/// kustomize refuses to read files outside the overlay root, and the
/// source directory is only reachable through the `base` symlink.
fn inline_patch(base_dir: &Path, index: usize, patch: &KustomizePatch) -> Result<KustomizePatch> {
    let Some(path) = patch.path.as_deref() else {
        return Ok(patch.clone());
    };

    let file = base_dir.join(path);
    let content = std::fs::read_to_string(&file).map_err(|e| {
        RenderError::invalid_option(
            format!("kustomize.patches[{}].path", index),
            format!("cannot read {}: {}", file.display(), e),
        )
    })?;

    Ok(KustomizePatch {
        path: None,
        patch: Some(content),
        ..patch.clone()
    })
}

/// Local paths relative to the source directory become absolute
///
/// Anything that does not exist locally is left for kustomize to resolve
/// as a remote reference.
fn rebase(base_dir: &Path, path: &str) -> String {
    if path.contains("://") || Path::new(path).is_absolute() || !base_dir.join(path).exists() {
        return path.to_string();
    }

    let mut resolved = base_dir.to_path_buf();
    for component in Path::new(path).components() {
        match component {
            Component::ParentDir => {
                resolved.pop();
            }
            Component::CurDir => {}
            other => resolved.push(other),
        }
    }
    resolved.display().to_string()
}
