//! Helm charts via `helm template`

use async_trait::async_trait;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use argorender_core::HelmSource;
use tempfile::NamedTempFile;

use super::{RenderContext, Strategy};
use crate::error::{RenderError, Result};
use crate::manifest::{split_raw, RawManifest};
use crate::process::ToolCommand;

/// Renders Helm sources
#[derive(Debug, Clone, Copy, Default)]
pub struct HelmStrategy;

#[async_trait]
impl Strategy<HelmSource> for HelmStrategy {
    async fn render(&self, ctx: &RenderContext<'_>, bundle: &HelmSource) -> Result<Vec<RawManifest>> {
        // Removed on drop, whichever way this function exits
        let inline_values = write_inline_values(bundle)?;
        let args = helm_args(ctx, bundle, inline_values.as_ref().map(NamedTempFile::path))?;

        let stdout = ToolCommand::new("helm", &ctx.options.helm.binary)
            .args(args)
            .current_dir(ctx.repo_root)
            .output()
            .await?;

        Ok(split_raw(&stdout, ctx.index, 0))
    }
}

fn write_inline_values(bundle: &HelmSource) -> Result<Option<NamedTempFile>> {
    let Some(values) = bundle.inline_values()? else {
        return Ok(None);
    };

    let mut file = tempfile::Builder::new()
        .prefix("argorender-values-")
        .suffix(".yaml")
        .tempfile()
        .map_err(|e| RenderError::io(std::env::temp_dir(), e))?;
    let path = file.path().to_path_buf();
    file.write_all(values.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| RenderError::io(path, e))?;

    Ok(Some(file))
}

/// Arguments for `helm template`, in the order Helm applies them
pub fn helm_args(
    ctx: &RenderContext<'_>,
    bundle: &HelmSource,
    inline_values: Option<&Path>,
) -> Result<Vec<OsString>> {
    let release = bundle
        .release_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| ctx.app_name());

    let mut args: Vec<OsString> = vec![
        "template".into(),
        release.into(),
        ctx.source_dir.clone().into_os_string(),
    ];

    let namespace = bundle
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .unwrap_or(ctx.namespace);
    if !namespace.is_empty() {
        args.push("--namespace".into());
        args.push(namespace.into());
    }

    let kube_version = match bundle.kube_version.as_deref().filter(|v| !v.is_empty()) {
        Some(version) => Some(version.to_string()),
        None => ctx.kube_version.map(|v| v.to_helm_arg()),
    };
    if let Some(version) = kube_version {
        args.push("--kube-version".into());
        args.push(version.into());
    }

    for value_file in &bundle.value_files {
        match resolve_file(ctx, value_file)? {
            ResolvedFile::Remote(url) => {
                args.push("--values".into());
                args.push(url.into());
            }
            ResolvedFile::Local(path) if path.exists() => {
                args.push("--values".into());
                args.push(path.into_os_string());
            }
            ResolvedFile::Local(path) => {
                if bundle.ignores_missing_value_files() {
                    tracing::debug!(path = %path.display(), "skipping missing values file");
                    continue;
                }
                return Err(RenderError::MissingValueFile { path });
            }
        }
    }

    if let Some(path) = inline_values {
        args.push("--values".into());
        args.push(path.as_os_str().to_os_string());
    }

    for param in &bundle.parameters {
        let flag = if param.force_string.unwrap_or(false) {
            "--set-string"
        } else {
            "--set"
        };
        args.push(flag.into());
        args.push(format!("{}={}", param.name, param.value).into());
    }

    for param in &bundle.file_parameters {
        let path = match resolve_file(ctx, &param.path)? {
            ResolvedFile::Remote(url) => PathBuf::from(url),
            ResolvedFile::Local(path) if path.exists() => path,
            ResolvedFile::Local(path) => {
                return Err(RenderError::MissingFileParameter {
                    name: param.name.clone(),
                    path,
                });
            }
        };
        let mut arg = OsString::from(format!("{}=", param.name));
        arg.push(path.as_os_str());
        args.push("--set-file".into());
        args.push(arg);
    }

    if bundle.skip_crds.unwrap_or(false) || ctx.options.helm.skip_crds {
        args.push("--skip-crds".into());
    }
    if bundle.skip_tests.unwrap_or(false) || ctx.options.helm.skip_tests {
        args.push("--skip-tests".into());
    }

    Ok(args)
}

enum ResolvedFile {
    Remote(String),
    Local(PathBuf),
}

/// Resolve a values or file-parameter path
///
/// `$ref/rest` points into the repository of the source named `ref`, which
/// is the local repository root.
fn resolve_file(ctx: &RenderContext<'_>, file: &str) -> Result<ResolvedFile> {
    if is_remote(file) {
        return Ok(ResolvedFile::Remote(file.to_string()));
    }

    if let Some(reference) = file.strip_prefix('$') {
        let (name, rest) = reference.split_once('/').unwrap_or((reference, ""));
        if ctx.application.source_by_ref(name).is_none() {
            return Err(RenderError::invalid_option(
                "helm.valueFiles",
                format!("'{}' references unknown source ref '{}'", file, name),
            ));
        }
        return Ok(ResolvedFile::Local(ctx.repo_root.join(rest)));
    }

    let path = Path::new(file);
    if path.is_absolute() {
        Ok(ResolvedFile::Local(path.to_path_buf()))
    } else {
        Ok(ResolvedFile::Local(ctx.source_dir.join(path)))
    }
}

fn is_remote(file: &str) -> bool {
    url::Url::parse(file)
        .map(|url| url.scheme().len() > 1 && file.contains("://"))
        .unwrap_or(false)
}
