//! Source type detection
//!
//! Explicit option bundles always win, in the order Helm, Kustomize,
//! Directory. Without one, the source directory is inspected for a chart
//! descriptor, then a kustomization file; anything else is a plain
//! directory of manifests.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use argorender_core::{
    ApplicationSource, DirectorySource, HelmSource, KustomizeSource, SourceKind,
};

use crate::error::{RenderError, Result};

/// Files that mark a Helm chart
pub const HELM_MARKERS: &[&str] = &["Chart.yaml", "Chart.yml"];

/// Files that mark a Kustomize directory
pub const KUSTOMIZE_MARKERS: &[&str] = &["kustomization.yaml", "kustomization.yml", "Kustomization"];

/// Resolve the directory a source path points at
///
/// An empty path (or one equal to the root) is the root itself; an absolute
/// path is used as-is.
pub fn resolve_source_dir(repo_root: &Path, app_path: &str) -> PathBuf {
    let path = Path::new(app_path);
    if app_path.is_empty() || path == repo_root {
        repo_root.to_path_buf()
    } else if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo_root.join(path)
    }
}

/// Decide how a source gets rendered
pub fn detect_source_kind(
    source: &ApplicationSource,
    app_path: &str,
    repo_root: &Path,
    app_name: &str,
) -> Result<SourceKind> {
    if source.explicit_bundle_count() > 1 {
        tracing::debug!(
            app = app_name,
            path = app_path,
            "source sets several option bundles, using the first of helm, kustomize, directory"
        );
    }

    if let Some(helm) = &source.helm {
        return Ok(SourceKind::Helm(helm.clone()));
    }
    if let Some(kustomize) = &source.kustomize {
        return Ok(SourceKind::Kustomize(kustomize.clone()));
    }
    if let Some(directory) = &source.directory {
        return Ok(SourceKind::Directory(directory.clone()));
    }

    let dir = resolve_source_dir(repo_root, app_path);
    let metadata = std::fs::metadata(&dir).map_err(|e| RenderError::io(&dir, e))?;
    if !metadata.is_dir() {
        return Err(RenderError::io(
            &dir,
            std::io::Error::new(ErrorKind::NotADirectory, "source path is not a directory"),
        ));
    }

    let kind = if has_any(&dir, HELM_MARKERS)? {
        SourceKind::Helm(HelmSource::default())
    } else if has_any(&dir, KUSTOMIZE_MARKERS)? {
        SourceKind::Kustomize(KustomizeSource::default())
    } else {
        SourceKind::Directory(DirectorySource::default())
    };

    tracing::debug!(
        app = app_name,
        dir = %dir.display(),
        "inferred source type {}",
        kind.source_type()
    );

    Ok(kind)
}

fn has_any(dir: &Path, markers: &[&str]) -> Result<bool> {
    for marker in markers {
        let path = dir.join(marker);
        match std::fs::symlink_metadata(&path) {
            Ok(_) => return Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(RenderError::io(path, e)),
        }
    }
    Ok(false)
}
