//! Local cache of remote Helm charts
//!
//! Charts are pulled once with `helm pull --untar` and stored under a
//! directory named after a hash of (repo, chart, version).

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::error::{RenderError, Result};
use crate::process::ToolCommand;

/// Where pulled charts are kept
#[derive(Debug, Clone)]
pub struct ChartCache {
    root: PathBuf,
}

impl ChartCache {
    /// Cache rooted at `<dir>/argorender`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            root: dir.as_ref().join("argorender"),
        }
    }

    /// Cache in the platform cache directory (`$XDG_CACHE_HOME` on Linux)
    pub fn from_platform() -> Option<Self> {
        dirs::cache_dir().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a chart is (or will be) stored in
    pub fn entry_path(&self, repo_url: &str, chart: &str, version: &str) -> PathBuf {
        let digest = Sha256::digest(format!("{}|{}|{}", repo_url, chart, version).as_bytes());
        self.root.join(format!("chart-{}", hex::encode(digest)))
    }

    /// Return the local directory for a chart, pulling it when not cached
    pub async fn fetch(
        &self,
        helm_binary: &Path,
        repo_url: &str,
        chart: &str,
        version: Option<&str>,
    ) -> Result<PathBuf> {
        let version = version.unwrap_or("");
        let entry = self.entry_path(repo_url, chart, version);
        if entry.is_dir() {
            tracing::debug!(chart, dir = %entry.display(), "using cached chart");
            return Ok(entry);
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| RenderError::io(&self.root, e))?;

        // Removed on drop, so a failed pull leaves nothing behind
        let staging = tempfile::Builder::new()
            .prefix(".pull-")
            .tempdir_in(&self.root)
            .map_err(|e| RenderError::io(&self.root, e))?;

        let mut command = ToolCommand::new("helm", helm_binary).arg("pull");
        command = if is_oci(repo_url) {
            command.arg(format!("{}/{}", repo_url.trim_end_matches('/'), chart))
        } else {
            command.arg(chart).arg("--repo").arg(repo_url)
        };
        if !version.is_empty() {
            command = command.arg("--version").arg(version);
        }
        command = command
            .arg("--untar")
            .arg("--destination")
            .arg(staging.path().as_os_str());

        command.output().await.map_err(|e| match e {
            RenderError::ToolFailed { stderr, .. } => RenderError::ChartPull {
                chart: chart.to_string(),
                repo: repo_url.to_string(),
                message: stderr,
            },
            other => other,
        })?;

        let pulled = untarred_chart(staging.path()).ok_or_else(|| RenderError::ChartPull {
            chart: chart.to_string(),
            repo: repo_url.to_string(),
            message: "helm pull produced no chart directory".to_string(),
        })?;

        match tokio::fs::rename(&pulled, &entry).await {
            Ok(()) => {}
            // Another render cached the same chart first
            Err(_) if entry.is_dir() => {}
            Err(e) => return Err(RenderError::io(&entry, e)),
        }

        tracing::debug!(chart, dir = %entry.display(), "cached chart");
        Ok(entry)
    }
}

fn is_oci(repo_url: &str) -> bool {
    url::Url::parse(repo_url).is_ok_and(|url| url.scheme() == "oci")
}

fn untarred_chart(staging: &Path) -> Option<PathBuf> {
    std::fs::read_dir(staging)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| path.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entry_path_is_stable() {
        let cache = ChartCache::new("/cache");
        let a = cache.entry_path("https://charts.example.com", "web", "1.0.0");
        let b = cache.entry_path("https://charts.example.com", "web", "1.0.0");
        let c = cache.entry_path("https://charts.example.com", "web", "1.0.1");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("/cache/argorender"));
        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("chart-"));
        assert_eq!(name.len(), "chart-".len() + 64);
    }

    #[test]
    fn test_is_oci() {
        assert!(is_oci("oci://registry.example.com/charts"));
        assert!(!is_oci("https://charts.example.com"));
        assert!(!is_oci("registry.example.com/charts"));
    }

    #[tokio::test]
    async fn test_cached_entry_skips_pull() {
        let dir = TempDir::new().unwrap();
        let cache = ChartCache::new(dir.path());
        let entry = cache.entry_path("https://charts.example.com", "web", "1.0.0");
        std::fs::create_dir_all(&entry).unwrap();

        let found = cache
            .fetch(
                Path::new("/nonexistent/helm"),
                "https://charts.example.com",
                "web",
                Some("1.0.0"),
            )
            .await
            .unwrap();
        assert_eq!(found, entry);
    }

    #[cfg(unix)]
    fn fake_helm(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-helm");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_pull_into_cache() {
        let bin = TempDir::new().unwrap();
        let helm = fake_helm(
            bin.path(),
            r#"while [ $# -gt 0 ]; do
  if [ "$1" = "--destination" ]; then dest="$2"; fi
  shift
done
mkdir -p "$dest/web" && echo 'name: web' > "$dest/web/Chart.yaml""#,
        );

        let dir = TempDir::new().unwrap();
        let cache = ChartCache::new(dir.path());
        let entry = cache
            .fetch(&helm, "https://charts.example.com", "web", None)
            .await
            .unwrap();

        assert_eq!(entry, cache.entry_path("https://charts.example.com", "web", ""));
        assert!(entry.join("Chart.yaml").exists());

        let leftovers: Vec<_> = std::fs::read_dir(cache.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".pull-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_pull_leaves_no_entry() {
        let bin = TempDir::new().unwrap();
        let helm = fake_helm(bin.path(), "echo 'Error: chart \"web\" not found' >&2\nexit 1");

        let dir = TempDir::new().unwrap();
        let cache = ChartCache::new(dir.path());
        let err = cache
            .fetch(&helm, "https://charts.example.com", "web", Some("9.9.9"))
            .await
            .unwrap_err();

        match err {
            RenderError::ChartPull { message, .. } => assert!(message.contains("not found")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!cache.entry_path("https://charts.example.com", "web", "9.9.9").exists());
        assert_eq!(std::fs::read_dir(cache.root()).unwrap().count(), 0);
    }
}
