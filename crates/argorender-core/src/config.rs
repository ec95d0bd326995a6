//! User configuration
//!
//! Stored in `~/.config/argorender/config.yaml` (platform config directory).
//! Every field is optional; command-line flags and environment variables
//! override what is set here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::kube_version::KubeVersion;
use crate::size::ByteSize;

/// Configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Path or name of the `helm` binary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm_binary: Option<PathBuf>,

    /// Path or name of the `kustomize` binary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kustomize_binary: Option<PathBuf>,

    /// Kubernetes version passed to Helm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_version: Option<String>,

    /// Extra flags for `kustomize build`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kustomize_build_options: Option<String>,

    /// Upper bound for the combined rendered output, e.g. `10Mi`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_manifest_size: Option<String>,

    /// Label key stamped with the Application name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_label_key: Option<String>,

    /// Where pulled remote charts are kept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_cache_dir: Option<PathBuf>,

    /// Render timeout, e.g. `5m`
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| CoreError::InvalidConfig {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Default configuration path, if a config directory exists on this platform
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("argorender").join("config.yaml"))
    }

    /// Parsed `maxManifestSize`
    pub fn max_manifest_size(&self) -> Result<Option<ByteSize>> {
        self.max_manifest_size
            .as_deref()
            .map(str::parse)
            .transpose()
    }

    /// Parsed `kubeVersion`
    pub fn kube_version(&self) -> Result<Option<KubeVersion>> {
        self.kube_version.as_deref().map(str::parse).transpose()
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |e: CoreError| CoreError::InvalidConfig {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        self.max_manifest_size().map_err(invalid)?;
        self.kube_version().map_err(invalid)?;
        Ok(())
    }
}
