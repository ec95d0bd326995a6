//! Per-request rendering options

use std::path::PathBuf;

use argorender_core::{ByteSize, KubeVersion, DEFAULT_MAX_MANIFEST_SIZE};

/// Label Argo CD uses to track which Application owns an object
pub const DEFAULT_TRACKING_LABEL: &str = "app.kubernetes.io/instance";

/// Options that apply to the whole render
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Kubernetes version passed to Helm when the source sets none
    pub kube_version: Option<KubeVersion>,
    pub helm: HelmOptions,
    pub kustomize: KustomizeOptions,
    /// Upper bound for the combined raw output of all sources
    pub max_manifest_size: ByteSize,
    /// Label stamped with the Application name, `None` to disable
    pub tracking_label: Option<String>,
    /// Root for pulled remote charts, platform cache dir when unset
    pub chart_cache_dir: Option<PathBuf>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            kube_version: None,
            helm: HelmOptions::default(),
            kustomize: KustomizeOptions::default(),
            max_manifest_size: DEFAULT_MAX_MANIFEST_SIZE,
            tracking_label: Some(DEFAULT_TRACKING_LABEL.to_string()),
            chart_cache_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HelmOptions {
    pub binary: PathBuf,
    pub skip_crds: bool,
    pub skip_tests: bool,
}

impl Default for HelmOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("helm"),
            skip_crds: false,
            skip_tests: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KustomizeOptions {
    pub binary: PathBuf,
    /// Extra flags for `kustomize build`, split on whitespace
    pub build_options: Option<String>,
}

impl Default for KustomizeOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("kustomize"),
            build_options: None,
        }
    }
}

impl KustomizeOptions {
    pub fn build_flags(&self) -> Vec<String> {
        self.build_options
            .as_deref()
            .map(|opts| opts.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }
}
