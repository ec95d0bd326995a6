//! Rendering strategies, one per source kind

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use argorender_core::{Application, ApplicationSource, KubeVersion, SourceType};

use crate::error::Result;
use crate::manifest::RawManifest;
use crate::options::RenderOptions;

pub mod directory;
pub mod helm;
pub mod kustomize;

pub use directory::DirectoryStrategy;
pub use helm::HelmStrategy;
pub use kustomize::KustomizeStrategy;

/// Everything a strategy needs to know about the source it renders
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    pub application: &'a Application,
    pub source: &'a ApplicationSource,
    /// 0-based position of the source in the Application
    pub index: usize,
    pub repo_root: &'a Path,
    /// Directory holding the source's files
    pub source_dir: PathBuf,
    /// Destination namespace, possibly empty
    pub namespace: &'a str,
    pub kube_version: Option<&'a KubeVersion>,
    pub source_type: SourceType,
    pub options: &'a RenderOptions,
}

impl RenderContext<'_> {
    pub fn app_name(&self) -> &str {
        self.application.name()
    }
}

/// Renders one kind of source into raw manifest documents
///
/// Implementations must not modify the repository. Temporary files they
/// create are removed when the returned future completes or is dropped.
#[async_trait]
pub trait Strategy<B>: Send + Sync
where
    B: Send + Sync + 'static,
{
    async fn render(&self, ctx: &RenderContext<'_>, bundle: &B) -> Result<Vec<RawManifest>>;
}
