//! Rendering a whole Application

use std::path::{Path, PathBuf};
use std::sync::Arc;

use argorender_core::{
    Application, ApplicationSource, DirectorySource, HelmSource, KustomizeSource, ResourceObject,
    SourceKind,
};

use crate::chart::ChartCache;
use crate::dedupe::deduplicate;
use crate::detect::{detect_source_kind, resolve_source_dir};
use crate::error::{RenderError, Result};
use crate::manifest::{parse_manifests, RawManifest};
use crate::options::RenderOptions;
use crate::scope::{CrdScopes, KnownScopes, LayeredScope, NamespaceScope};
use crate::strategy::{DirectoryStrategy, HelmStrategy, KustomizeStrategy, RenderContext, Strategy};
use crate::warning::Warning;

/// What to render
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub application: Application,
    /// Local checkout all source paths are relative to
    pub repo_root: PathBuf,
    pub options: RenderOptions,
}

impl RenderRequest {
    pub fn new(application: Application, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            application,
            repo_root: repo_root.into(),
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }
}

/// Result of rendering an Application
#[derive(Debug, Clone, Default)]
pub struct RenderOutput {
    /// Unique objects in source order
    pub objects: Vec<ResourceObject>,
    /// Parse failures first, then duplicates
    pub warnings: Vec<Warning>,
    /// Sources that produced manifests (reference-only sources excluded)
    pub sources_processed: usize,
}

/// Renderer builder
pub struct RendererBuilder {
    helm: Arc<dyn Strategy<HelmSource>>,
    kustomize: Arc<dyn Strategy<KustomizeSource>>,
    directory: Arc<dyn Strategy<DirectorySource>>,
    scope: Arc<dyn NamespaceScope>,
}

impl Default for RendererBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererBuilder {
    pub fn new() -> Self {
        Self {
            helm: Arc::new(HelmStrategy),
            kustomize: Arc::new(KustomizeStrategy),
            directory: Arc::new(DirectoryStrategy),
            scope: Arc::new(KnownScopes),
        }
    }

    pub fn helm(mut self, strategy: impl Strategy<HelmSource> + 'static) -> Self {
        self.helm = Arc::new(strategy);
        self
    }

    pub fn kustomize(mut self, strategy: impl Strategy<KustomizeSource> + 'static) -> Self {
        self.kustomize = Arc::new(strategy);
        self
    }

    pub fn directory(mut self, strategy: impl Strategy<DirectorySource> + 'static) -> Self {
        self.directory = Arc::new(strategy);
        self
    }

    /// Scope oracle consulted after CRDs found in the render
    pub fn scope(mut self, scope: impl NamespaceScope + 'static) -> Self {
        self.scope = Arc::new(scope);
        self
    }

    pub fn build(self) -> Renderer {
        Renderer {
            helm: self.helm,
            kustomize: self.kustomize,
            directory: self.directory,
            scope: self.scope,
        }
    }
}

/// Dispatches each source to its strategy and merges the results
///
/// Holds no per-render state; one instance can serve concurrent renders.
#[derive(Clone)]
pub struct Renderer {
    helm: Arc<dyn Strategy<HelmSource>>,
    kustomize: Arc<dyn Strategy<KustomizeSource>>,
    directory: Arc<dyn Strategy<DirectorySource>>,
    scope: Arc<dyn NamespaceScope>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Renderer with the built-in strategies
    pub fn new() -> Self {
        RendererBuilder::new().build()
    }

    pub fn builder() -> RendererBuilder {
        RendererBuilder::new()
    }

    /// Render every source of the Application
    ///
    /// The first failing source aborts the render. Unparsable documents and
    /// duplicates are returned as warnings.
    pub async fn render(&self, request: &RenderRequest) -> Result<RenderOutput> {
        validate(request)?;

        let app = &request.application;
        let options = &request.options;
        let mut raw: Vec<RawManifest> = Vec::new();
        let mut sources_processed = 0;

        for (index, source) in app.sources().into_iter().enumerate() {
            if source.is_reference_only() {
                tracing::debug!(source = index + 1, "skipping reference-only source");
                continue;
            }

            let manifests = self
                .render_source(request, index, source)
                .await
                .map_err(|e| e.in_source(index + 1))?;
            raw.extend(manifests);
            sources_processed += 1;
        }

        let size: u64 = raw.iter().map(|m| m.content.len() as u64).sum();
        let max = options.max_manifest_size.bytes();
        if size > max {
            return Err(RenderError::ManifestTooLarge { size, max });
        }

        let (mut objects, mut warnings) = parse_manifests(&raw);

        if let Some(label) = options.tracking_label.as_deref().filter(|l| !l.is_empty()) {
            for obj in objects.iter_mut().filter(|o| !o.is_crd()) {
                obj.set_label(label, app.name());
            }
        }

        let crds = CrdScopes::from_objects(&objects);
        let scope = LayeredScope::new(vec![&crds as &dyn NamespaceScope, self.scope.as_ref()]);
        let deduped = deduplicate(objects, app.destination_namespace(), &scope);
        warnings.extend(deduped.warnings);

        tracing::debug!(
            objects = deduped.objects.len(),
            warnings = warnings.len(),
            sources = sources_processed,
            "render complete"
        );

        Ok(RenderOutput {
            objects: deduped.objects,
            warnings,
            sources_processed,
        })
    }

    /// Detect the type of every source without rendering
    pub async fn detect(&self, request: &RenderRequest) -> Result<Vec<DetectedSource>> {
        validate(request)?;

        let mut detected = Vec::new();
        for (index, source) in request.application.sources().into_iter().enumerate() {
            if source.is_reference_only() {
                continue;
            }
            let (kind, dir) = self
                .resolve_source(request, source)
                .await
                .map_err(|e| e.in_source(index + 1))?;
            detected.push(DetectedSource {
                index,
                kind,
                source_dir: dir,
            });
        }
        Ok(detected)
    }

    async fn render_source(
        &self,
        request: &RenderRequest,
        index: usize,
        source: &ApplicationSource,
    ) -> Result<Vec<RawManifest>> {
        let app = &request.application;
        let (kind, source_dir) = self.resolve_source(request, source).await?;

        tracing::debug!(
            source = index + 1,
            dir = %source_dir.display(),
            "rendering source as {}",
            kind.source_type()
        );

        let ctx = RenderContext {
            application: app,
            source,
            index,
            repo_root: &request.repo_root,
            source_dir,
            namespace: app.destination_namespace(),
            kube_version: request.options.kube_version.as_ref(),
            source_type: kind.source_type(),
            options: &request.options,
        };

        match &kind {
            SourceKind::Helm(bundle) => self.helm.render(&ctx, bundle).await,
            SourceKind::Kustomize(bundle) => self.kustomize.render(&ctx, bundle).await,
            SourceKind::Directory(bundle) => self.directory.render(&ctx, bundle).await,
        }
    }

    /// Fetch remote charts and run detection for one source
    async fn resolve_source(
        &self,
        request: &RenderRequest,
        source: &ApplicationSource,
    ) -> Result<(SourceKind, PathBuf)> {
        let app_path = match source.chart.as_deref().filter(|c| !c.is_empty()) {
            Some(chart) => {
                let cache = chart_cache(&request.options)?;
                let dir = cache
                    .fetch(
                        &request.options.helm.binary,
                        &source.repo_url,
                        chart,
                        source.target_revision.as_deref(),
                    )
                    .await?;
                dir.display().to_string()
            }
            None => source.path().to_string(),
        };

        let mut kind =
            detect_source_kind(source, &app_path, &request.repo_root, request.application.name())?;

        // A pulled chart is always rendered by Helm
        if source.chart.is_some() && !matches!(kind, SourceKind::Helm(_)) {
            kind = SourceKind::Helm(HelmSource::default());
        }

        Ok((kind, resolve_source_dir(&request.repo_root, &app_path)))
    }
}

/// Outcome of source detection
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedSource {
    /// 0-based source position
    pub index: usize,
    pub kind: SourceKind,
    pub source_dir: PathBuf,
}

fn chart_cache(options: &RenderOptions) -> Result<ChartCache> {
    match &options.chart_cache_dir {
        Some(dir) => Ok(ChartCache::new(dir)),
        None => ChartCache::from_platform().ok_or_else(|| {
            RenderError::invalid_request("chartCacheDir", "could not determine a cache directory")
        }),
    }
}

fn validate(request: &RenderRequest) -> Result<()> {
    if request.repo_root.as_os_str().is_empty() {
        return Err(RenderError::invalid_request("repoRoot", "is required"));
    }

    let app = &request.application;
    let sources = app.sources();
    if sources.is_empty() {
        return Err(RenderError::invalid_request("spec.sources", "must not be empty"));
    }

    let field = if app.has_multiple_sources() {
        "spec.sources"
    } else {
        "spec.source"
    };
    for (i, source) in sources.iter().enumerate() {
        let prefix = if app.has_multiple_sources() {
            format!("{}[{}]", field, i)
        } else {
            field.to_string()
        };
        if source.repo_url.trim().is_empty() {
            return Err(RenderError::invalid_request(
                format!("{}.repoURL", prefix),
                "is required",
            ));
        }
        if source.plugin.is_some() {
            return Err(RenderError::invalid_request(
                format!("{}.plugin", prefix),
                "config management plugins cannot be rendered locally",
            ));
        }
    }

    Ok(())
}

/// Whether `repo_root` looks usable; used by callers before building a request
pub fn check_repo_root(repo_root: &Path) -> Result<()> {
    let metadata = std::fs::metadata(repo_root).map_err(|e| RenderError::io(repo_root, e))?;
    if metadata.is_dir() {
        Ok(())
    } else {
        Err(RenderError::invalid_request(
            "repoRoot",
            format!("{} is not a directory", repo_root.display()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Returns canned output and records what it was asked to render
    #[derive(Default)]
    struct FakeStrategy {
        outputs: Vec<Result<String>>,
        calls: Mutex<Vec<(usize, PathBuf)>>,
    }

    impl FakeStrategy {
        fn with(outputs: Vec<Result<String>>) -> Self {
            Self {
                outputs,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl<B: Send + Sync + 'static> Strategy<B> for Arc<FakeStrategy> {
        async fn render(&self, ctx: &RenderContext<'_>, _bundle: &B) -> Result<Vec<RawManifest>> {
            let mut calls = self.calls.lock().unwrap();
            let call = calls.len();
            calls.push((ctx.index, ctx.source_dir.clone()));
            match &self.outputs[call] {
                Ok(text) => Ok(crate::manifest::split_raw(text, ctx.index, 0)),
                Err(e) => Err(RenderError::ToolFailed {
                    tool: "fake".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: e.to_string(),
                }),
            }
        }
    }

    fn request(app_yaml: &str, root: &Path) -> RenderRequest {
        RenderRequest::new(Application::from_yaml(app_yaml).unwrap(), root)
    }

    const DEPLOY_WEB: &str =
        "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n  namespace: default\n";

    const TWO_HELM_SOURCES: &str = r#"
kind: Application
metadata:
  name: shop
spec:
  sources:
    - repoURL: https://example.com/a
      path: a
      helm: {}
    - repoURL: https://example.com/b
      path: b
      helm: {}
  destination:
    namespace: default
"#;

    #[tokio::test]
    async fn test_duplicate_across_sources() {
        let root = TempDir::new().unwrap();
        let fake = Arc::new(FakeStrategy::with(vec![
            Ok(DEPLOY_WEB.to_string()),
            Ok(format!("{}---\napiVersion: v1\nkind: Service\nmetadata:\n  name: web\n", DEPLOY_WEB)),
        ]));
        let renderer = Renderer::builder().helm(fake.clone()).build();

        let output = renderer
            .render(&request(TWO_HELM_SOURCES, root.path()))
            .await
            .unwrap();

        assert_eq!(output.sources_processed, 2);
        let kinds: Vec<&str> = output.objects.iter().map(|o| o.kind()).collect();
        assert_eq!(kinds, vec!["Deployment", "Service"]);
        assert_eq!(output.objects[0].source(), 0);
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].is_duplicate());
        assert!(output.warnings[0].to_string().contains("Deployment.apps default/web"));

        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls[0], (0, root.path().join("a")));
        assert_eq!(calls[1], (1, root.path().join("b")));
    }

    #[tokio::test]
    async fn test_malformed_document_is_warning() {
        let root = TempDir::new().unwrap();
        let fake = Arc::new(FakeStrategy::with(vec![Ok(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n---\nthis: is: [broken\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: b\n".to_string(),
        )]));
        let renderer = Renderer::builder().directory(fake).build();

        let app = "kind: Application\nmetadata:\n  name: cfg\nspec:\n  source:\n    repoURL: local\n    directory: {}\n";
        let output = renderer.render(&request(app, root.path())).await.unwrap();

        assert_eq!(output.objects.len(), 2);
        assert_eq!(output.warnings.len(), 1);
        assert!(matches!(
            output.warnings[0],
            Warning::UnparsedManifest { source: 0, document: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_tracking_label_and_namespace() {
        let root = TempDir::new().unwrap();
        let fake = Arc::new(FakeStrategy::with(vec![Ok(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n---\napiVersion: apiextensions.k8s.io/v1\nkind: CustomResourceDefinition\nmetadata:\n  name: widgets.example.com\nspec:\n  group: example.com\n  scope: Namespaced\n  names:\n    kind: Widget\n".to_string(),
        )]));
        let renderer = Renderer::builder().directory(fake).build();

        let app = "kind: Application\nmetadata:\n  name: cfg\nspec:\n  source:\n    repoURL: local\n    directory: {}\n  destination:\n    namespace: team\n";
        let output = renderer.render(&request(app, root.path())).await.unwrap();

        let cm = &output.objects[0];
        assert_eq!(cm.label("app.kubernetes.io/instance"), Some("cfg"));
        assert_eq!(cm.namespace(), Some("team"));

        let crd = &output.objects[1];
        assert_eq!(crd.label("app.kubernetes.io/instance"), None);
        assert_eq!(crd.namespace(), None);
    }

    #[tokio::test]
    async fn test_tracking_label_disabled() {
        let root = TempDir::new().unwrap();
        let fake = Arc::new(FakeStrategy::with(vec![Ok(DEPLOY_WEB.to_string())]));
        let renderer = Renderer::builder().directory(fake).build();

        let app = "kind: Application\nmetadata:\n  name: cfg\nspec:\n  source:\n    repoURL: local\n    directory: {}\n";
        let mut req = request(app, root.path());
        req.options.tracking_label = None;
        let output = renderer.render(&req).await.unwrap();
        assert_eq!(output.objects[0].label("app.kubernetes.io/instance"), None);
    }

    #[tokio::test]
    async fn test_strategy_error_tagged_with_source() {
        let root = TempDir::new().unwrap();
        let fake = Arc::new(FakeStrategy::with(vec![
            Ok(DEPLOY_WEB.to_string()),
            Err(RenderError::Cancelled),
        ]));
        let renderer = Renderer::builder().helm(fake).build();

        let err = renderer
            .render(&request(TWO_HELM_SOURCES, root.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Source { index: 2, .. }));
        assert!(err.to_string().starts_with("source 2: fake failed"));
    }

    #[tokio::test]
    async fn test_manifest_size_limit() {
        let root = TempDir::new().unwrap();
        let fake = Arc::new(FakeStrategy::with(vec![Ok(DEPLOY_WEB.to_string())]));
        let renderer = Renderer::builder().directory(fake).build();

        let app = "kind: Application\nmetadata:\n  name: cfg\nspec:\n  source:\n    repoURL: local\n    directory: {}\n";
        let mut req = request(app, root.path());
        req.options.max_manifest_size = argorender_core::ByteSize::new(10);
        let err = renderer.render(&req).await.unwrap_err();
        assert!(matches!(err, RenderError::ManifestTooLarge { max: 10, .. }));
    }

    #[tokio::test]
    async fn test_missing_repo_url() {
        let root = TempDir::new().unwrap();
        let app = r#"
kind: Application
metadata:
  name: shop
spec:
  sources:
    - repoURL: https://example.com/a
      path: a
    - path: b
"#;
        let err = Renderer::new()
            .render(&request(app, root.path()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "spec.sources[1].repoURL is required");
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_empty_repo_root() {
        let app = "kind: Application\nmetadata:\n  name: x\nspec:\n  source:\n    repoURL: local\n";
        let err = Renderer::new()
            .render(&request(app, Path::new("")))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_plugin_source_rejected() {
        let root = TempDir::new().unwrap();
        let app = "kind: Application\nmetadata:\n  name: x\nspec:\n  source:\n    repoURL: local\n    plugin:\n      name: cmp\n";
        let err = Renderer::new()
            .render(&request(app, root.path()))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("spec.source.plugin"));
    }

    #[tokio::test]
    async fn test_reference_only_source_skipped() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("manifests")).unwrap();
        std::fs::write(root.path().join("manifests/cm.yaml"), "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n").unwrap();

        let app = r#"
kind: Application
metadata:
  name: mixed
spec:
  sources:
    - repoURL: https://example.com/values
      ref: values
    - repoURL: https://example.com/app
      path: manifests
"#;
        let output = Renderer::new()
            .render(&request(app, root.path()))
            .await
            .unwrap();
        assert_eq!(output.sources_processed, 1);
        assert_eq!(output.objects.len(), 1);
        assert_eq!(output.objects[0].source(), 1);
    }

    #[tokio::test]
    async fn test_detect() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("chart")).unwrap();
        std::fs::write(root.path().join("chart/Chart.yaml"), "name: c\n").unwrap();
        std::fs::create_dir(root.path().join("plain")).unwrap();

        let app = r#"
kind: Application
metadata:
  name: mixed
spec:
  sources:
    - repoURL: https://example.com/app
      path: chart
    - repoURL: https://example.com/app
      path: plain
"#;
        let detected = Renderer::new()
            .detect(&request(app, root.path()))
            .await
            .unwrap();
        let types: Vec<String> = detected
            .iter()
            .map(|d| d.kind.source_type().to_string())
            .collect();
        assert_eq!(types, vec!["Helm", "Directory"]);
        assert_eq!(detected[1].source_dir, root.path().join("plain"));
    }

    #[tokio::test]
    async fn test_remote_chart_uses_cached_directory() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let cache = ChartCache::new(cache_dir.path());
        let entry = cache.entry_path("https://charts.example.com", "web", "1.2.0");
        std::fs::create_dir_all(&entry).unwrap();
        std::fs::write(entry.join("Chart.yaml"), "name: web\n").unwrap();

        let fake = Arc::new(FakeStrategy::with(vec![Ok(DEPLOY_WEB.to_string())]));
        let renderer = Renderer::builder().helm(fake.clone()).build();

        let app = r#"
kind: Application
metadata:
  name: web
spec:
  source:
    repoURL: https://charts.example.com
    chart: web
    targetRevision: 1.2.0
"#;
        let mut req = request(app, root.path());
        req.options.chart_cache_dir = Some(cache_dir.path().to_path_buf());
        let output = renderer.render(&req).await.unwrap();

        assert_eq!(output.objects.len(), 1);
        assert_eq!(fake.calls.lock().unwrap()[0].1, entry);
    }

    #[test]
    fn test_check_repo_root() {
        let root = TempDir::new().unwrap();
        assert!(check_repo_root(root.path()).is_ok());
        assert!(check_repo_root(&root.path().join("missing")).is_err());
    }
}
