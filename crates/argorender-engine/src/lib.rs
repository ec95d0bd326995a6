//! Rendering engine for Argo CD Applications
//!
//! Each source of an Application is detected as Helm, Kustomize or a plain
//! directory, rendered with the matching strategy, and the resulting
//! objects are merged with first-wins deduplication.

pub mod chart;
pub mod dedupe;
pub mod detect;
pub mod error;
pub mod manifest;
pub mod options;
pub mod process;
pub mod renderer;
pub mod scope;
pub mod strategy;
pub mod warning;

pub use chart::ChartCache;
pub use dedupe::{deduplicate, DedupeResult};
pub use detect::{detect_source_kind, resolve_source_dir};
pub use error::{RenderError, Result};
pub use manifest::{parse_manifests, split_documents, RawManifest};
pub use options::{HelmOptions, KustomizeOptions, RenderOptions, DEFAULT_TRACKING_LABEL};
pub use renderer::{
    check_repo_root, DetectedSource, RenderOutput, RenderRequest, Renderer, RendererBuilder,
};
pub use scope::{CrdScopes, KnownScopes, LayeredScope, NamespaceScope};
pub use strategy::{
    DirectoryStrategy, HelmStrategy, KustomizeStrategy, RenderContext, Strategy,
};
pub use warning::Warning;
