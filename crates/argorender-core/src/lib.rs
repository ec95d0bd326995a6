//! argorender Core - Shared types for rendering Argo CD Applications locally
//!
//! This crate provides the foundational types used throughout argorender:
//! - `Application`: The Argo CD Application definition and its sources
//! - `ApplicationSource`: One source with its Helm, Kustomize or Directory options
//! - `ResourceObject`: A rendered Kubernetes manifest and its identity key
//! - `Config`: User configuration file

pub mod application;
pub mod config;
pub mod error;
pub mod kube_version;
pub mod resource;
pub mod size;
pub mod source;

pub use application::{Application, ApplicationDestination, ApplicationMetadata, ApplicationSpec};
pub use config::Config;
pub use error::{CoreError, Result};
pub use kube_version::KubeVersion;
pub use resource::{ResourceKey, ResourceObject};
pub use size::{ByteSize, DEFAULT_MAX_MANIFEST_SIZE};
pub use source::{
    ApplicationSource, DirectorySource, HelmFileParameter, HelmParameter, HelmSource,
    KustomizePatch, KustomizeReplica, KustomizeSelector, KustomizeSource, ReplicaCount,
    SourceKind, SourceType,
};
