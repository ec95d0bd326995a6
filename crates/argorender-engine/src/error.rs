//! Engine error types

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use argorender_core::CoreError;

/// Result type for rendering operations
pub type Result<T> = std::result::Result<T, RenderError>;

/// Errors that abort a render
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum RenderError {
    // ============ Configuration Errors ============
    #[error("{field} {message}")]
    #[diagnostic(code(argorender::config::invalid_request))]
    InvalidRequest { field: String, message: String },

    #[error(transparent)]
    #[diagnostic(code(argorender::config::application))]
    Core(#[from] CoreError),

    #[error("invalid option {option}: {message}")]
    #[diagnostic(code(argorender::config::invalid_option))]
    InvalidOption { option: String, message: String },

    #[error("values file not found: {}", path.display())]
    #[diagnostic(
        code(argorender::config::missing_value_file),
        help("set helm.ignoreMissingValueFiles to skip missing files")
    )]
    MissingValueFile { path: PathBuf },

    #[error("file parameter '{name}' points to a missing file: {}", path.display())]
    #[diagnostic(code(argorender::config::missing_file_parameter))]
    MissingFileParameter { name: String, path: PathBuf },

    // ============ Filesystem Errors ============
    #[error("I/O error on {}: {source}", path.display())]
    #[diagnostic(code(argorender::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ============ Tool Errors ============
    #[error("{tool} executable not found: {binary}")]
    #[diagnostic(
        code(argorender::tool::not_found),
        help("install {tool} or point --{tool}-binary at it")
    )]
    ToolNotFound { tool: String, binary: String },

    #[error("{tool} failed ({status}): {stderr}")]
    #[diagnostic(code(argorender::tool::failed))]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("failed to pull chart {chart} from {repo}: {message}")]
    #[diagnostic(code(argorender::tool::chart_pull))]
    ChartPull {
        chart: String,
        repo: String,
        message: String,
    },

    // ============ Output Errors ============
    #[error("rendered manifests are too large ({size} bytes, max {max} bytes)")]
    #[diagnostic(
        code(argorender::render::too_large),
        help("raise the limit with --max-manifest-size")
    )]
    ManifestTooLarge { size: u64, max: u64 },

    #[error("source {index}: {source}")]
    #[diagnostic(code(argorender::render::source))]
    Source {
        /// 1-based position of the failing source
        index: usize,
        #[source]
        source: Box<RenderError>,
    },

    // ============ Interruption ============
    #[error("render cancelled")]
    #[diagnostic(code(argorender::cancelled))]
    Cancelled,

    #[error("render timed out after {seconds}s")]
    #[diagnostic(code(argorender::timeout))]
    Timeout { seconds: u64 },
}

impl RenderError {
    pub fn invalid_request(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_option(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Tag an error with the 1-based position of the source that raised it
    pub fn in_source(self, index: usize) -> Self {
        Self::Source {
            index,
            source: Box::new(self),
        }
    }

    /// The error with any source tagging removed
    pub fn root(&self) -> &RenderError {
        match self {
            Self::Source { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the failure comes from the request or Application rather than a tool
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.root(),
            Self::InvalidRequest { .. }
                | Self::Core(_)
                | Self::InvalidOption { .. }
                | Self::MissingValueFile { .. }
                | Self::MissingFileParameter { .. }
        )
    }
}
