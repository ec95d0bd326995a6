//! CLI error types with exit code handling
//!
//! Every failure surfaces as a `CliError`, which knows the exit code it
//! should produce.

use argorender_core::CoreError;
use argorender_engine::RenderError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Bad config file, Application or option value
    #[error("{message}")]
    #[diagnostic(code(argorender::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid combination of arguments
    #[error("{message}")]
    #[diagnostic(code(argorender::cli::usage))]
    Usage { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),

    #[error("IO error: {message}")]
    #[diagnostic(code(argorender::cli::io))]
    Io { message: String },

    #[error("failed to write output: {message}")]
    #[diagnostic(code(argorender::cli::output))]
    Output { message: String },
}

impl CliError {
    /// Exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Output { .. } => exit_codes::ERROR,
            CliError::Render(err) => match err.root() {
                RenderError::Cancelled => exit_codes::CANCELLED,
                RenderError::Io { .. } => exit_codes::IO_ERROR,
                _ if err.is_configuration() => exit_codes::CONFIG_ERROR,
                _ => exit_codes::RENDER_ERROR,
            },
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub fn output(err: impl std::fmt::Display) -> Self {
        Self::Output {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => CliError::Io {
                message: e.to_string(),
            },
            CoreError::ApplicationNotFound { path } => CliError::Io {
                message: format!("Application file not found: {}", path),
            },
            other => CliError::config(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
