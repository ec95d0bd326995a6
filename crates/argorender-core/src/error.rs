//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Application file not found: {path}")]
    ApplicationNotFound { path: String },

    #[error("Invalid Application: {message}")]
    InvalidApplication { message: String },

    #[error("Invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid Kubernetes version '{input}': {message}")]
    InvalidKubeVersion { input: String, message: String },

    #[error("Invalid size '{input}': {message}")]
    InvalidSize { input: String, message: String },

    #[error("Invalid configuration in {path}: {message}")]
    InvalidConfig { path: String, message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
