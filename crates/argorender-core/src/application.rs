//! Argo CD Application definition and loading

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::source::ApplicationSource;

/// Path sentinel that selects standard input
pub const STDIN_SENTINEL: &str = "-";

/// Default `apiVersion` for Applications that omit it
pub const APPLICATION_API_VERSION: &str = "argoproj.io/v1alpha1";

/// An Argo CD Application, reduced to what rendering needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub metadata: ApplicationMetadata,

    #[serde(default)]
    pub spec: ApplicationSpec,
}

fn default_api_version() -> String {
    APPLICATION_API_VERSION.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Single source form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ApplicationSource>,

    /// Multi-source form (takes precedence over `source`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<ApplicationSource>,

    #[serde(default)]
    pub destination: ApplicationDestination,
}

/// Where the Application's resources are deployed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDestination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Application {
    /// Load an Application from a file, or from stdin when `path` is `-`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.as_os_str() == STDIN_SENTINEL {
            return Self::from_reader(std::io::stdin().lock());
        }

        if !path.exists() {
            return Err(CoreError::ApplicationNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Read an Application from any reader
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate an Application from YAML (or JSON)
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let app: Application = serde_yaml::from_str(yaml)?;

        if app.kind != "Application" {
            return Err(CoreError::InvalidApplication {
                message: format!("expected kind 'Application', got '{}'", app.kind),
            });
        }

        if app.sources().is_empty() {
            return Err(CoreError::InvalidApplication {
                message: "no sources found in application spec".to_string(),
            });
        }

        Ok(app)
    }

    /// Application name
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Ordered list of sources, for single- and multi-source Applications
    pub fn sources(&self) -> Vec<&ApplicationSource> {
        if !self.spec.sources.is_empty() {
            self.spec.sources.iter().collect()
        } else {
            self.spec.source.iter().collect()
        }
    }

    /// Whether the Application uses the multi-source form
    pub fn has_multiple_sources(&self) -> bool {
        !self.spec.sources.is_empty()
    }

    /// Destination namespace, or an empty string
    pub fn destination_namespace(&self) -> &str {
        self.spec.destination.namespace.as_deref().unwrap_or("")
    }

    /// Find a source by its `ref` name
    pub fn source_by_ref(&self, reference: &str) -> Option<&ApplicationSource> {
        self.sources()
            .into_iter()
            .find(|s| s.reference.as_deref() == Some(reference))
    }
}
