//! Kubernetes version hints (`1.29`, `v1.29.3`)

use semver::Version;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A validated Kubernetes version
///
/// Accepts an optional `v` prefix and missing minor/patch components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeVersion(Version);

impl KubeVersion {
    pub fn version(&self) -> &Version {
        &self.0
    }

    /// Form passed to `helm --kube-version`
    pub fn to_helm_arg(&self) -> String {
        format!("v{}", self.0)
    }
}

impl FromStr for KubeVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let invalid = |message: String| CoreError::InvalidKubeVersion {
            input: s.to_string(),
            message,
        };

        if bare.is_empty() {
            return Err(invalid("empty version".to_string()));
        }

        // Pad `1` and `1.29` to full semver
        let core_end = bare.find(['-', '+']).unwrap_or(bare.len());
        let dots = bare[..core_end].matches('.').count();
        let padded = match dots {
            0 => format!("{}.0.0{}", &bare[..core_end], &bare[core_end..]),
            1 => format!("{}.0{}", &bare[..core_end], &bare[core_end..]),
            _ => bare.to_string(),
        };

        Version::parse(&padded)
            .map(KubeVersion)
            .map_err(|e| invalid(e.to_string()))
    }
}

impl fmt::Display for KubeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
