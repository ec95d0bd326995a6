//! Recoverable render diagnostics

use std::fmt;

use argorender_core::ResourceKey;

/// Something that went wrong without failing the render
///
/// Source positions are 0-based; `Display` shows them 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A document that could not be turned into a resource object
    UnparsedManifest {
        source: usize,
        document: usize,
        message: String,
    },

    /// A later object with an identity key already seen
    Duplicate {
        key: ResourceKey,
        first_source: usize,
        duplicate_source: usize,
    },
}

impl Warning {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Warning::Duplicate { .. })
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnparsedManifest {
                source,
                document,
                message,
            } => write!(
                f,
                "skipping unparsable manifest (source {}, document {}): {}",
                source + 1,
                document + 1,
                message
            ),
            Warning::Duplicate {
                key,
                first_source,
                duplicate_source,
            } => {
                write!(f, "duplicate resource {}", key.kind)?;
                if !key.group.is_empty() {
                    write!(f, ".{}", key.group)?;
                }
                if key.namespace.is_empty() {
                    write!(f, " {}", key.name)?;
                } else {
                    write!(f, " {}/{}", key.namespace, key.name)?;
                }
                write!(
                    f,
                    " from source {} discarded, keeping the one from source {}",
                    duplicate_source + 1,
                    first_source + 1
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_message() {
        let warning = Warning::Duplicate {
            key: ResourceKey::new("apps", "Deployment", "default", "web"),
            first_source: 0,
            duplicate_source: 1,
        };
        assert_eq!(
            warning.to_string(),
            "duplicate resource Deployment.apps default/web from source 2 discarded, keeping the one from source 1"
        );
    }

    #[test]
    fn test_cluster_scoped_duplicate_message() {
        let warning = Warning::Duplicate {
            key: ResourceKey::new("", "Namespace", "", "team-a"),
            first_source: 0,
            duplicate_source: 0,
        };
        assert!(warning.to_string().starts_with("duplicate resource Namespace team-a "));
    }

    #[test]
    fn test_unparsed_message() {
        let warning = Warning::UnparsedManifest {
            source: 0,
            document: 2,
            message: "did not find expected key".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "skipping unparsable manifest (source 1, document 3): did not find expected key"
        );
        assert!(!warning.is_duplicate());
    }
}
