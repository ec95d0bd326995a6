//! Merging objects from several sources into one duplicate-free set

use std::collections::HashMap;

use argorender_core::{ResourceKey, ResourceObject};

use crate::scope::NamespaceScope;
use crate::warning::Warning;

/// Unique objects in input order, plus one warning per dropped duplicate
#[derive(Debug, Clone, Default)]
pub struct DedupeResult {
    pub objects: Vec<ResourceObject>,
    pub warnings: Vec<Warning>,
}

/// Normalize namespaces and drop later objects whose identity was already seen
///
/// Cluster-scoped objects lose any namespace; namespaced (or unknown) objects
/// without one get `destination_namespace`. Objects with only a
/// `generateName` are never considered duplicates.
pub fn deduplicate(
    objects: Vec<ResourceObject>,
    destination_namespace: &str,
    scope: &dyn NamespaceScope,
) -> DedupeResult {
    let mut seen: HashMap<ResourceKey, usize> = HashMap::with_capacity(objects.len());
    let mut result = DedupeResult::default();

    for (index, mut obj) in objects.into_iter().enumerate() {
        normalize_namespace(&mut obj, destination_namespace, scope);

        let mut key = obj.key();
        if key.name.is_empty() {
            if let Some(generate_name) = obj.generate_name() {
                key.name = format!("{}#{}", generate_name, index);
            }
        }

        match seen.get(&key) {
            Some(&first_source) => {
                tracing::debug!(%key, "dropping duplicate resource");
                result.warnings.push(Warning::Duplicate {
                    key,
                    first_source,
                    duplicate_source: obj.source(),
                });
            }
            None => {
                seen.insert(key, obj.source());
                result.objects.push(obj);
            }
        }
    }

    result
}

fn normalize_namespace(obj: &mut ResourceObject, destination: &str, scope: &dyn NamespaceScope) {
    match scope.is_namespaced(obj.group(), obj.kind()) {
        Some(false) => {
            if obj.namespace().is_some() {
                obj.set_namespace(None);
            }
        }
        _ => {
            if obj.namespace().is_none() && !destination.is_empty() {
                obj.set_namespace(Some(destination));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{CrdScopes, KnownScopes, LayeredScope, NamespaceScope};

    fn obj(yaml: &str, source: usize) -> ResourceObject {
        ResourceObject::from_yaml(yaml, source).unwrap()
    }

    fn deployment(name: &str, namespace: Option<&str>, source: usize) -> ResourceObject {
        let ns = namespace
            .map(|n| format!("\n  namespace: {}", n))
            .unwrap_or_default();
        obj(
            &format!(
                "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: {}{}\n",
                name, ns
            ),
            source,
        )
    }

    #[test]
    fn test_duplicate_across_sources_first_wins() {
        let first = deployment("web", Some("default"), 0);
        let mut second = deployment("web", Some("default"), 1);
        second.set_label("variant", "later");

        let result = deduplicate(vec![first, second], "default", &KnownScopes);
        assert_eq!(result.objects.len(), 1);
        assert_eq!(result.objects[0].source(), 0);
        assert_eq!(result.objects[0].label("variant"), None);

        assert_eq!(result.warnings.len(), 1);
        assert_eq!(
            result.warnings[0],
            Warning::Duplicate {
                key: ResourceKey::new("apps", "Deployment", "default", "web"),
                first_source: 0,
                duplicate_source: 1,
            }
        );
    }

    #[test]
    fn test_destination_namespace_defaulting_creates_duplicates() {
        let explicit = deployment("web", Some("prod"), 0);
        let implicit = deployment("web", None, 1);

        let result = deduplicate(vec![explicit, implicit], "prod", &KnownScopes);
        assert_eq!(result.objects.len(), 1);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_different_namespaces_are_distinct() {
        let a = deployment("web", Some("a"), 0);
        let b = deployment("web", Some("b"), 0);
        let result = deduplicate(vec![a, b], "", &KnownScopes);
        assert_eq!(result.objects.len(), 2);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_empty_destination_leaves_namespace_unset() {
        let result = deduplicate(vec![deployment("web", None, 0)], "", &KnownScopes);
        assert_eq!(result.objects[0].namespace(), None);
    }

    #[test]
    fn test_cluster_scoped_namespace_cleared() {
        let role = obj(
            "apiVersion: rbac.authorization.k8s.io/v1\nkind: ClusterRole\nmetadata:\n  name: reader\n  namespace: stray\n",
            0,
        );
        let result = deduplicate(vec![role], "default", &KnownScopes);
        assert_eq!(result.objects[0].namespace(), None);
        assert_eq!(result.objects[0].key().namespace, "");
    }

    #[test]
    fn test_unknown_kind_treated_as_namespaced() {
        let widget = obj(
            "apiVersion: example.com/v1\nkind: Widget\nmetadata:\n  name: w\n",
            0,
        );
        let result = deduplicate(vec![widget], "apps", &KnownScopes);
        assert_eq!(result.objects[0].namespace(), Some("apps"));
    }

    #[test]
    fn test_crd_declared_cluster_scope() {
        let crd = obj(
            r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: gizmos.example.com
spec:
  group: example.com
  scope: Cluster
  names:
    kind: Gizmo
"#,
            0,
        );
        let gizmo = obj(
            "apiVersion: example.com/v1\nkind: Gizmo\nmetadata:\n  name: g\n",
            0,
        );

        let objects = vec![crd, gizmo];
        let crds = CrdScopes::from_objects(&objects);
        let scope = LayeredScope::new(vec![&crds as &dyn NamespaceScope, &KnownScopes]);
        let result = deduplicate(objects.clone(), "default", &scope);

        assert_eq!(result.objects[0].namespace(), None);
        assert_eq!(result.objects[1].namespace(), None);
    }

    #[test]
    fn test_generate_name_never_duplicate() {
        let job = "apiVersion: batch/v1\nkind: Job\nmetadata:\n  generateName: migrate-\n";
        let result = deduplicate(vec![obj(job, 0), obj(job, 1)], "default", &KnownScopes);
        assert_eq!(result.objects.len(), 2);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_order_preserved_and_counts_match() {
        let input = vec![
            deployment("a", None, 0),
            deployment("b", None, 0),
            deployment("a", None, 1),
            deployment("c", None, 1),
            deployment("b", None, 2),
        ];
        let len = input.len();
        let result = deduplicate(input, "default", &KnownScopes);

        let names: Vec<&str> = result.objects.iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(result.objects.len(), len - result.warnings.len());

        let dup_sources: Vec<usize> = result
            .warnings
            .iter()
            .map(|w| match w {
                Warning::Duplicate {
                    duplicate_source, ..
                } => *duplicate_source,
                other => panic!("unexpected warning: {other}"),
            })
            .collect();
        assert_eq!(dup_sources, vec![1, 2]);
    }

    #[test]
    fn test_idempotent() {
        let input = vec![
            deployment("a", None, 0),
            deployment("a", None, 1),
            obj(
                "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: team\n  namespace: x\n",
                0,
            ),
        ];
        let once = deduplicate(input, "default", &KnownScopes);
        let twice = deduplicate(once.objects.clone(), "default", &KnownScopes);

        assert_eq!(twice.objects, once.objects);
        assert!(twice.warnings.is_empty());
    }
}
