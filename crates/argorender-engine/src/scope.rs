//! Whether a kind lives in a namespace
//!
//! Built-in kinds come from the `k8s-openapi` type table; custom kinds are
//! learned from the CustomResourceDefinitions found in the same render.

use std::collections::HashMap;

use k8s_openapi::api::core::v1 as core_v1;
use k8s_openapi::api::{
    admissionregistration, apps, autoscaling, batch, certificates, coordination, discovery,
    networking, node, policy, rbac, scheduling, storage,
};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope, Resource};
use once_cell::sync::Lazy;
use serde_yaml::Value;

use argorender_core::ResourceObject;

/// Answers whether objects of a kind are namespaced
pub trait NamespaceScope: Send + Sync {
    /// `None` when the kind is unknown
    fn is_namespaced(&self, group: &str, kind: &str) -> Option<bool>;
}

trait ScopeFlag {
    const NAMESPACED: bool;
}

impl ScopeFlag for ClusterResourceScope {
    const NAMESPACED: bool = false;
}

impl ScopeFlag for NamespaceResourceScope {
    const NAMESPACED: bool = true;
}

fn entry<K>() -> ((&'static str, &'static str), bool)
where
    K: Resource,
    K::Scope: ScopeFlag,
{
    ((K::GROUP, K::KIND), <K::Scope as ScopeFlag>::NAMESPACED)
}

static BUILTIN_SCOPES: Lazy<HashMap<(&'static str, &'static str), bool>> = Lazy::new(|| {
    HashMap::from([
        // core
        entry::<core_v1::Namespace>(),
        entry::<core_v1::Node>(),
        entry::<core_v1::PersistentVolume>(),
        entry::<core_v1::ConfigMap>(),
        entry::<core_v1::Secret>(),
        entry::<core_v1::Service>(),
        entry::<core_v1::ServiceAccount>(),
        entry::<core_v1::Pod>(),
        entry::<core_v1::PodTemplate>(),
        entry::<core_v1::PersistentVolumeClaim>(),
        entry::<core_v1::Endpoints>(),
        entry::<core_v1::LimitRange>(),
        entry::<core_v1::ResourceQuota>(),
        entry::<core_v1::ReplicationController>(),
        // workloads
        entry::<apps::v1::Deployment>(),
        entry::<apps::v1::StatefulSet>(),
        entry::<apps::v1::DaemonSet>(),
        entry::<apps::v1::ReplicaSet>(),
        entry::<apps::v1::ControllerRevision>(),
        entry::<batch::v1::Job>(),
        entry::<batch::v1::CronJob>(),
        entry::<autoscaling::v2::HorizontalPodAutoscaler>(),
        entry::<policy::v1::PodDisruptionBudget>(),
        // rbac
        entry::<rbac::v1::ClusterRole>(),
        entry::<rbac::v1::ClusterRoleBinding>(),
        entry::<rbac::v1::Role>(),
        entry::<rbac::v1::RoleBinding>(),
        // networking
        entry::<networking::v1::Ingress>(),
        entry::<networking::v1::IngressClass>(),
        entry::<networking::v1::NetworkPolicy>(),
        entry::<discovery::v1::EndpointSlice>(),
        // storage
        entry::<storage::v1::StorageClass>(),
        entry::<storage::v1::CSIDriver>(),
        entry::<storage::v1::CSINode>(),
        entry::<storage::v1::VolumeAttachment>(),
        // cluster administration
        entry::<admissionregistration::v1::MutatingWebhookConfiguration>(),
        entry::<admissionregistration::v1::ValidatingWebhookConfiguration>(),
        entry::<scheduling::v1::PriorityClass>(),
        entry::<node::v1::RuntimeClass>(),
        entry::<certificates::v1::CertificateSigningRequest>(),
        entry::<coordination::v1::Lease>(),
        entry::<CustomResourceDefinition>(),
        entry::<APIService>(),
    ])
});

/// Scopes of the built-in Kubernetes kinds
#[derive(Debug, Clone, Copy, Default)]
pub struct KnownScopes;

impl NamespaceScope for KnownScopes {
    fn is_namespaced(&self, group: &str, kind: &str) -> Option<bool> {
        let table: &HashMap<(&str, &str), bool> = &BUILTIN_SCOPES;
        table.get(&(group, kind)).copied()
    }
}

/// Scopes declared by CustomResourceDefinitions
#[derive(Debug, Clone, Default)]
pub struct CrdScopes {
    scopes: HashMap<(String, String), bool>,
}

impl CrdScopes {
    /// Collect the scope of every CRD among `objects`
    pub fn from_objects<'a>(objects: impl IntoIterator<Item = &'a ResourceObject>) -> Self {
        let mut scopes = HashMap::new();
        for obj in objects.into_iter().filter(|o| o.is_crd()) {
            let Some(spec) = obj.manifest().get("spec") else {
                continue;
            };
            let group = spec.get("group").and_then(Value::as_str);
            let kind = spec
                .get("names")
                .and_then(|n| n.get("kind"))
                .and_then(Value::as_str);
            let (Some(group), Some(kind)) = (group, kind) else {
                continue;
            };
            let namespaced = spec.get("scope").and_then(Value::as_str) != Some("Cluster");
            scopes.insert((group.to_string(), kind.to_string()), namespaced);
        }
        Self { scopes }
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl NamespaceScope for CrdScopes {
    fn is_namespaced(&self, group: &str, kind: &str) -> Option<bool> {
        self.scopes
            .get(&(group.to_string(), kind.to_string()))
            .copied()
    }
}

/// Asks each layer in turn; the first answer wins
pub struct LayeredScope<'a> {
    layers: Vec<&'a dyn NamespaceScope>,
}

impl<'a> LayeredScope<'a> {
    pub fn new(layers: Vec<&'a dyn NamespaceScope>) -> Self {
        Self { layers }
    }
}

impl NamespaceScope for LayeredScope<'_> {
    fn is_namespaced(&self, group: &str, kind: &str) -> Option<bool> {
        self.layers
            .iter()
            .find_map(|layer| layer.is_namespaced(group, kind))
    }
}
