//! Deterministic apply ordering.

use crate::object::Object;
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Kinds in the order they are applied. Kinds not listed go last.
const KIND_ORDER: &[&str] = &[
    "CustomResourceDefinition",
    "Namespace",
    "ClusterClass",
    "RuntimeClass",
    "PriorityClass",
    "StorageClass",
    "VolumeSnapshotClass",
    "IngressClass",
    "GatewayClass",
    "ResourceQuota",
    "ServiceAccount",
    "Role",
    "ClusterRole",
    "RoleBinding",
    "ClusterRoleBinding",
    "ConfigMap",
    "Secret",
    "Service",
    "LimitRange",
    "Deployment",
    "StatefulSet",
    "CronJob",
    "PodDisruptionBudget",
    "MutatingWebhookConfiguration",
    "ValidatingWebhookConfiguration",
];

static KIND_RANK: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    KIND_ORDER
        .iter()
        .enumerate()
        .map(|(rank, kind)| (*kind, rank))
        .collect()
});

fn kind_rank(kind: &str) -> usize {
    KIND_RANK.get(kind).copied().unwrap_or(KIND_ORDER.len())
}

/// Orders two objects by kind rank, then kind, apiVersion, namespace and name.
pub fn compare_objects(a: &Object, b: &Object) -> Ordering {
    kind_rank(a.kind())
        .cmp(&kind_rank(b.kind()))
        .then_with(|| a.kind().cmp(b.kind()))
        .then_with(|| a.api_version().cmp(b.api_version()))
        .then_with(|| a.namespace().cmp(b.namespace()))
        .then_with(|| a.name().cmp(b.name()))
}

/// Sorts objects into apply order. Independent of the input order.
pub fn sort_objects(objects: &mut [Object]) {
    objects.sort_by(compare_objects);
}

/// True for objects that other objects depend on existing: custom resource
/// definitions and namespaces.
pub fn is_cluster_definition(object: &Object) -> bool {
    match object.kind() {
        "CustomResourceDefinition" => object.group() == "apiextensions.k8s.io",
        "Namespace" => object.group().is_empty(),
        _ => false,
    }
}
