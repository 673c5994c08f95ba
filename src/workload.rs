// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Workload topology abstractions.
//!
//! The engine reconciles two workload shapes that share most of their
//! dependent resources. [`Workload`] is the owner of the workload-scoped
//! secrets; [`SidecarTarget`] is the owner of a Service/Ingress pair, which
//! for StatefulSets is an individual replica pod rather than the workload.

use crate::labels::{ANNOTATION_SUFFIX, STS_POD_NAME_LABEL};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::collections::BTreeMap;

/// A workload eligible for sidecar injection.
#[derive(Clone, Copy, Debug)]
pub enum Workload<'a> {
    /// A Deployment: one shared Service/Ingress in front of the replica set
    Deployment(&'a Deployment),
    /// A StatefulSet: per-replica Services/Ingresses, workload-scoped secrets
    StatefulSet(&'a StatefulSet),
}

impl Workload<'_> {
    /// Object metadata of the underlying workload.
    #[must_use]
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            Workload::Deployment(d) => &d.metadata,
            Workload::StatefulSet(s) => &s.metadata,
        }
    }

    /// Kind of the underlying workload, as it appears in owner references.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Workload::Deployment(_) => "Deployment",
            Workload::StatefulSet(_) => "StatefulSet",
        }
    }

    /// Lowercase plural resource name, used in RBAC resource attributes.
    #[must_use]
    pub fn resource_plural(&self) -> &'static str {
        match self {
            Workload::Deployment(_) => "deployments",
            Workload::StatefulSet(_) => "statefulsets",
        }
    }

    /// Workload name; empty only for malformed objects.
    #[must_use]
    pub fn name(&self) -> String {
        self.meta().name.clone().unwrap_or_default()
    }

    /// Workload namespace; empty only for malformed objects.
    #[must_use]
    pub fn namespace(&self) -> String {
        self.meta().namespace.clone().unwrap_or_default()
    }

    /// Look up an annotation on the workload.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.meta()
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    /// The webhook-assigned naming suffix, if any.
    #[must_use]
    pub fn suffix(&self) -> Option<&str> {
        self.annotation(ANNOTATION_SUFFIX)
    }

    /// Current generation counter of the workload.
    #[must_use]
    pub fn generation(&self) -> i64 {
        self.meta().generation.unwrap_or(0)
    }

    /// True when the workload carries a deletion timestamp and its dependent
    /// resources must be left to owner-reference garbage collection.
    #[must_use]
    pub fn is_terminating(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }

    /// Pod selector labels of the workload.
    #[must_use]
    pub fn selector_labels(&self) -> BTreeMap<String, String> {
        let selector = match self {
            Workload::Deployment(d) => d.spec.as_ref().map(|s| &s.selector),
            Workload::StatefulSet(s) => s.spec.as_ref().map(|s| &s.selector),
        };
        selector
            .and_then(|s| s.match_labels.clone())
            .unwrap_or_default()
    }

    /// Owner reference pointing at the workload, for dependent resources.
    #[must_use]
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: "apps/v1".to_string(),
            kind: self.kind().to_string(),
            name: self.name(),
            uid: self.meta().uid.clone().unwrap_or_default(),
            controller: None,
            block_owner_deletion: None,
        }
    }
}

/// The logical owner of one Service/Ingress pair.
#[derive(Clone, Copy, Debug)]
pub enum SidecarTarget<'a> {
    /// A Deployment shares one Service/Ingress across its replicas
    Deployment(&'a Deployment),
    /// A StatefulSet replica gets its own Service/Ingress
    StatefulSetReplica(&'a Pod),
}

impl SidecarTarget<'_> {
    /// Object metadata of the owning object.
    #[must_use]
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            SidecarTarget::Deployment(d) => &d.metadata,
            SidecarTarget::StatefulSetReplica(p) => &p.metadata,
        }
    }

    /// Name of the owning object (workload or pod).
    #[must_use]
    pub fn name(&self) -> String {
        self.meta().name.clone().unwrap_or_default()
    }

    /// Namespace of the owning object.
    #[must_use]
    pub fn namespace(&self) -> String {
        self.meta().namespace.clone().unwrap_or_default()
    }

    /// The naming suffix annotation, propagated from the workload for pods.
    #[must_use]
    pub fn suffix(&self) -> Option<&str> {
        self.meta()
            .annotations
            .as_ref()
            .and_then(|a| a.get(ANNOTATION_SUFFIX))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Label selector routing the Service at this target's pods.
    ///
    /// A Deployment's Service selects via the workload selector; a replica's
    /// Service pins the single pod through its stable pod-name label.
    #[must_use]
    pub fn service_selector(&self) -> BTreeMap<String, String> {
        match self {
            SidecarTarget::Deployment(d) => d
                .spec
                .as_ref()
                .and_then(|s| s.selector.match_labels.clone())
                .unwrap_or_default(),
            SidecarTarget::StatefulSetReplica(p) => {
                let mut selector = BTreeMap::new();
                selector.insert(STS_POD_NAME_LABEL.to_string(), p.metadata.name.clone().unwrap_or_default());
                selector
            }
        }
    }

    /// Owner reference pointing at this target.
    #[must_use]
    pub fn owner_reference(&self) -> OwnerReference {
        let (api_version, kind) = match self {
            SidecarTarget::Deployment(_) => ("apps/v1", "Deployment"),
            SidecarTarget::StatefulSetReplica(_) => ("v1", "Pod"),
        };
        OwnerReference {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: self.name(),
            uid: self.meta().uid.clone().unwrap_or_default(),
            controller: None,
            block_owner_deletion: None,
        }
    }
}

#[cfg(test)]
#[path = "workload_tests.rs"]
mod workload_tests;
