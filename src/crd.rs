// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tenant-cluster registration resource.
//!
//! In a multi-tenant management cluster, each tenant cluster is registered
//! through a cluster-scoped `ClusterRegistration` object whose name matches
//! the local namespace hosting the tenant's control-plane workloads. The
//! registration embeds the tenant's own specification as a raw document;
//! this operator only ever reads it to learn the tenant's logical namespace.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Spec of the cluster-scoped tenant registration object.
///
/// Read-only from this operator's perspective; the management plane writes it.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "tenancy.oidc-gate.io",
    version = "v1alpha1",
    kind = "ClusterRegistration",
    plural = "clusterregistrations"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRegistrationSpec {
    /// Raw embedded tenant specification, as registered by the management
    /// plane. Only `metadata.namespace` is of interest here.
    #[serde(default)]
    pub tenant: serde_json::Value,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
