// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resolution of the RBAC resource-attributes namespace.
//!
//! Which namespace goes into the rbac proxy's resource attributes depends on
//! the deployment topology:
//!
//! 1. Single-tenant: the workload's own namespace.
//! 2. Multi-tenant, workload in the shared management namespace: the empty
//!    string, requesting cluster-scoped attributes.
//! 3. Multi-tenant, workload in a tenant namespace: the tenant's logical
//!    namespace, cross-referenced through its cluster registration.
//!
//! Failures in case 3 degrade softly to the empty string: cluster-scoped
//! attributes are still valid input downstream, so a missing or unparsable
//! registration is logged, never fatal.

use crate::config::OperatorConfig;
use crate::crd::ClusterRegistration;
use crate::workload::Workload;
use kube::{Api, Client, ResourceExt};
use serde::Deserialize;
use tracing::{info, warn};

/// Which branch of the resolution decision table applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributesSource {
    /// Use the workload's own namespace (single-tenant topology)
    WorkloadNamespace,
    /// Use the empty string (shared management namespace, cluster-scoped)
    ClusterScoped,
    /// Cross-reference the tenant's cluster registration
    TenantLookup,
}

/// Classifies a workload namespace against the injected tenancy settings.
#[must_use]
pub fn classify(config: &OperatorConfig, workload_namespace: &str) -> AttributesSource {
    match &config.tenancy {
        None => AttributesSource::WorkloadNamespace,
        Some(tenancy) if workload_namespace == tenancy.shared_namespace => {
            AttributesSource::ClusterScoped
        }
        Some(_) => AttributesSource::TenantLookup,
    }
}

#[derive(Deserialize)]
struct TenantObject {
    #[serde(default)]
    metadata: TenantMetadata,
}

#[derive(Deserialize, Default)]
struct TenantMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    namespace: Option<String>,
}

/// Extracts the tenant's logical namespace from the registration whose name
/// matches the workload's namespace. Returns `None` when no registration
/// matches or the embedded tenant specification fails to parse.
#[must_use]
pub fn tenant_namespace(
    registrations: &[ClusterRegistration],
    cluster_name: &str,
) -> Option<String> {
    for registration in registrations {
        if registration.name_any() != cluster_name {
            continue;
        }
        match serde_json::from_value::<TenantObject>(registration.spec.tenant.clone()) {
            Ok(tenant) => {
                let namespace = tenant.metadata.namespace?;
                info!(
                    cluster = %cluster_name,
                    tenant = ?tenant.metadata.name,
                    namespace = %namespace,
                    "Resolved tenant namespace for resource attributes"
                );
                return Some(namespace);
            }
            Err(e) => {
                warn!(
                    cluster = %cluster_name,
                    error = %e,
                    "Failed to parse embedded tenant specification"
                );
                return None;
            }
        }
    }
    None
}

/// Resolves the namespace embedded in the RBAC resource-attributes payload.
///
/// Never fails: the tenant-lookup branch degrades to the empty string on
/// list errors, missing registrations, or unparsable tenant specifications.
pub async fn resolve_attributes_namespace(
    client: &Client,
    config: &OperatorConfig,
    workload: &Workload<'_>,
) -> String {
    let workload_namespace = workload.namespace();
    match classify(config, &workload_namespace) {
        AttributesSource::WorkloadNamespace => workload_namespace,
        AttributesSource::ClusterScoped => String::new(),
        AttributesSource::TenantLookup => {
            let api: Api<ClusterRegistration> = Api::all(client.clone());
            let registrations = match api.list(&kube::api::ListParams::default()).await {
                Ok(list) => list.items,
                Err(e) => {
                    warn!(error = %e, "Failed to list cluster registrations");
                    Vec::new()
                }
            };
            tenant_namespace(&registrations, &workload_namespace).unwrap_or_default()
        }
    }
}

#[cfg(test)]
#[path = "namespace_tests.rs"]
mod namespace_tests;
