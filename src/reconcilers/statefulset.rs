// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of the dependent resources of an eligible StatefulSet.
//!
//! Unlike a Deployment, each StatefulSet replica has a stable identity and
//! must independently complete its OAuth redirect flow, so every pod gets
//! its own Service/Ingress pair owned by the pod itself. The secrets stay
//! workload-scoped and are shared by all replicas.

use crate::config::OperatorConfig;
use crate::labels::{ANNOTATION_HOST, ANNOTATION_SUFFIX};
use crate::reconcilers::resources::create_or_update;
use crate::reconcilers::secrets::{reconcile_oidc_secret, reconcile_workload_secrets};
use crate::sidecar_resources::{
    attach_owner_reference, build_proxy_ingress, build_proxy_service, derive_pod_host,
};
use crate::workload::{SidecarTarget, Workload};
use anyhow::{Context, Result};
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};
use std::collections::BTreeMap;
use tracing::debug;

/// Reconciles all dependent resources of a StatefulSet.
///
/// The OIDC secret is reconciled once for the workload, then each pod
/// matching the workload's selector gets a per-replica Service and Ingress
/// with an ordinal-qualified host. The remaining secrets follow the same
/// steps as the Deployment path. A terminating StatefulSet is left alone.
///
/// # Errors
///
/// Returns an error when the pod list fails or any dependent resource
/// cannot be built or written.
pub async fn reconcile_statefulset_dependencies(
    client: &Client,
    config: &OperatorConfig,
    statefulset: &StatefulSet,
) -> Result<()> {
    let workload = Workload::StatefulSet(statefulset);
    if workload.is_terminating() {
        debug!(
            namespace = %workload.namespace(),
            name = %workload.name(),
            "StatefulSet is terminating, skipping reconciliation"
        );
        return Ok(());
    }

    let namespace = workload.namespace();
    let name = workload.name();

    reconcile_oidc_secret(client, config, &workload).await?;

    let selector = workload
        .selector_labels()
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",");
    let pods: Api<Pod> = Api::namespaced(client.clone(), &namespace);
    let pod_list = pods
        .list(&ListParams::default().labels(&selector))
        .await
        .with_context(|| format!("failed to list pods of statefulset {namespace}/{name}"))?;

    let host_prefix = workload.annotation(ANNOTATION_HOST).unwrap_or_default().to_string();
    let suffix = workload.annotation(ANNOTATION_SUFFIX).unwrap_or_default().to_string();

    for mut pod in pod_list.items {
        // The per-pod builders read the suffix off the pod's own metadata.
        pod.metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(ANNOTATION_SUFFIX.to_string(), suffix.clone());

        let target = SidecarTarget::StatefulSetReplica(&pod);

        let mut service = build_proxy_service(&target);
        attach_owner_reference(&mut service.metadata, target.owner_reference());
        create_or_update(client, &namespace, &service)
            .await
            .with_context(|| {
                format!("failed to create or update oauth2 service for pod {}", pod.name_any())
            })?;

        let host = derive_pod_host(&host_prefix, &pod);
        debug!(pod = %pod.name_any(), host = %host, "Derived per-replica ingress host");

        let mut ingress = build_proxy_ingress(&target, &host, config);
        attach_owner_reference(&mut ingress.metadata, target.owner_reference());
        create_or_update(client, &namespace, &ingress)
            .await
            .with_context(|| {
                format!("failed to create or update oauth2 ingress for pod {}", pod.name_any())
            })?;
    }

    reconcile_workload_secrets(client, config, &workload).await?;

    Ok(())
}

#[cfg(test)]
#[path = "statefulset_tests.rs"]
mod statefulset_tests;
