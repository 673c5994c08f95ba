// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of the dependent resources of an eligible Deployment.
//!
//! A Deployment gets one shared Service/Ingress pair in front of all its
//! replicas, plus the workload-scoped secrets.

use crate::config::OperatorConfig;
use crate::labels::ANNOTATION_HOST;
use crate::reconcilers::resources::create_or_update;
use crate::reconcilers::secrets::{reconcile_oidc_secret, reconcile_workload_secrets};
use crate::sidecar_resources::{attach_owner_reference, build_proxy_ingress, build_proxy_service};
use crate::workload::{SidecarTarget, Workload};
use anyhow::{Context, Result};
use k8s_openapi::api::apps::v1::Deployment;
use kube::Client;
use tracing::debug;

/// Reconciles all dependent resources of a Deployment.
///
/// Order matters: the OIDC secret first (it drives the rollout decision),
/// then the Service, then the remaining secrets, and the Ingress last so
/// external traffic is only routed once the sidecar's material is in place.
/// A terminating Deployment is left alone; owner references garbage-collect
/// its dependents.
///
/// # Errors
///
/// Returns an error when any dependent resource cannot be built or written.
pub async fn reconcile_deployment_dependencies(
    client: &Client,
    config: &OperatorConfig,
    deployment: &Deployment,
) -> Result<()> {
    let workload = Workload::Deployment(deployment);
    if workload.is_terminating() {
        debug!(
            namespace = %workload.namespace(),
            name = %workload.name(),
            "Deployment is terminating, skipping reconciliation"
        );
        return Ok(());
    }

    let namespace = workload.namespace();
    let target = SidecarTarget::Deployment(deployment);

    reconcile_oidc_secret(client, config, &workload).await?;

    let mut service = build_proxy_service(&target);
    attach_owner_reference(&mut service.metadata, target.owner_reference());
    create_or_update(client, &namespace, &service)
        .await
        .context("failed to create or update oauth2 service")?;

    reconcile_workload_secrets(client, config, &workload).await?;

    if let Some(host) = workload.annotation(ANNOTATION_HOST) {
        let mut ingress = build_proxy_ingress(&target, host, config);
        attach_owner_reference(&mut ingress.metadata, target.owner_reference());
        create_or_update(client, &namespace, &ingress)
            .await
            .context("failed to create or update oauth2 ingress")?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "deployment_tests.rs"]
mod deployment_tests;
