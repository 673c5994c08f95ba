// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Secret reconciliation steps shared by the Deployment and StatefulSet
//! reconcilers.
//!
//! The OIDC configuration secret is the rollout trigger: when its content
//! hash changes on an already-existing secret, the owning workload's
//! generation is bumped so its pod template is re-admitted and the sidecar
//! picks up the new configuration. The remaining secrets (resource
//! attributes, kubeconfig, CA bundle) are plain create-or-update steps, with
//! the two file-sourced ones skipped softly when their source material is
//! not configured.

use crate::config::OperatorConfig;
use crate::constants::OIDC_SECRET_PREFIX;
use crate::labels::ANNOTATION_CONFIG_HASH;
use crate::reconcilers::namespace::resolve_attributes_namespace;
use crate::reconcilers::resources::create_or_update;
use crate::reconcilers::rollout::trigger_generation_increase;
use crate::sidecar_resources::{
    attach_owner_reference, build_ca_bundle_secret, build_kubeconfig_secret,
    build_oidc_config_secret, build_resource_attributes_secret, dependent_name,
};
use crate::workload::Workload;
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, info};

/// Returns the config-hash annotation of a secret, if present.
fn config_hash(secret: &Secret) -> Option<String> {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(ANNOTATION_CONFIG_HASH))
        .cloned()
}

/// Reconciles the OIDC configuration secret for a workload and triggers a
/// rollout when its content changed.
///
/// A freshly created secret never triggers a rollout: the initial pod
/// template was admitted against this same configuration. Only a hash change
/// on an existing secret bumps the workload's generation.
///
/// # Errors
///
/// Returns an error when the secret cannot be built, written, or when the
/// generation bump fails after retries.
pub async fn reconcile_oidc_secret(
    client: &Client,
    config: &OperatorConfig,
    workload: &Workload<'_>,
) -> Result<()> {
    let mut desired = build_oidc_config_secret(workload, config)
        .context("failed to build oauth2 secret")?;
    attach_owner_reference(&mut desired.metadata, workload.owner_reference());

    let namespace = workload.namespace();
    let name = dependent_name(OIDC_SECRET_PREFIX, &workload.name(), workload.suffix());
    let api: Api<Secret> = Api::namespaced(client.clone(), &namespace);
    let existing = api
        .get_opt(&name)
        .await
        .with_context(|| format!("failed to fetch oauth2 secret {namespace}/{name}"))?;

    create_or_update(client, &namespace, &desired)
        .await
        .context("failed to create or update oauth2 secret")?;

    let previous_hash = existing.as_ref().and_then(config_hash);
    let new_hash = config_hash(&desired);
    match (previous_hash, new_hash) {
        (Some(previous), Some(new)) if previous != new => {
            info!(
                kind = workload.kind(),
                namespace = %namespace,
                name = %workload.name(),
                "OIDC configuration changed, triggering rollout"
            );
            trigger_generation_increase(client, workload)
                .await
                .context("failed to trigger workload rollout")?;
        }
        _ => {
            debug!(
                secret = %desired.name_any(),
                namespace = %namespace,
                "OIDC configuration unchanged"
            );
        }
    }

    Ok(())
}

/// Reconciles the workload-scoped secrets mounted by the rbac proxy: the
/// resource-attributes secret plus the optional kubeconfig and CA-bundle
/// secrets.
///
/// Missing source material for the optional secrets is skipped with a debug
/// log; a source file that exists but cannot be read is an error.
///
/// # Errors
///
/// Returns an error when a secret cannot be built or written.
pub async fn reconcile_workload_secrets(
    client: &Client,
    config: &OperatorConfig,
    workload: &Workload<'_>,
) -> Result<()> {
    let namespace = workload.namespace();
    let attributes_namespace = resolve_attributes_namespace(client, config, workload).await;

    let mut attributes = build_resource_attributes_secret(workload, &attributes_namespace)
        .context("failed to build resource attributes secret")?;
    attach_owner_reference(&mut attributes.metadata, workload.owner_reference());
    create_or_update(client, &namespace, &attributes)
        .await
        .context("failed to create or update resource attributes secret")?;

    match build_kubeconfig_secret(workload, config) {
        Ok(mut secret) => {
            attach_owner_reference(&mut secret.metadata, workload.owner_reference());
            create_or_update(client, &namespace, &secret)
                .await
                .context("failed to create or update kubeconfig secret")?;
        }
        Err(e) if e.is_missing_source() => {
            debug!(
                kind = workload.kind(),
                namespace = %namespace,
                name = %workload.name(),
                "No kubeconfig source material, skipping secret"
            );
        }
        Err(e) => return Err(e).context("failed to build kubeconfig secret"),
    }

    match build_ca_bundle_secret(workload, config) {
        Ok(mut secret) => {
            attach_owner_reference(&mut secret.metadata, workload.owner_reference());
            create_or_update(client, &namespace, &secret)
                .await
                .context("failed to create or update CA bundle secret")?;
        }
        Err(e) if e.is_missing_source() => {
            debug!(
                kind = workload.kind(),
                namespace = %namespace,
                name = %workload.name(),
                "No CA bundle source material, skipping secret"
            );
        }
        Err(e) => return Err(e).context("failed to build CA bundle secret"),
    }

    Ok(())
}
