// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dependent-resource builders for the auth sidecar pair.
//!
//! This module provides functions to build the Kubernetes resources kept in
//! sync in front of an eligible workload: the OIDC configuration secret for
//! the oauth2 proxy, the resource-attributes secret for the rbac proxy, the
//! optional kubeconfig and CA-bundle secrets, and the Service/Ingress pair
//! routing external traffic at the sidecar. All functions are pure and
//! easily testable: the same input produces a byte-identical object.

use crate::config::OperatorConfig;
use crate::constants::{
    CA_BUNDLE_KEY, CA_BUNDLE_SECRET_PREFIX, INGRESS_PREFIX, KUBECONFIG_KEY,
    KUBECONFIG_SECRET_PREFIX, OAUTH2_PROXY_PORT, OAUTH2_PROXY_PORT_NAME, OAUTH2_SERVICE_PORT,
    OIDC_CONFIG_KEY, OIDC_SECRET_PREFIX, RBAC_CONFIG_KEY, RBAC_SECRET_PREFIX, SERVICE_PREFIX,
    UPSTREAM_PORT,
};
use crate::errors::BuildError;
use crate::labels::{
    ANNOTATION_CONFIG_HASH, ANNOTATION_HOST, COMPONENT_AUTH_SIDECAR, GATE_LABEL_KEY,
    GATE_LABEL_VALUE, K8S_COMPONENT, K8S_INSTANCE, K8S_MANAGED_BY, K8S_NAME, K8S_PART_OF,
    MANAGED_BY_OIDC_GATE, PART_OF_OIDC_GATE, STS_POD_NAME_LABEL,
};
use crate::reconcilers::rollout::content_hash;
use crate::workload::{SidecarTarget, Workload};
use k8s_openapi::api::core::v1::{Pod, Secret, Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::ByteString;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Builds standardized labels for a dependent resource.
///
/// Every object built here carries [`GATE_LABEL_KEY`], which the ownership
/// resolver lists by, plus the standard `app.kubernetes.io` label set.
#[must_use]
pub fn build_labels(instance_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(GATE_LABEL_KEY.into(), GATE_LABEL_VALUE.into());
    labels.insert(K8S_NAME.into(), COMPONENT_AUTH_SIDECAR.into());
    labels.insert(K8S_INSTANCE.into(), instance_name.into());
    labels.insert(K8S_COMPONENT.into(), COMPONENT_AUTH_SIDECAR.into());
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_OIDC_GATE.into());
    labels.insert(K8S_PART_OF.into(), PART_OF_OIDC_GATE.into());
    labels
}

/// Derives the name of a dependent resource from its owning unit.
///
/// The webhook-assigned suffix is appended verbatim when present, so the
/// names stay aligned with the sidecar container flags injected on admission.
#[must_use]
pub fn dependent_name(prefix: &str, unit: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(s) if !s.is_empty() => format!("{prefix}-{unit}-{s}"),
        _ => format!("{prefix}-{unit}"),
    }
}

/// Attaches an owner reference to a dependent resource's metadata.
///
/// Idempotent: an already-present reference (same uid, kind and name) is
/// not duplicated, so repeated reconciliations leave the metadata stable.
pub fn attach_owner_reference(meta: &mut ObjectMeta, owner: OwnerReference) {
    let refs = meta.owner_references.get_or_insert_with(Vec::new);
    if !refs
        .iter()
        .any(|r| r.uid == owner.uid && r.kind == owner.kind && r.name == owner.name)
    {
        refs.push(owner);
    }
}

fn secret_meta(workload: &Workload<'_>, prefix: &str) -> ObjectMeta {
    let name = dependent_name(prefix, &workload.name(), workload.suffix());
    ObjectMeta {
        name: Some(name),
        namespace: Some(workload.namespace()),
        labels: Some(build_labels(&workload.name())),
        ..Default::default()
    }
}

fn secret_with_payload(meta: ObjectMeta, key: &str, payload: String) -> Secret {
    let mut data = BTreeMap::new();
    data.insert(key.to_string(), ByteString(payload.into_bytes()));
    Secret {
        metadata: meta,
        data: Some(data),
        ..Default::default()
    }
}

/// Renders the oauth2 proxy configuration payload for a workload.
///
/// Deterministic: the content hash of this payload drives restart decisions,
/// so nothing time- or randomness-dependent may appear here.
#[must_use]
pub fn render_oauth2_config(workload: &Workload<'_>, config: &OperatorConfig) -> String {
    let host = workload.annotation(ANNOTATION_HOST).unwrap_or_default();
    format!(
        "provider = \"oidc\"\n\
         oidc_issuer_url = \"{issuer}\"\n\
         client_id = \"{client_id}\"\n\
         redirect_url = \"https://{host}/oauth2/callback\"\n\
         upstreams = [ \"http://127.0.0.1:{upstream}\" ]\n\
         email_domains = [ \"*\" ]\n",
        issuer = config.oidc.issuer_url,
        client_id = config.oidc.client_id,
        host = host,
        upstream = UPSTREAM_PORT,
    )
}

/// Builds the OIDC configuration secret mounted by the oauth2 proxy sidecar.
///
/// The secret carries a content-hash annotation; the reconciler compares it
/// across reconciliations to decide whether the workload must be restarted.
///
/// # Errors
///
/// Returns [`BuildError::IncompleteWorkload`] when the workload has no name
/// or namespace.
pub fn build_oidc_config_secret(
    workload: &Workload<'_>,
    config: &OperatorConfig,
) -> Result<Secret, BuildError> {
    ensure_identified(workload)?;

    let payload = render_oauth2_config(workload, config);
    let mut meta = secret_meta(workload, OIDC_SECRET_PREFIX);
    meta.annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(ANNOTATION_CONFIG_HASH.to_string(), content_hash(&payload));

    Ok(secret_with_payload(meta, OIDC_CONFIG_KEY, payload))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RbacProxyConfig {
    authorization: RbacAuthorization,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RbacAuthorization {
    resource_attributes: ResourceAttributes,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceAttributes {
    api_group: String,
    api_version: String,
    resource: String,
    namespace: String,
    name: String,
}

/// Builds the RBAC resource-attributes secret mounted by the rbac proxy.
///
/// `namespace` is the *resolved attributes namespace*, not necessarily the
/// workload's own: in multi-tenant topologies it is the tenant's logical
/// namespace, and an empty string requests cluster-scoped attributes.
///
/// # Errors
///
/// Returns [`BuildError::Serialization`] if the YAML payload fails to render.
pub fn build_resource_attributes_secret(
    workload: &Workload<'_>,
    namespace: &str,
) -> Result<Secret, BuildError> {
    ensure_identified(workload)?;

    let attributes = RbacProxyConfig {
        authorization: RbacAuthorization {
            resource_attributes: ResourceAttributes {
                api_group: "apps".to_string(),
                api_version: "v1".to_string(),
                resource: workload.resource_plural().to_string(),
                namespace: namespace.to_string(),
                name: workload.name(),
            },
        },
    };
    let payload = serde_yaml::to_string(&attributes).map_err(|source| BuildError::Serialization {
        what: "resource attributes".to_string(),
        source,
    })?;

    Ok(secret_with_payload(
        secret_meta(workload, RBAC_SECRET_PREFIX),
        RBAC_CONFIG_KEY,
        payload,
    ))
}

/// Builds the optional kubeconfig secret mounted by the rbac proxy.
///
/// # Errors
///
/// Returns [`BuildError::SourceSecretMissing`] when no source path is
/// configured or the file does not exist (callers skip the secret), and
/// [`BuildError::SourceReadFailed`] when a present file cannot be read.
pub fn build_kubeconfig_secret(
    workload: &Workload<'_>,
    config: &OperatorConfig,
) -> Result<Secret, BuildError> {
    ensure_identified(workload)?;

    let payload = read_source_material(
        config.kubeconfig_source.as_ref(),
        KUBECONFIG_SECRET_PREFIX,
    )?;
    Ok(secret_with_payload(
        secret_meta(workload, KUBECONFIG_SECRET_PREFIX),
        KUBECONFIG_KEY,
        payload,
    ))
}

/// Builds the optional OIDC CA-bundle secret mounted by the rbac proxy.
///
/// # Errors
///
/// Same soft/fatal split as [`build_kubeconfig_secret`].
pub fn build_ca_bundle_secret(
    workload: &Workload<'_>,
    config: &OperatorConfig,
) -> Result<Secret, BuildError> {
    ensure_identified(workload)?;

    let payload = read_source_material(config.ca_bundle_source.as_ref(), CA_BUNDLE_SECRET_PREFIX)?;
    Ok(secret_with_payload(
        secret_meta(workload, CA_BUNDLE_SECRET_PREFIX),
        CA_BUNDLE_KEY,
        payload,
    ))
}

/// Reads the source material of an optional secret.
///
/// An unset path or a missing file is the soft "does not exist" condition;
/// a file that exists but cannot be read is fatal (see DESIGN.md).
fn read_source_material(path: Option<&PathBuf>, name: &str) -> Result<String, BuildError> {
    let Some(path) = path else {
        return Err(BuildError::SourceSecretMissing { name: name.to_string() });
    };
    if !path.exists() {
        return Err(BuildError::SourceSecretMissing { name: name.to_string() });
    }
    std::fs::read_to_string(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => BuildError::SourceSecretMissing { name: name.to_string() },
        _ => BuildError::SourceReadFailed {
            path: path.display().to_string(),
            source,
        },
    })
}

fn ensure_identified(workload: &Workload<'_>) -> Result<(), BuildError> {
    let missing = if workload.name().is_empty() {
        Some("metadata.name")
    } else if workload.namespace().is_empty() {
        Some("metadata.namespace")
    } else {
        None
    };
    match missing {
        Some(field) => Err(BuildError::IncompleteWorkload {
            namespace: workload.namespace(),
            name: workload.name(),
            field: field.to_string(),
        }),
        None => Ok(()),
    }
}

/// Builds the ClusterIP service in front of the oauth2 proxy sidecar.
///
/// Deployment targets are selected through the workload's pod selector; a
/// StatefulSet replica is pinned through its stable pod-name label.
#[must_use]
pub fn build_proxy_service(target: &SidecarTarget<'_>) -> Service {
    let name = dependent_name(SERVICE_PREFIX, &target.name(), target.suffix());
    Service {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(target.namespace()),
            labels: Some(build_labels(&target.name())),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(target.service_selector()),
            ports: Some(vec![ServicePort {
                name: Some(OAUTH2_PROXY_PORT_NAME.to_string()),
                port: OAUTH2_SERVICE_PORT,
                target_port: Some(IntOrString::Int(OAUTH2_PROXY_PORT)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Builds the ingress routing the external host at the target's service.
#[must_use]
pub fn build_proxy_ingress(
    target: &SidecarTarget<'_>,
    host: &str,
    config: &OperatorConfig,
) -> Ingress {
    let name = dependent_name(INGRESS_PREFIX, &target.name(), target.suffix());
    let service_name = dependent_name(SERVICE_PREFIX, &target.name(), target.suffix());

    let tls = config.ingress_tls_secret.as_ref().map(|secret| {
        vec![IngressTLS {
            hosts: Some(vec![host.to_string()]),
            secret_name: Some(secret.clone()),
        }]
    });

    Ingress {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(target.namespace()),
            labels: Some(build_labels(&target.name())),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: config.ingress_class.clone(),
            rules: Some(vec![IngressRule {
                host: Some(host.to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: service_name,
                                port: Some(ServiceBackendPort {
                                    number: Some(OAUTH2_SERVICE_PORT),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            tls,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Derives the per-replica external host for a StatefulSet pod.
///
/// The workload's host prefix is split at its first domain separator; when
/// the pod carries its stable pod-name label, the trailing ordinal is
/// spliced between prefix and domain (`auth.example.com` + `myset-2` gives
/// `auth-2.example.com`). Without the label, or without a domain separator,
/// the prefix is used unchanged.
#[must_use]
pub fn derive_pod_host(host_prefix: &str, pod: &Pod) -> String {
    let Some((prefix, domain)) = host_prefix.split_once('.') else {
        return host_prefix.to_string();
    };

    let ordinal = pod
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(STS_POD_NAME_LABEL))
        .and_then(|pod_name| pod_name.rsplit('-').next());

    match ordinal {
        Some(ordinal) => format!("{prefix}-{ordinal}.{domain}"),
        None => format!("{prefix}.{domain}"),
    }
}

#[cfg(test)]
#[path = "sidecar_resources_tests.rs"]
mod sidecar_resources_tests;
