// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across the reconcilers.
//!
//! This module defines standard Kubernetes labels and oidc-gate-specific
//! labels/annotations so that every dependent resource created by the
//! controller is consistently labeled and queryable.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture (e.g., "auth-sidecar")
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/part-of` indicating this resource is part of oidc-gate
pub const PART_OF_OIDC_GATE: &str = "oidc-gate";

/// Component value for auth-sidecar dependent resources
pub const COMPONENT_AUTH_SIDECAR: &str = "auth-sidecar";

/// Value for `app.kubernetes.io/managed-by` on every dependent resource
pub const MANAGED_BY_OIDC_GATE: &str = "oidc-gate";

// ============================================================================
// Controller Ownership Label
// ============================================================================

/// Label key applied to every dependent resource created by the controller.
///
/// Ownership queries list by the presence of this key; the owner-reference
/// chain is then used to narrow the result to one workload or pod.
pub const GATE_LABEL_KEY: &str = "oidc-gate.io/component";

/// Value of [`GATE_LABEL_KEY`] on dependent resources
pub const GATE_LABEL_VALUE: &str = "auth-sidecar";

// ============================================================================
// Workload Annotations (contract with the admission webhook)
// ============================================================================

/// Annotation carrying the external host prefix used by the ingress builders
pub const ANNOTATION_HOST: &str = "oidc-gate.io/host";

/// Annotation carrying the naming suffix appended to dependent resource names
pub const ANNOTATION_SUFFIX: &str = "oidc-gate.io/suffix";

/// Annotation on the OIDC config secret holding the sha256 of its payload
pub const ANNOTATION_CONFIG_HASH: &str = "oidc-gate.io/config-hash";

// ============================================================================
// Upstream Labels Consumed
// ============================================================================

/// Label the StatefulSet controller stamps on each pod with the pod's own name.
///
/// The trailing ordinal of this value drives per-replica host derivation.
pub const STS_POD_NAME_LABEL: &str = "statefulset.kubernetes.io/pod-name";
