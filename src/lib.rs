// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # oidc-gate - OIDC Auth-Sidecar Operator for Kubernetes
//!
//! oidc-gate is a Kubernetes operator written in Rust that maintains the
//! dependent resources of an authentication/authorization sidecar pair (an
//! OIDC-aware oauth2 reverse proxy plus an RBAC-enforcing proxy) in front of
//! eligible Deployments and StatefulSets.
//!
//! ## Overview
//!
//! For each eligible workload the operator creates and continuously
//! reconciles:
//!
//! - An OIDC configuration Secret mounted by the oauth2 proxy sidecar
//! - An RBAC resource-attributes Secret mounted by the rbac proxy sidecar
//! - An optional kubeconfig Secret and an optional OIDC CA-bundle Secret
//! - A Service and an Ingress routing external traffic at the sidecar
//!
//! Deployments share one Service/Ingress; each StatefulSet replica gets its
//! own pair with an ordinal-qualified host, so every replica can complete
//! its OAuth redirect flow independently. Dependent resources carry owner
//! references and are garbage collected with their parent.
//!
//! ## Modules
//!
//! - [`workload`] - Workload topology abstractions (Deployment/StatefulSet)
//! - [`sidecar_resources`] - Pure desired-state builders for every dependent kind
//! - [`reconcilers`] - The reconciliation engine driven by the watch loops
//! - [`crd`] - The read-only tenant-cluster registration resource
//! - [`config`] - Operator configuration injected into the reconcilers
//! - [`metrics`] - Prometheus metrics exposed by the operator binary
//!
//! ## Example
//!
//! ```rust,no_run
//! use oidc_gate::config::{OidcProviderConfig, OperatorConfig};
//!
//! let config = OperatorConfig {
//!     tenancy: None,
//!     kubeconfig_source: None,
//!     ca_bundle_source: None,
//!     oidc: OidcProviderConfig {
//!         issuer_url: "https://issuer.example.com".to_string(),
//!         client_id: "oidc-gate".to_string(),
//!     },
//!     ingress_class: Some("nginx".to_string()),
//!     ingress_tls_secret: None,
//! };
//! assert!(!config.is_multi_tenant());
//! ```

pub mod config;
pub mod constants;
pub mod crd;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod sidecar_resources;
pub mod workload;
