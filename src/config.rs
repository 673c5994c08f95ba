// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! All environment-dependent behavior is carried by an explicit
//! [`OperatorConfig`] value injected into the reconcilers at startup.
//! Multi-tenant topology detection in particular is a configuration value,
//! never ambient process state, so the namespace resolver stays testable.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the operator binary.
///
/// Every flag falls back to an environment variable so the operator can be
/// configured either way in a pod spec.
#[derive(Parser, Debug, Clone)]
#[command(name = "oidc-gate", about = "OIDC auth-sidecar dependent-resource operator")]
pub struct Args {
    /// Namespace shared by management-plane workloads in a multi-tenant
    /// topology. Setting this flag switches the operator into multi-tenant
    /// mode; leaving it unset means single-tenant.
    #[arg(long, env = "OIDC_GATE_SHARED_NAMESPACE")]
    pub shared_namespace: Option<String>,

    /// Path to a kubeconfig file to package into the optional kubeconfig
    /// secret mounted by the rbac proxy sidecar.
    #[arg(long, env = "OIDC_GATE_KUBECONFIG_SOURCE")]
    pub kubeconfig_source: Option<PathBuf>,

    /// Path to a PEM CA bundle to package into the optional CA-bundle
    /// secret mounted by the rbac proxy sidecar.
    #[arg(long, env = "OIDC_GATE_CA_BUNDLE_SOURCE")]
    pub ca_bundle_source: Option<PathBuf>,

    /// OIDC issuer URL written into every oauth2 proxy configuration.
    #[arg(long, env = "OIDC_GATE_ISSUER_URL")]
    pub issuer_url: String,

    /// OIDC client id written into every oauth2 proxy configuration.
    #[arg(long, env = "OIDC_GATE_CLIENT_ID")]
    pub client_id: String,

    /// Ingress class to stamp on every dependent ingress.
    #[arg(long, env = "OIDC_GATE_INGRESS_CLASS")]
    pub ingress_class: Option<String>,

    /// Name of a pre-provisioned TLS secret referenced by dependent ingresses.
    #[arg(long, env = "OIDC_GATE_INGRESS_TLS_SECRET")]
    pub ingress_tls_secret: Option<String>,

    /// Bind address for the metrics and health endpoints.
    #[arg(long, env = "OIDC_GATE_METRICS_ADDR", default_value = "0.0.0.0:8080")]
    pub metrics_addr: String,
}

impl Args {
    /// Build the injected operator configuration from the parsed arguments.
    #[must_use]
    pub fn to_operator_config(&self) -> OperatorConfig {
        OperatorConfig {
            tenancy: self.shared_namespace.clone().map(|shared_namespace| TenancyConfig {
                shared_namespace,
            }),
            kubeconfig_source: self.kubeconfig_source.clone(),
            ca_bundle_source: self.ca_bundle_source.clone(),
            oidc: OidcProviderConfig {
                issuer_url: self.issuer_url.clone(),
                client_id: self.client_id.clone(),
            },
            ingress_class: self.ingress_class.clone(),
            ingress_tls_secret: self.ingress_tls_secret.clone(),
        }
    }
}

/// Multi-tenant topology settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenancyConfig {
    /// The shared management namespace; workloads there get cluster-scoped
    /// RBAC resource attributes (empty namespace string).
    pub shared_namespace: String,
}

/// Identity of the OIDC provider the oauth2 proxy sidecars authenticate against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcProviderConfig {
    /// Issuer discovery URL
    pub issuer_url: String,
    /// Registered client id
    pub client_id: String,
}

/// Full operator configuration injected into the reconcilers.
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Present only in a multi-tenant (management cluster) deployment
    pub tenancy: Option<TenancyConfig>,
    /// Source file for the optional kubeconfig secret
    pub kubeconfig_source: Option<PathBuf>,
    /// Source file for the optional CA-bundle secret
    pub ca_bundle_source: Option<PathBuf>,
    /// OIDC provider identity
    pub oidc: OidcProviderConfig,
    /// Ingress class stamped on dependent ingresses
    pub ingress_class: Option<String>,
    /// TLS secret referenced by dependent ingresses
    pub ingress_tls_secret: Option<String>,
}

impl OperatorConfig {
    /// True when the operator runs against a multi-tenant management topology.
    #[must_use]
    pub fn is_multi_tenant(&self) -> bool {
        self.tenancy.is_some()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
