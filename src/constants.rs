// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the oidc-gate operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group of the tenant-cluster registration CRD
pub const REGISTRATION_API_GROUP: &str = "tenancy.oidc-gate.io";

/// API version of the tenant-cluster registration CRD
pub const REGISTRATION_API_VERSION: &str = "v1alpha1";

/// Kind name for the tenant-cluster registration resource
pub const KIND_CLUSTER_REGISTRATION: &str = "ClusterRegistration";

// ============================================================================
// Dependent Resource Name Prefixes
// ============================================================================

/// Name prefix for the OIDC configuration secret mounted by the oauth2 proxy
pub const OIDC_SECRET_PREFIX: &str = "oauth2-proxy";

/// Name prefix for the RBAC resource-attributes secret mounted by the rbac proxy
pub const RBAC_SECRET_PREFIX: &str = "resource-attributes";

/// Name prefix for the optional kubeconfig secret mounted by the rbac proxy
pub const KUBECONFIG_SECRET_PREFIX: &str = "kubeconfig";

/// Name prefix for the optional OIDC CA-bundle secret mounted by the rbac proxy
pub const CA_BUNDLE_SECRET_PREFIX: &str = "oidc-ca";

/// Name prefix for the per-workload (or per-pod) oauth2 proxy service
pub const SERVICE_PREFIX: &str = "oauth2-service";

/// Name prefix for the per-workload (or per-pod) oauth2 proxy ingress
pub const INGRESS_PREFIX: &str = "oauth2-ingress";

// ============================================================================
// Secret Data Keys
// ============================================================================

/// Data key of the oauth2 proxy configuration file inside the OIDC secret
pub const OIDC_CONFIG_KEY: &str = "oauth2-proxy.cfg";

/// Data key of the rbac proxy configuration file inside the attributes secret
pub const RBAC_CONFIG_KEY: &str = "config.yaml";

/// Data key of the kubeconfig file inside the kubeconfig secret
pub const KUBECONFIG_KEY: &str = "kubeconfig";

/// Data key of the CA bundle inside the CA-bundle secret
pub const CA_BUNDLE_KEY: &str = "ca.crt";

// ============================================================================
// Sidecar Network Constants
// ============================================================================

/// Container port the oauth2 proxy sidecar listens on (TLS)
pub const OAUTH2_PROXY_PORT: i32 = 8443;

/// Name of the oauth2 proxy container port targeted by the service
pub const OAUTH2_PROXY_PORT_NAME: &str = "oauth2-proxy";

/// Service port exposed in front of the oauth2 proxy sidecar
pub const OAUTH2_SERVICE_PORT: i32 = 443;

/// Port the workload's own container listens on, proxied by the sidecar pair
pub const UPSTREAM_PORT: i32 = 8080;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Periodic requeue for successfully reconciled workloads (5 minutes)
pub const RESYNC_REQUEUE_DURATION_SECS: u64 = 300;

// ============================================================================
// Conflict Retry Constants
// ============================================================================

/// Maximum write attempts for the optimistic-concurrency generation bump
pub const CONFLICT_RETRY_ATTEMPTS: u32 = 5;

/// Initial conflict retry interval (100ms)
pub const CONFLICT_INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Maximum conflict retry interval (2 seconds)
pub const CONFLICT_MAX_INTERVAL_SECS: u64 = 2;

/// Backoff multiplier (exponential growth factor)
pub const CONFLICT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
pub const CONFLICT_RANDOMIZATION_FACTOR: f64 = 0.1;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the health probe endpoint
pub const HEALTH_SERVER_PATH: &str = "/healthz";
