// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dependent-resource reconciliation for eligible workloads.
//!
//! This module contains the reconciliation engine invoked by the watch loops
//! in `main.rs`. One reconciliation builds the desired state of every
//! dependent resource of a workload and persists it idempotently:
//!
//! 1. **Build** - Compute the desired Secrets, Service(s) and Ingress(es)
//!    from the workload via the builders in [`crate::sidecar_resources`]
//! 2. **Own** - Attach an owner reference to the workload (or, for a
//!    StatefulSet replica's Service/Ingress, to the pod)
//! 3. **Persist** - Create-or-update each object, writing only on a real
//!    difference so a repeated reconciliation is a no-op
//! 4. **Roll out** - Bump the workload generation when the mounted OIDC
//!    configuration changed
//!
//! Cleanup is not performed here: every dependent resource is garbage
//! collected through its owner reference when the parent goes away.
//!
//! # Entry points
//!
//! - [`reconcile_deployment_dependencies`] - one shared Service/Ingress in
//!   front of the load-balanced replica set
//! - [`reconcile_statefulset_dependencies`] - per-replica Service/Ingress
//!   fan-out with ordinal-qualified hosts

pub mod deployment;
pub mod namespace;
pub mod owned;
pub mod resources;
pub mod rollout;
pub mod secrets;
pub mod statefulset;

pub use deployment::reconcile_deployment_dependencies;
pub use namespace::resolve_attributes_namespace;
pub use owned::fetch_owned;
pub use resources::create_or_update;
pub use rollout::{content_hash, trigger_generation_increase};
pub use statefulset::reconcile_statefulset_dependencies;
