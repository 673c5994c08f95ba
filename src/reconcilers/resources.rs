// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic create-or-update helper for dependent resources.
//!
//! One upsert strategy serves every dependent kind: fetch the object by key;
//! create it when absent; when present, compare the desired object against
//! the live one and replace only on a real difference. The comparison is a
//! pure subset match on the JSON projections, so server-populated defaults
//! (clusterIP, status, managed fields) never cause spurious writes and the
//! second of two back-to-back reconciliations is a no-op.

use crate::metrics::{record_resource_created, record_resource_updated};
use anyhow::{Context as _, Result};
use kube::api::PostParams;
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

/// Create or update a dependent resource, reporting whether a write happened.
///
/// # Errors
///
/// Returns an error if the resource has no name, serialization fails, or an
/// API operation fails.
pub async fn create_or_update<K>(client: &Client, namespace: &str, desired: &K) -> Result<bool>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + DeserializeOwned,
{
    let name = desired
        .meta()
        .name
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("resource must have a name"))?
        .clone();

    let api: Api<K> = Api::namespaced(client.clone(), namespace);

    let current = api
        .get_opt(&name)
        .await
        .with_context(|| format!("failed to fetch {} {namespace}/{name}", K::kind(&())))?;

    match current {
        None => {
            api.create(&PostParams::default(), desired)
                .await
                .with_context(|| format!("failed to create {} {namespace}/{name}", K::kind(&())))?;
            info!("Created {} {}/{}", K::kind(&()), namespace, name);
            record_resource_created(&K::kind(&()));
            Ok(true)
        }
        Some(current) => {
            let desired_json = serde_json::to_value(desired)
                .with_context(|| format!("failed to serialize desired {}", K::kind(&())))?;
            let current_json = serde_json::to_value(&current)
                .with_context(|| format!("failed to serialize current {}", K::kind(&())))?;

            if !needs_update(&current_json, &desired_json) {
                debug!(
                    "{} {}/{} is up to date, skipping write",
                    K::kind(&()),
                    namespace,
                    name
                );
                return Ok(false);
            }

            let mut updated = desired.clone();
            updated
                .meta_mut()
                .resource_version
                .clone_from(&current.meta().resource_version);
            api.replace(&name, &PostParams::default(), &updated)
                .await
                .with_context(|| format!("failed to update {} {namespace}/{name}", K::kind(&())))?;
            info!("Updated {} {}/{}", K::kind(&()), namespace, name);
            record_resource_updated(&K::kind(&()));
            Ok(true)
        }
    }
}

/// Whether the live object diverges from the desired one.
///
/// Only fields the builders populate participate: the desired JSON must be
/// a subtree of the current JSON. Metadata the server owns (uid, resource
/// version, creation timestamp) is absent from desired objects and thus
/// never compared; labels or annotations added by third parties on the live
/// object are tolerated.
#[must_use]
pub fn needs_update(current: &Value, desired: &Value) -> bool {
    !is_subset(desired, current)
}

/// Recursive subset match: every field the desired tree carries must be
/// present and equal in the current tree. Arrays must match pairwise, since
/// ordering of ports/rules/paths is meaningful to the API server.
fn is_subset(desired: &Value, current: &Value) -> bool {
    match (desired, current) {
        (Value::Object(d), Value::Object(c)) => d.iter().all(|(key, dv)| {
            // A desired null is the same as leaving the field unset.
            if dv.is_null() {
                return true;
            }
            c.get(key).is_some_and(|cv| is_subset(dv, cv))
        }),
        (Value::Array(d), Value::Array(c)) => {
            d.len() == c.len() && d.iter().zip(c.iter()).all(|(dv, cv)| is_subset(dv, cv))
        }
        (d, c) => d == c,
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
