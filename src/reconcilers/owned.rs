// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ownership resolution for dependent resources.
//!
//! Dependent objects are found by listing on the controller label and
//! narrowing to those whose owner-reference chain points back at a given
//! parent (workload or pod). Read-only; cleanup is delegated to
//! owner-reference garbage collection, but drift detection and future
//! garbage-collection extensions enumerate through here.

use crate::labels::GATE_LABEL_KEY;
use anyhow::{Context as _, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::ListParams;
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;

/// Whether the object's owner-reference set includes the given parent UID.
#[must_use]
pub fn is_owned_by(meta: &ObjectMeta, owner_uid: &str) -> bool {
    if owner_uid.is_empty() {
        return false;
    }
    meta.owner_references
        .as_ref()
        .is_some_and(|refs| refs.iter().any(|r| r.uid == owner_uid))
}

/// Lists dependent resources of kind `K` owned by the given parent.
///
/// Scoped to the parent's namespace and filtered by the controller label.
/// A "not found" list response is an empty result, not an error; any other
/// list error propagates.
///
/// # Errors
///
/// Returns an error for any list failure other than not-found.
pub async fn fetch_owned<K>(client: &Client, namespace: &str, owner_uid: &str) -> Result<Vec<K>>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + DeserializeOwned,
{
    let api: Api<K> = Api::namespaced(client.clone(), namespace);
    let params = ListParams::default().labels(GATE_LABEL_KEY);

    let list = match api.list(&params).await {
        Ok(list) => list,
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => return Ok(Vec::new()),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to list {} in {namespace}", K::kind(&())));
        }
    };

    Ok(list
        .items
        .into_iter()
        .filter(|item| is_owned_by(item.meta(), owner_uid))
        .collect())
}

#[cfg(test)]
#[path = "owned_tests.rs"]
mod owned_tests;
