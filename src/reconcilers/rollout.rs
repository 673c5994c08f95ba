// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Change detection and workload rollout triggering.
//!
//! Dependent secrets are content-hashed so the reconciler can tell whether a
//! reconciliation actually changed the mounted configuration. When it did,
//! the consuming workload's generation counter is bumped under an
//! optimistic-concurrency retry policy so the surrounding rollout machinery
//! restarts its pods.

use crate::constants::{
    CONFLICT_BACKOFF_MULTIPLIER, CONFLICT_INITIAL_INTERVAL_MILLIS, CONFLICT_MAX_INTERVAL_SECS,
    CONFLICT_RANDOMIZATION_FACTOR, CONFLICT_RETRY_ATTEMPTS,
};
use crate::metrics::record_rollout_triggered;
use crate::workload::Workload;
use anyhow::{Context as _, Result};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use kube::api::PostParams;
use kube::{Api, Client, Resource, ResourceExt};
use rand::RngExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, warn};

/// Computes the stable content hash of a configuration payload.
///
/// Pure and deterministic: identical payloads always hash identically, and
/// any single-byte change produces a different digest.
#[must_use]
pub fn content_hash(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Bounded retry policy for optimistic-concurrency write conflicts.
///
/// The policy is a plain value so attempt counts and the backoff curve are
/// swappable and independently testable.
#[derive(Debug, Clone)]
pub struct ConflictRetryPolicy {
    /// Maximum number of write attempts before giving up
    pub attempts: u32,
    /// Interval before the first retry
    pub initial_interval: Duration,
    /// Upper bound on any single retry interval
    pub max_interval: Duration,
    /// Exponential growth factor between retries
    pub multiplier: f64,
    /// Randomization factor applied to each interval (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
}

impl Default for ConflictRetryPolicy {
    fn default() -> Self {
        Self {
            attempts: CONFLICT_RETRY_ATTEMPTS,
            initial_interval: Duration::from_millis(CONFLICT_INITIAL_INTERVAL_MILLIS),
            max_interval: Duration::from_secs(CONFLICT_MAX_INTERVAL_SECS),
            multiplier: CONFLICT_BACKOFF_MULTIPLIER,
            randomization_factor: CONFLICT_RANDOMIZATION_FACTOR,
        }
    }
}

impl ConflictRetryPolicy {
    /// Backoff interval before the retry following the given zero-based
    /// attempt, with jitter applied.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_interval.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_interval.as_secs_f64());
        Duration::from_secs_f64(self.jitter(capped))
    }

    fn jitter(&self, secs: f64) -> f64 {
        if self.randomization_factor == 0.0 {
            return secs;
        }
        let delta = secs * self.randomization_factor;
        let mut rng = rand::rng();
        rng.random_range((secs - delta)..=(secs + delta)).max(0.0)
    }
}

/// Whether a Kubernetes API error is an optimistic-concurrency conflict.
#[must_use]
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(api_err) if api_err.code == 409)
}

/// Applies a mutation to the latest version of an object, retrying on conflict.
///
/// The standard read-latest, reapply-mutation, resubmit loop: conflicts are
/// absorbed up to the policy's attempt bound and never surfaced to the
/// caller; any other error fails immediately.
///
/// # Errors
///
/// Returns an error when a non-conflict API error occurs or the attempt
/// bound is exhausted.
pub async fn update_with_conflict_retry<K, F>(
    api: &Api<K>,
    name: &str,
    policy: &ConflictRetryPolicy,
    mutate: F,
) -> Result<K>
where
    K: Resource<DynamicType = ()> + ResourceExt + Clone + std::fmt::Debug + Serialize + DeserializeOwned,
    F: Fn(&mut K),
{
    let mut attempt = 0;
    loop {
        let mut latest = api
            .get(name)
            .await
            .with_context(|| format!("failed to fetch latest {} '{name}'", K::kind(&())))?;
        mutate(&mut latest);

        match api.replace(name, &PostParams::default(), &latest).await {
            Ok(updated) => {
                if attempt > 0 {
                    debug!(
                        name = %name,
                        attempt = attempt + 1,
                        "Update succeeded after conflict retries"
                    );
                }
                return Ok(updated);
            }
            Err(e) if is_conflict(&e) && attempt + 1 < policy.attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    name = %name,
                    attempt = attempt + 1,
                    retry_after = ?delay,
                    "Write conflict, retrying with latest object"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "failed to update {} '{name}' after {} attempt(s)",
                        K::kind(&()),
                        attempt + 1
                    )
                });
            }
        }
    }
}

/// Bumps the workload's generation counter to force a dependent rollout.
///
/// Used when the content hash of a mounted secret changed and the workload
/// must restart to pick up the new material. Transient conflicts are
/// retried and never surfaced; exhausting the retry bound is fatal.
///
/// # Errors
///
/// Returns an error if the update cannot be persisted within the policy's
/// attempt bound.
pub async fn trigger_generation_increase(
    client: &Client,
    workload: &Workload<'_>,
) -> Result<()> {
    let namespace = workload.namespace();
    let name = workload.name();
    let policy = ConflictRetryPolicy::default();

    match workload {
        Workload::Deployment(_) => {
            let api: Api<Deployment> = Api::namespaced(client.clone(), &namespace);
            update_with_conflict_retry(&api, &name, &policy, |d: &mut Deployment| {
                let gen = d.metadata.generation.unwrap_or(0);
                d.metadata.generation = Some(gen + 1);
            })
            .await
            .context("failed to bump deployment generation")?;
        }
        Workload::StatefulSet(_) => {
            let api: Api<StatefulSet> = Api::namespaced(client.clone(), &namespace);
            update_with_conflict_retry(&api, &name, &policy, |s: &mut StatefulSet| {
                let gen = s.metadata.generation.unwrap_or(0);
                s.metadata.generation = Some(gen + 1);
            })
            .await
            .context("failed to bump statefulset generation")?;
        }
    }

    record_rollout_triggered(workload.kind());
    debug!(namespace = %namespace, name = %name, "Bumped workload generation");
    Ok(())
}

#[cfg(test)]
#[path = "rollout_tests.rs"]
mod rollout_tests;
